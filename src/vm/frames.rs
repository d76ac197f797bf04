//! Call frames and structured-control labels.

use std::sync::Arc;

use crate::model::{Instr, Value};

/// Kind of a structured-control label. Branching to a loop resumes at its
/// body start; branching to anything else lands past the matching end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Block,
    Loop,
    If,
}

#[derive(Debug, Clone, Copy)]
pub struct Label {
    pub kind: LabelKind,
    /// First instruction of the construct's body.
    pub start_pc: usize,
    /// Index of the matching `end` instruction.
    pub end_pc: usize,
    /// Operand-stack height when the label was pushed.
    pub height: usize,
    /// Number of result values the construct yields (0 or 1).
    pub arity: usize,
}

/// Activation record of an in-progress call. The instruction stream is
/// shared with the function instance, so the frame never borrows the store.
#[derive(Debug)]
pub struct Frame {
    pub pc: usize,
    pub insts: Arc<[Instr]>,
    pub locals: Vec<Value>,
    pub labels: Vec<Label>,
    /// Operand-stack height at entry (after arguments were consumed).
    pub base: usize,
    /// Result count of the function's type.
    pub arity: usize,
    /// Owning module instance index in the store.
    pub module: usize,
}
