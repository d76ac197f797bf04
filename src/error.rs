//! Crate-level error types: decode errors, link errors, lookup errors, traps.

use thiserror::Error;

/// Errors produced while decoding a binary module.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Binary(#[from] crate::binary::BinaryReadError),

    #[error("invalid magic header")]
    InvalidMagic,

    #[error("bad section id {0}")]
    BadSection(u8),

    #[error("bad functype leading byte {0:#04x}")]
    BadFuncTypeLeading(u8),

    #[error("unknown opcode {0:#04x} at offset {1}")]
    UnknownOpcode(u8, usize),

    #[error("function and code section counts differ")]
    FunctionCodeCountMismatch,
}

/// Errors produced while instantiating a decoded module.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("unresolved import: {module}.{name}")]
    UnresolvedImport { module: String, name: String },

    #[error("import type mismatch for {module}.{name}")]
    ImportTypeMismatch { module: String, name: String },

    #[error("segment initializer out of range")]
    InitializerOutOfRange,

    #[error("unsupported opcode in constant expression")]
    BadConstExpr,

    #[error("trap while running start function")]
    StartTrap(#[source] Trap),
}

/// Errors produced while building an interpreter from raw bytes.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Export lookup failures.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("export {0:?} not found")]
    NotFound(String),

    #[error("export {0:?} is not a function")]
    NotAFunction(String),
}

/// Runtime traps. Display strings match the reference test-suite `text`
/// fields so `assert_trap` expectations compare equal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Trap {
    #[error("unreachable")]
    Unreachable,

    #[error("integer divide by zero")]
    IntegerDivideByZero,

    #[error("integer overflow")]
    IntegerOverflow,

    #[error("invalid conversion to integer")]
    InvalidConversionToInteger,

    #[error("out of bounds memory access")]
    OutOfBoundsMemoryAccess,

    #[error("undefined element")]
    UndefinedElement,

    #[error("uninitialized element")]
    UninitializedElement,

    #[error("indirect call type mismatch")]
    IndirectCallTypeMismatch,

    #[error("immutable global")]
    ImmutableGlobal,

    #[error("type mismatch")]
    TypeMismatch,

    #[error("call stack exhausted")]
    CallStackExhausted,
}
