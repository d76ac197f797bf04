//! The dispatch loop: fetches `frame.insts[frame.pc]`, executes, and either
//! advances the pc, jumps it (control flow), or pops the frame (function
//! end). Any trap aborts the invocation; the caller discards both stacks.

use super::frames::{Frame, Label, LabelKind};
use super::numeric::*;
use super::stack::ValueStack;
use crate::error::Trap;
use crate::model::{Instr, Value};
use crate::runtime::{FuncInstance, Store};

/// Frame-stack depth limit; exceeding it traps instead of recursing forever.
pub const MAX_CALL_DEPTH: usize = 1024;

/// Find the index of the `end` matching the construct whose body starts at
/// `pc`. Linear scan tracking nesting depth.
fn find_end(insts: &[Instr], mut pc: usize) -> Result<usize, Trap> {
    let mut depth = 0usize;
    while pc < insts.len() {
        match insts[pc] {
            Instr::Block(_) | Instr::Loop(_) | Instr::If(_) => depth += 1,
            Instr::End => {
                if depth == 0 {
                    return Ok(pc);
                }
                depth -= 1;
            }
            _ => {}
        }
        pc += 1;
    }
    Err(Trap::TypeMismatch)
}

/// For an `if` whose body starts at `pc`: the position of its `else` (when
/// present at this nesting level) and of its matching `end`.
fn find_else_and_end(insts: &[Instr], mut pc: usize) -> Result<(Option<usize>, usize), Trap> {
    let mut depth = 0usize;
    let mut else_pc = None;
    while pc < insts.len() {
        match insts[pc] {
            Instr::Block(_) | Instr::Loop(_) | Instr::If(_) => depth += 1,
            Instr::Else => {
                if depth == 0 {
                    else_pc = Some(pc);
                }
            }
            Instr::End => {
                if depth == 0 {
                    return Ok((else_pc, pc));
                }
                depth -= 1;
            }
            _ => {}
        }
        pc += 1;
    }
    Err(Trap::TypeMismatch)
}

#[inline]
fn effective_addr(base: i32, offset: u32) -> u64 {
    base as u32 as u64 + offset as u64
}

/// Pop the current frame, carrying its declared results across the unwind.
/// Returns the results when the outermost frame was popped.
fn pop_frame(frames: &mut Vec<Frame>, stack: &mut ValueStack) -> Result<Option<Vec<Value>>, Trap> {
    let frame = frames.pop().ok_or(Trap::TypeMismatch)?;
    let results = stack.pop_n(frame.arity)?;
    stack.truncate(frame.base);
    if frames.is_empty() {
        Ok(Some(results))
    } else {
        stack.extend(results);
        Ok(None)
    }
}

/// Take the branch `depth` labels up. Returns true when the branch targets
/// the implicit function block, i.e. behaves as `return`.
fn do_branch(frame: &mut Frame, stack: &mut ValueStack, depth: usize) -> Result<bool, Trap> {
    if depth >= frame.labels.len() {
        return Ok(true);
    }
    let idx = frame.labels.len() - 1 - depth;
    let target = frame.labels[idx];
    match target.kind {
        LabelKind::Loop => {
            // The loop label survives the branch; execution resumes at the
            // body start.
            frame.labels.truncate(idx + 1);
            stack.truncate(target.height);
            frame.pc = target.start_pc;
        }
        LabelKind::Block | LabelKind::If => {
            let results = stack.pop_n(target.arity)?;
            frame.labels.truncate(idx);
            stack.truncate(target.height);
            stack.extend(results);
            frame.pc = target.end_pc + 1;
        }
    }
    Ok(false)
}

fn mem_addr(store: &Store, module: usize) -> Result<usize, Trap> {
    store
        .get_module(module)
        .and_then(|m| m.memories.first().copied())
        .ok_or(Trap::OutOfBoundsMemoryAccess)
}

fn global_addr(store: &Store, module: usize, idx: u32) -> Result<usize, Trap> {
    store
        .get_module(module)
        .and_then(|m| m.globals.get(idx as usize).copied())
        .ok_or(Trap::TypeMismatch)
}

/// Push a call to the function at store address `callee_addr`. Host functions
/// execute inline; wasm functions get a fresh frame with arguments moved into
/// its locals in declared order and declared locals zero-filled.
fn push_call(
    store: &Store,
    frames: &mut Vec<Frame>,
    stack: &mut ValueStack,
    callee_addr: usize,
) -> Result<(), Trap> {
    let callee = store.get_func(callee_addr).ok_or(Trap::TypeMismatch)?;
    match callee {
        FuncInstance::Host { ty, f } => {
            let args = stack.pop_n(ty.params.len())?;
            if let Some(ret) = (f.as_ref())(&args)? {
                stack.push(ret);
            }
            Ok(())
        }
        FuncInstance::Wasm {
            type_idx,
            func_index,
            module,
        } => {
            if frames.len() >= MAX_CALL_DEPTH {
                return Err(Trap::CallStackExhausted);
            }
            let module_inst = store.get_module(*module).ok_or(Trap::TypeMismatch)?;
            let func = module_inst
                .module
                .functions
                .get(*func_index)
                .ok_or(Trap::TypeMismatch)?;
            let ty = module_inst.func_type(*type_idx).ok_or(Trap::TypeMismatch)?;

            let args = stack.pop_n(ty.params.len())?;
            let mut locals = args;
            for decl in &func.locals {
                for _ in 0..decl.count {
                    locals.push(Value::zero(decl.val_type));
                }
            }

            frames.push(Frame {
                pc: 0,
                insts: func.body.clone(),
                locals,
                labels: Vec::new(),
                base: stack.len(),
                arity: ty.results.len(),
                module: *module,
            });
            Ok(())
        }
    }
}

/// Invoke the function at store address `func_addr` with the given arguments
/// and run the dispatch loop to completion or trap.
pub fn run_function(
    store: &mut Store,
    func_addr: usize,
    args: &[Value],
) -> Result<Vec<Value>, Trap> {
    let callee = store.get_func(func_addr).cloned().ok_or(Trap::TypeMismatch)?;
    let expected_params = match &callee {
        FuncInstance::Host { ty, .. } => ty.params.len(),
        FuncInstance::Wasm {
            type_idx, module, ..
        } => store
            .get_module(*module)
            .and_then(|m| m.func_type(*type_idx))
            .ok_or(Trap::TypeMismatch)?
            .params
            .len(),
    };
    if args.len() != expected_params {
        return Err(Trap::TypeMismatch);
    }

    let mut stack = ValueStack::new();
    let mut frames: Vec<Frame> = Vec::new();
    stack.extend(args.iter().copied());
    push_call(store, &mut frames, &mut stack, func_addr)?;
    if frames.is_empty() {
        // Host function: already executed; its result (if any) is the stack.
        let n = stack.len();
        return stack.pop_n(n);
    }
    exec(store, &mut frames, &mut stack)
}

fn exec(
    store: &mut Store,
    frames: &mut Vec<Frame>,
    stack: &mut ValueStack,
) -> Result<Vec<Value>, Trap> {
    loop {
        let frame = frames.last_mut().ok_or(Trap::TypeMismatch)?;
        let ip = frame.pc;
        let cur_module = frame.module;
        let instr = frame.insts.get(ip).cloned().ok_or(Trap::TypeMismatch)?;
        frame.pc = ip + 1;

        match instr {
            /* ----- control ----- */
            Instr::Unreachable => return Err(Trap::Unreachable),
            Instr::Nop => {}

            Instr::Block(bt) => {
                let frame = frames.last_mut().ok_or(Trap::TypeMismatch)?;
                let end_pc = find_end(&frame.insts, ip + 1)?;
                frame.labels.push(Label {
                    kind: LabelKind::Block,
                    start_pc: ip + 1,
                    end_pc,
                    height: stack.len(),
                    arity: bt.arity(),
                });
            }
            Instr::Loop(bt) => {
                let frame = frames.last_mut().ok_or(Trap::TypeMismatch)?;
                let end_pc = find_end(&frame.insts, ip + 1)?;
                frame.labels.push(Label {
                    kind: LabelKind::Loop,
                    start_pc: ip + 1,
                    end_pc,
                    height: stack.len(),
                    arity: bt.arity(),
                });
            }
            Instr::If(bt) => {
                let cond = stack.pop_i32()?;
                let frame = frames.last_mut().ok_or(Trap::TypeMismatch)?;
                let (else_pc, end_pc) = find_else_and_end(&frame.insts, ip + 1)?;
                frame.labels.push(Label {
                    kind: LabelKind::If,
                    start_pc: ip + 1,
                    end_pc,
                    height: stack.len(),
                    arity: bt.arity(),
                });
                if cond == 0 {
                    // Enter the else arm if there is one, otherwise land on
                    // the end (which pops the label).
                    frame.pc = match else_pc {
                        Some(e) => e + 1,
                        None => end_pc,
                    };
                }
            }
            Instr::Else => {
                // Reached by falling through the then-arm: skip to the end.
                let frame = frames.last_mut().ok_or(Trap::TypeMismatch)?;
                let top = frame.labels.last().copied().ok_or(Trap::TypeMismatch)?;
                frame.pc = top.end_pc;
            }
            Instr::End => {
                let had_label = frames
                    .last_mut()
                    .ok_or(Trap::TypeMismatch)?
                    .labels
                    .pop()
                    .is_some();
                if !had_label {
                    if let Some(results) = pop_frame(frames, stack)? {
                        return Ok(results);
                    }
                }
            }

            Instr::Br(l) => {
                let frame = frames.last_mut().ok_or(Trap::TypeMismatch)?;
                if do_branch(frame, stack, l as usize)? {
                    if let Some(results) = pop_frame(frames, stack)? {
                        return Ok(results);
                    }
                }
            }
            Instr::BrIf(l) => {
                let cond = stack.pop_i32()?;
                if cond != 0 {
                    let frame = frames.last_mut().ok_or(Trap::TypeMismatch)?;
                    if do_branch(frame, stack, l as usize)? {
                        if let Some(results) = pop_frame(frames, stack)? {
                            return Ok(results);
                        }
                    }
                }
            }
            Instr::BrTable(targets, default) => {
                let idx = stack.pop_i32()? as u32 as usize;
                let l = targets.get(idx).copied().unwrap_or(default);
                let frame = frames.last_mut().ok_or(Trap::TypeMismatch)?;
                if do_branch(frame, stack, l as usize)? {
                    if let Some(results) = pop_frame(frames, stack)? {
                        return Ok(results);
                    }
                }
            }
            Instr::Return => {
                if let Some(results) = pop_frame(frames, stack)? {
                    return Ok(results);
                }
            }

            Instr::Call(func_idx) => {
                let callee_addr = store
                    .get_module(cur_module)
                    .and_then(|m| m.funcs.get(func_idx as usize).copied())
                    .ok_or(Trap::TypeMismatch)?;
                push_call(store, frames, stack, callee_addr)?;
            }
            Instr::CallIndirect(type_idx) => {
                let idx = stack.pop_i32()? as u32;
                let module_inst = store.get_module(cur_module).ok_or(Trap::TypeMismatch)?;
                let table_addr = module_inst
                    .tables
                    .first()
                    .copied()
                    .ok_or(Trap::UndefinedElement)?;
                let expected = module_inst
                    .func_type(type_idx)
                    .ok_or(Trap::IndirectCallTypeMismatch)?
                    .clone();
                let table = store.get_table(table_addr).ok_or(Trap::UndefinedElement)?;
                let slot = table.get(idx).ok_or(Trap::UndefinedElement)?;
                let callee_addr = slot.ok_or(Trap::UninitializedElement)?;
                let callee = store.get_func(callee_addr).ok_or(Trap::UndefinedElement)?;
                let actual = match callee {
                    FuncInstance::Host { ty, .. } => ty.clone(),
                    FuncInstance::Wasm {
                        type_idx, module, ..
                    } => store
                        .get_module(*module)
                        .and_then(|m| m.func_type(*type_idx))
                        .ok_or(Trap::IndirectCallTypeMismatch)?
                        .clone(),
                };
                if actual != expected {
                    return Err(Trap::IndirectCallTypeMismatch);
                }
                push_call(store, frames, stack, callee_addr)?;
            }

            /* ----- parametric ----- */
            Instr::Drop => {
                stack.pop()?;
            }
            Instr::Select => {
                let cond = stack.pop_i32()?;
                let v2 = stack.pop()?;
                let v1 = stack.pop()?;
                if v1.ty() != v2.ty() {
                    return Err(Trap::TypeMismatch);
                }
                stack.push(if cond != 0 { v1 } else { v2 });
            }

            /* ----- variable ----- */
            Instr::LocalGet(idx) => {
                let frame = frames.last().ok_or(Trap::TypeMismatch)?;
                let v = frame
                    .locals
                    .get(idx as usize)
                    .copied()
                    .ok_or(Trap::TypeMismatch)?;
                stack.push(v);
            }
            Instr::LocalSet(idx) => {
                let v = stack.pop()?;
                let frame = frames.last_mut().ok_or(Trap::TypeMismatch)?;
                let slot = frame
                    .locals
                    .get_mut(idx as usize)
                    .ok_or(Trap::TypeMismatch)?;
                *slot = v;
            }
            Instr::LocalTee(idx) => {
                let v = stack.pop()?;
                stack.push(v);
                let frame = frames.last_mut().ok_or(Trap::TypeMismatch)?;
                let slot = frame
                    .locals
                    .get_mut(idx as usize)
                    .ok_or(Trap::TypeMismatch)?;
                *slot = v;
            }
            Instr::GlobalGet(idx) => {
                let gaddr = global_addr(store, cur_module, idx)?;
                let g = store.get_global(gaddr).ok_or(Trap::TypeMismatch)?;
                stack.push(g.get());
            }
            Instr::GlobalSet(idx) => {
                let v = stack.pop()?;
                let gaddr = global_addr(store, cur_module, idx)?;
                let g = store.get_global_mut(gaddr).ok_or(Trap::TypeMismatch)?;
                g.set(v)?;
            }

            /* ----- memory loads ----- */
            Instr::I32Load(m) => {
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let mem = store.get_memory(mem_addr(store, cur_module)?).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                stack.push(Value::I32(mem.load_u32(ea)? as i32));
            }
            Instr::I64Load(m) => {
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let mem = store.get_memory(mem_addr(store, cur_module)?).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                stack.push(Value::I64(mem.load_u64(ea)? as i64));
            }
            Instr::F32Load(m) => {
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let mem = store.get_memory(mem_addr(store, cur_module)?).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                stack.push(Value::F32(mem.load_u32(ea)?));
            }
            Instr::F64Load(m) => {
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let mem = store.get_memory(mem_addr(store, cur_module)?).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                stack.push(Value::F64(mem.load_u64(ea)?));
            }
            Instr::I32Load8S(m) => {
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let mem = store.get_memory(mem_addr(store, cur_module)?).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                stack.push(Value::I32(mem.load_u8(ea)? as i8 as i32));
            }
            Instr::I32Load8U(m) => {
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let mem = store.get_memory(mem_addr(store, cur_module)?).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                stack.push(Value::I32(mem.load_u8(ea)? as i32));
            }
            Instr::I32Load16S(m) => {
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let mem = store.get_memory(mem_addr(store, cur_module)?).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                stack.push(Value::I32(mem.load_u16(ea)? as i16 as i32));
            }
            Instr::I32Load16U(m) => {
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let mem = store.get_memory(mem_addr(store, cur_module)?).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                stack.push(Value::I32(mem.load_u16(ea)? as i32));
            }
            Instr::I64Load8S(m) => {
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let mem = store.get_memory(mem_addr(store, cur_module)?).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                stack.push(Value::I64(mem.load_u8(ea)? as i8 as i64));
            }
            Instr::I64Load8U(m) => {
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let mem = store.get_memory(mem_addr(store, cur_module)?).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                stack.push(Value::I64(mem.load_u8(ea)? as i64));
            }
            Instr::I64Load16S(m) => {
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let mem = store.get_memory(mem_addr(store, cur_module)?).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                stack.push(Value::I64(mem.load_u16(ea)? as i16 as i64));
            }
            Instr::I64Load16U(m) => {
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let mem = store.get_memory(mem_addr(store, cur_module)?).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                stack.push(Value::I64(mem.load_u16(ea)? as i64));
            }
            Instr::I64Load32S(m) => {
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let mem = store.get_memory(mem_addr(store, cur_module)?).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                stack.push(Value::I64(mem.load_u32(ea)? as i32 as i64));
            }
            Instr::I64Load32U(m) => {
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let mem = store.get_memory(mem_addr(store, cur_module)?).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                stack.push(Value::I64(mem.load_u32(ea)? as i64));
            }

            /* ----- memory stores ----- */
            Instr::I32Store(m) => {
                let v = stack.pop_i32()?;
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let addr = mem_addr(store, cur_module)?;
                let mem = store.get_memory_mut(addr).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                mem.store_u32(ea, v as u32)?;
            }
            Instr::I64Store(m) => {
                let v = stack.pop_i64()?;
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let addr = mem_addr(store, cur_module)?;
                let mem = store.get_memory_mut(addr).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                mem.store_u64(ea, v as u64)?;
            }
            Instr::F32Store(m) => {
                let bits = stack.pop_f32_bits()?;
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let addr = mem_addr(store, cur_module)?;
                let mem = store.get_memory_mut(addr).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                mem.store_u32(ea, bits)?;
            }
            Instr::F64Store(m) => {
                let bits = stack.pop_f64_bits()?;
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let addr = mem_addr(store, cur_module)?;
                let mem = store.get_memory_mut(addr).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                mem.store_u64(ea, bits)?;
            }
            Instr::I32Store8(m) => {
                let v = stack.pop_i32()?;
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let addr = mem_addr(store, cur_module)?;
                let mem = store.get_memory_mut(addr).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                mem.store_u8(ea, v as u8)?;
            }
            Instr::I32Store16(m) => {
                let v = stack.pop_i32()?;
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let addr = mem_addr(store, cur_module)?;
                let mem = store.get_memory_mut(addr).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                mem.store_u16(ea, v as u16)?;
            }
            Instr::I64Store8(m) => {
                let v = stack.pop_i64()?;
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let addr = mem_addr(store, cur_module)?;
                let mem = store.get_memory_mut(addr).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                mem.store_u8(ea, v as u8)?;
            }
            Instr::I64Store16(m) => {
                let v = stack.pop_i64()?;
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let addr = mem_addr(store, cur_module)?;
                let mem = store.get_memory_mut(addr).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                mem.store_u16(ea, v as u16)?;
            }
            Instr::I64Store32(m) => {
                let v = stack.pop_i64()?;
                let ea = effective_addr(stack.pop_i32()?, m.offset);
                let addr = mem_addr(store, cur_module)?;
                let mem = store.get_memory_mut(addr).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                mem.store_u32(ea, v as u32)?;
            }

            /* ----- memory management ----- */
            Instr::MemorySize => {
                let mem = store.get_memory(mem_addr(store, cur_module)?).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                stack.push(Value::I32(mem.size_pages() as i32));
            }
            Instr::MemoryGrow => {
                let delta = stack.pop_i32()?;
                let addr = mem_addr(store, cur_module)?;
                let mem = store.get_memory_mut(addr).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                match mem.grow(delta as u32) {
                    Some(prev) => stack.push(Value::I32(prev as i32)),
                    None => stack.push(Value::I32(-1)),
                }
            }
            Instr::MemoryCopy => {
                let len = stack.pop_i32()? as u32 as u64;
                let src = stack.pop_i32()? as u32 as u64;
                let dst = stack.pop_i32()? as u32 as u64;
                let addr = mem_addr(store, cur_module)?;
                let mem = store.get_memory_mut(addr).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                mem.copy(dst, src, len)?;
            }
            Instr::MemoryFill => {
                let len = stack.pop_i32()? as u32 as u64;
                let val = stack.pop_i32()?;
                let dst = stack.pop_i32()? as u32 as u64;
                let addr = mem_addr(store, cur_module)?;
                let mem = store.get_memory_mut(addr).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                mem.fill(dst, val as u8, len)?;
            }

            /* ----- constants ----- */
            Instr::I32Const(v) => stack.push(Value::I32(v)),
            Instr::I64Const(v) => stack.push(Value::I64(v)),
            Instr::F32Const(bits) => stack.push(Value::F32(bits)),
            Instr::F64Const(bits) => stack.push(Value::F64(bits)),

            /* ----- i32 test/relational ----- */
            Instr::I32Eqz => unop_i32(stack, |v| (v == 0) as i32)?,
            Instr::I32Eq => cmpop_i32(stack, |a, b| a == b)?,
            Instr::I32Ne => cmpop_i32(stack, |a, b| a != b)?,
            Instr::I32LtS => cmpop_i32(stack, |a, b| a < b)?,
            Instr::I32LtU => cmpop_u32(stack, |a, b| a < b)?,
            Instr::I32GtS => cmpop_i32(stack, |a, b| a > b)?,
            Instr::I32GtU => cmpop_u32(stack, |a, b| a > b)?,
            Instr::I32LeS => cmpop_i32(stack, |a, b| a <= b)?,
            Instr::I32LeU => cmpop_u32(stack, |a, b| a <= b)?,
            Instr::I32GeS => cmpop_i32(stack, |a, b| a >= b)?,
            Instr::I32GeU => cmpop_u32(stack, |a, b| a >= b)?,

            /* ----- i64 test/relational ----- */
            Instr::I64Eqz => {
                let v = stack.pop_i64()?;
                stack.push(bool_i32(v == 0));
            }
            Instr::I64Eq => cmpop_i64(stack, |a, b| a == b)?,
            Instr::I64Ne => cmpop_i64(stack, |a, b| a != b)?,
            Instr::I64LtS => cmpop_i64(stack, |a, b| a < b)?,
            Instr::I64LtU => cmpop_u64(stack, |a, b| a < b)?,
            Instr::I64GtS => cmpop_i64(stack, |a, b| a > b)?,
            Instr::I64GtU => cmpop_u64(stack, |a, b| a > b)?,
            Instr::I64LeS => cmpop_i64(stack, |a, b| a <= b)?,
            Instr::I64LeU => cmpop_u64(stack, |a, b| a <= b)?,
            Instr::I64GeS => cmpop_i64(stack, |a, b| a >= b)?,
            Instr::I64GeU => cmpop_u64(stack, |a, b| a >= b)?,

            /* ----- float relational ----- */
            Instr::F32Eq => cmpop_f32(stack, |a, b| a == b)?,
            Instr::F32Ne => cmpop_f32(stack, |a, b| a != b)?,
            Instr::F32Lt => cmpop_f32(stack, |a, b| a < b)?,
            Instr::F32Gt => cmpop_f32(stack, |a, b| a > b)?,
            Instr::F32Le => cmpop_f32(stack, |a, b| a <= b)?,
            Instr::F32Ge => cmpop_f32(stack, |a, b| a >= b)?,
            Instr::F64Eq => cmpop_f64(stack, |a, b| a == b)?,
            Instr::F64Ne => cmpop_f64(stack, |a, b| a != b)?,
            Instr::F64Lt => cmpop_f64(stack, |a, b| a < b)?,
            Instr::F64Gt => cmpop_f64(stack, |a, b| a > b)?,
            Instr::F64Le => cmpop_f64(stack, |a, b| a <= b)?,
            Instr::F64Ge => cmpop_f64(stack, |a, b| a >= b)?,

            /* ----- i32 arithmetic/bitwise ----- */
            Instr::I32Clz => unop_i32(stack, |v| v.leading_zeros() as i32)?,
            Instr::I32Ctz => unop_i32(stack, |v| v.trailing_zeros() as i32)?,
            Instr::I32Popcnt => unop_i32(stack, |v| v.count_ones() as i32)?,
            Instr::I32Add => binop_i32(stack, |a, b| Ok(a.wrapping_add(b)))?,
            Instr::I32Sub => binop_i32(stack, |a, b| Ok(a.wrapping_sub(b)))?,
            Instr::I32Mul => binop_i32(stack, |a, b| Ok(a.wrapping_mul(b)))?,
            Instr::I32DivS => binop_i32(stack, |a, b| {
                if b == 0 {
                    Err(Trap::IntegerDivideByZero)
                } else if a == i32::MIN && b == -1 {
                    Err(Trap::IntegerOverflow)
                } else {
                    Ok(a / b)
                }
            })?,
            Instr::I32DivU => binop_i32(stack, |a, b| {
                if b == 0 {
                    Err(Trap::IntegerDivideByZero)
                } else {
                    Ok(((a as u32) / (b as u32)) as i32)
                }
            })?,
            Instr::I32RemS => binop_i32(stack, |a, b| {
                if b == 0 {
                    Err(Trap::IntegerDivideByZero)
                } else {
                    Ok(a.wrapping_rem(b))
                }
            })?,
            Instr::I32RemU => binop_i32(stack, |a, b| {
                if b == 0 {
                    Err(Trap::IntegerDivideByZero)
                } else {
                    Ok(((a as u32) % (b as u32)) as i32)
                }
            })?,
            Instr::I32And => binop_i32(stack, |a, b| Ok(a & b))?,
            Instr::I32Or => binop_i32(stack, |a, b| Ok(a | b))?,
            Instr::I32Xor => binop_i32(stack, |a, b| Ok(a ^ b))?,
            Instr::I32Shl => binop_i32(stack, |a, b| Ok(a.wrapping_shl(b as u32)))?,
            Instr::I32ShrS => binop_i32(stack, |a, b| Ok(a.wrapping_shr(b as u32)))?,
            Instr::I32ShrU => {
                binop_i32(stack, |a, b| Ok(((a as u32).wrapping_shr(b as u32)) as i32))?
            }
            Instr::I32Rotl => binop_i32(stack, |a, b| Ok((a as u32).rotate_left(b as u32) as i32))?,
            Instr::I32Rotr => binop_i32(stack, |a, b| Ok((a as u32).rotate_right(b as u32) as i32))?,

            /* ----- i64 arithmetic/bitwise ----- */
            Instr::I64Clz => unop_i64(stack, |v| v.leading_zeros() as i64)?,
            Instr::I64Ctz => unop_i64(stack, |v| v.trailing_zeros() as i64)?,
            Instr::I64Popcnt => unop_i64(stack, |v| v.count_ones() as i64)?,
            Instr::I64Add => binop_i64(stack, |a, b| Ok(a.wrapping_add(b)))?,
            Instr::I64Sub => binop_i64(stack, |a, b| Ok(a.wrapping_sub(b)))?,
            Instr::I64Mul => binop_i64(stack, |a, b| Ok(a.wrapping_mul(b)))?,
            Instr::I64DivS => binop_i64(stack, |a, b| {
                if b == 0 {
                    Err(Trap::IntegerDivideByZero)
                } else if a == i64::MIN && b == -1 {
                    Err(Trap::IntegerOverflow)
                } else {
                    Ok(a / b)
                }
            })?,
            Instr::I64DivU => binop_i64(stack, |a, b| {
                if b == 0 {
                    Err(Trap::IntegerDivideByZero)
                } else {
                    Ok(((a as u64) / (b as u64)) as i64)
                }
            })?,
            Instr::I64RemS => binop_i64(stack, |a, b| {
                if b == 0 {
                    Err(Trap::IntegerDivideByZero)
                } else {
                    Ok(a.wrapping_rem(b))
                }
            })?,
            Instr::I64RemU => binop_i64(stack, |a, b| {
                if b == 0 {
                    Err(Trap::IntegerDivideByZero)
                } else {
                    Ok(((a as u64) % (b as u64)) as i64)
                }
            })?,
            Instr::I64And => binop_i64(stack, |a, b| Ok(a & b))?,
            Instr::I64Or => binop_i64(stack, |a, b| Ok(a | b))?,
            Instr::I64Xor => binop_i64(stack, |a, b| Ok(a ^ b))?,
            Instr::I64Shl => binop_i64(stack, |a, b| Ok(a.wrapping_shl(b as u32)))?,
            Instr::I64ShrS => binop_i64(stack, |a, b| Ok(a.wrapping_shr(b as u32)))?,
            Instr::I64ShrU => {
                binop_i64(stack, |a, b| Ok(((a as u64).wrapping_shr(b as u32)) as i64))?
            }
            Instr::I64Rotl => {
                binop_i64(stack, |a, b| Ok((a as u64).rotate_left(b as u32) as i64))?
            }
            Instr::I64Rotr => {
                binop_i64(stack, |a, b| Ok((a as u64).rotate_right(b as u32) as i64))?
            }

            /* ----- f32 arithmetic ----- */
            Instr::F32Abs => unop_f32(stack, f32::abs)?,
            Instr::F32Neg => unop_f32(stack, |v| -v)?,
            Instr::F32Ceil => unop_f32(stack, f32::ceil)?,
            Instr::F32Floor => unop_f32(stack, f32::floor)?,
            Instr::F32Trunc => unop_f32(stack, f32::trunc)?,
            Instr::F32Nearest => unop_f32(stack, nearest32)?,
            Instr::F32Sqrt => unop_f32(stack, f32::sqrt)?,
            Instr::F32Add => binop_f32(stack, |a, b| a + b)?,
            Instr::F32Sub => binop_f32(stack, |a, b| a - b)?,
            Instr::F32Mul => binop_f32(stack, |a, b| a * b)?,
            Instr::F32Div => binop_f32(stack, |a, b| a / b)?,
            Instr::F32Min => binop_f32(stack, fmin32)?,
            Instr::F32Max => binop_f32(stack, fmax32)?,
            Instr::F32Copysign => binop_f32(stack, f32::copysign)?,

            /* ----- f64 arithmetic ----- */
            Instr::F64Abs => unop_f64(stack, f64::abs)?,
            Instr::F64Neg => unop_f64(stack, |v| -v)?,
            Instr::F64Ceil => unop_f64(stack, f64::ceil)?,
            Instr::F64Floor => unop_f64(stack, f64::floor)?,
            Instr::F64Trunc => unop_f64(stack, f64::trunc)?,
            Instr::F64Nearest => unop_f64(stack, nearest64)?,
            Instr::F64Sqrt => unop_f64(stack, f64::sqrt)?,
            Instr::F64Add => binop_f64(stack, |a, b| a + b)?,
            Instr::F64Sub => binop_f64(stack, |a, b| a - b)?,
            Instr::F64Mul => binop_f64(stack, |a, b| a * b)?,
            Instr::F64Div => binop_f64(stack, |a, b| a / b)?,
            Instr::F64Min => binop_f64(stack, fmin64)?,
            Instr::F64Max => binop_f64(stack, fmax64)?,
            Instr::F64Copysign => binop_f64(stack, f64::copysign)?,

            /* ----- conversions ----- */
            Instr::I32WrapI64 => {
                let v = stack.pop_i64()?;
                stack.push(Value::I32(v as i32));
            }
            Instr::I32TruncF32S => {
                let v = f32::from_bits(stack.pop_f32_bits()?);
                stack.push(Value::I32(trunc_f32_to_i32(v)?));
            }
            Instr::I32TruncF32U => {
                let v = f32::from_bits(stack.pop_f32_bits()?);
                stack.push(Value::I32(trunc_f32_to_u32(v)? as i32));
            }
            Instr::I32TruncF64S => {
                let v = f64::from_bits(stack.pop_f64_bits()?);
                stack.push(Value::I32(trunc_f64_to_i32(v)?));
            }
            Instr::I32TruncF64U => {
                let v = f64::from_bits(stack.pop_f64_bits()?);
                stack.push(Value::I32(trunc_f64_to_u32(v)? as i32));
            }
            Instr::I64ExtendI32S => {
                let v = stack.pop_i32()?;
                stack.push(Value::I64(v as i64));
            }
            Instr::I64ExtendI32U => {
                let v = stack.pop_i32()?;
                stack.push(Value::I64(v as u32 as i64));
            }
            Instr::I64TruncF32S => {
                let v = f32::from_bits(stack.pop_f32_bits()?);
                stack.push(Value::I64(trunc_f32_to_i64(v)?));
            }
            Instr::I64TruncF32U => {
                let v = f32::from_bits(stack.pop_f32_bits()?);
                stack.push(Value::I64(trunc_f32_to_u64(v)? as i64));
            }
            Instr::I64TruncF64S => {
                let v = f64::from_bits(stack.pop_f64_bits()?);
                stack.push(Value::I64(trunc_f64_to_i64(v)?));
            }
            Instr::I64TruncF64U => {
                let v = f64::from_bits(stack.pop_f64_bits()?);
                stack.push(Value::I64(trunc_f64_to_u64(v)? as i64));
            }
            Instr::F32ConvertI32S => {
                let v = stack.pop_i32()?;
                stack.push(Value::from_f32(v as f32));
            }
            Instr::F32ConvertI32U => {
                let v = stack.pop_i32()?;
                stack.push(Value::from_f32(v as u32 as f32));
            }
            Instr::F32ConvertI64S => {
                let v = stack.pop_i64()?;
                stack.push(Value::from_f32(v as f32));
            }
            Instr::F32ConvertI64U => {
                let v = stack.pop_i64()?;
                stack.push(Value::from_f32(v as u64 as f32));
            }
            Instr::F32DemoteF64 => {
                let v = f64::from_bits(stack.pop_f64_bits()?);
                stack.push(Value::from_f32(v as f32));
            }
            Instr::F64ConvertI32S => {
                let v = stack.pop_i32()?;
                stack.push(Value::from_f64(v as f64));
            }
            Instr::F64ConvertI32U => {
                let v = stack.pop_i32()?;
                stack.push(Value::from_f64(v as u32 as f64));
            }
            Instr::F64ConvertI64S => {
                let v = stack.pop_i64()?;
                stack.push(Value::from_f64(v as f64));
            }
            Instr::F64ConvertI64U => {
                let v = stack.pop_i64()?;
                stack.push(Value::from_f64(v as u64 as f64));
            }
            Instr::F64PromoteF32 => {
                let v = f32::from_bits(stack.pop_f32_bits()?);
                stack.push(Value::from_f64(v as f64));
            }
            Instr::I32ReinterpretF32 => {
                let bits = stack.pop_f32_bits()?;
                stack.push(Value::I32(bits as i32));
            }
            Instr::I64ReinterpretF64 => {
                let bits = stack.pop_f64_bits()?;
                stack.push(Value::I64(bits as i64));
            }
            Instr::F32ReinterpretI32 => {
                let v = stack.pop_i32()?;
                stack.push(Value::F32(v as u32));
            }
            Instr::F64ReinterpretI64 => {
                let v = stack.pop_i64()?;
                stack.push(Value::F64(v as u64));
            }

            /* ----- sign extension ----- */
            Instr::I32Extend8S => unop_i32(stack, |v| v as i8 as i32)?,
            Instr::I32Extend16S => unop_i32(stack, |v| v as i16 as i32)?,
            Instr::I64Extend8S => unop_i64(stack, |v| v as i8 as i64)?,
            Instr::I64Extend16S => unop_i64(stack, |v| v as i16 as i64)?,
            Instr::I64Extend32S => unop_i64(stack, |v| v as i32 as i64)?,
        }
    }
}
