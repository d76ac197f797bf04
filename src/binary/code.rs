//! Expression decoding: one opcode byte plus immediates per instruction,
//! accumulated until the `end` that closes the enclosing block.

use super::{cursor::Cursor, leb128, opcodes as op, reader::read_vec, BinaryReadError};
use crate::error::DecodeError;
use crate::model::{BlockType, Instr, MemArg, ValType};

pub fn read_val_type(cur: &mut Cursor) -> Result<ValType, DecodeError> {
    let b = cur.read_u8()?;
    match b {
        0x7F => Ok(ValType::I32),
        0x7E => Ok(ValType::I64),
        0x7D => Ok(ValType::F32),
        0x7C => Ok(ValType::F64),
        other => Err(DecodeError::UnknownOpcode(other, cur.offset())),
    }
}

fn read_block_type(cur: &mut Cursor) -> Result<BlockType, DecodeError> {
    let b = cur.read_u8()?;
    match b {
        0x40 => Ok(BlockType::Empty),
        0x7F => Ok(BlockType::Value(ValType::I32)),
        0x7E => Ok(BlockType::Value(ValType::I64)),
        0x7D => Ok(BlockType::Value(ValType::F32)),
        0x7C => Ok(BlockType::Value(ValType::F64)),
        other => Err(DecodeError::UnknownOpcode(other, cur.offset())),
    }
}

fn read_memarg(cur: &mut Cursor) -> Result<MemArg, BinaryReadError> {
    let align = leb128::read_uleb_u32(cur)?;
    let offset = leb128::read_uleb_u32(cur)?;
    Ok(MemArg { align, offset })
}

/// Decode a single instruction (opcode byte + immediates).
pub fn read_instr(cur: &mut Cursor) -> Result<Instr, DecodeError> {
    let opcode = cur.read_u8()?;
    let instr = match opcode {
        op::UNREACHABLE => Instr::Unreachable,
        op::NOP => Instr::Nop,
        op::BLOCK => Instr::Block(read_block_type(cur)?),
        op::LOOP => Instr::Loop(read_block_type(cur)?),
        op::IF => Instr::If(read_block_type(cur)?),
        op::ELSE => Instr::Else,
        op::END => Instr::End,
        op::BR => Instr::Br(leb128::read_uleb_u32(cur)?),
        op::BR_IF => Instr::BrIf(leb128::read_uleb_u32(cur)?),
        op::BR_TABLE => {
            let targets = read_vec::<_, DecodeError, _>(cur, |c| {
                leb128::read_uleb_u32(c).map_err(DecodeError::from)
            })?;
            let default = leb128::read_uleb_u32(cur)?;
            Instr::BrTable(targets, default)
        }
        op::RETURN => Instr::Return,
        op::CALL => Instr::Call(leb128::read_uleb_u32(cur)?),
        op::CALL_INDIRECT => {
            let type_idx = leb128::read_uleb_u32(cur)?;
            let _table = cur.read_u8()?; // reserved, table 0
            Instr::CallIndirect(type_idx)
        }

        op::DROP => Instr::Drop,
        op::SELECT => Instr::Select,

        op::LOCAL_GET => Instr::LocalGet(leb128::read_uleb_u32(cur)?),
        op::LOCAL_SET => Instr::LocalSet(leb128::read_uleb_u32(cur)?),
        op::LOCAL_TEE => Instr::LocalTee(leb128::read_uleb_u32(cur)?),
        op::GLOBAL_GET => Instr::GlobalGet(leb128::read_uleb_u32(cur)?),
        op::GLOBAL_SET => Instr::GlobalSet(leb128::read_uleb_u32(cur)?),

        op::I32_LOAD => Instr::I32Load(read_memarg(cur)?),
        op::I64_LOAD => Instr::I64Load(read_memarg(cur)?),
        op::F32_LOAD => Instr::F32Load(read_memarg(cur)?),
        op::F64_LOAD => Instr::F64Load(read_memarg(cur)?),
        op::I32_LOAD8_S => Instr::I32Load8S(read_memarg(cur)?),
        op::I32_LOAD8_U => Instr::I32Load8U(read_memarg(cur)?),
        op::I32_LOAD16_S => Instr::I32Load16S(read_memarg(cur)?),
        op::I32_LOAD16_U => Instr::I32Load16U(read_memarg(cur)?),
        op::I64_LOAD8_S => Instr::I64Load8S(read_memarg(cur)?),
        op::I64_LOAD8_U => Instr::I64Load8U(read_memarg(cur)?),
        op::I64_LOAD16_S => Instr::I64Load16S(read_memarg(cur)?),
        op::I64_LOAD16_U => Instr::I64Load16U(read_memarg(cur)?),
        op::I64_LOAD32_S => Instr::I64Load32S(read_memarg(cur)?),
        op::I64_LOAD32_U => Instr::I64Load32U(read_memarg(cur)?),
        op::I32_STORE => Instr::I32Store(read_memarg(cur)?),
        op::I64_STORE => Instr::I64Store(read_memarg(cur)?),
        op::F32_STORE => Instr::F32Store(read_memarg(cur)?),
        op::F64_STORE => Instr::F64Store(read_memarg(cur)?),
        op::I32_STORE8 => Instr::I32Store8(read_memarg(cur)?),
        op::I32_STORE16 => Instr::I32Store16(read_memarg(cur)?),
        op::I64_STORE8 => Instr::I64Store8(read_memarg(cur)?),
        op::I64_STORE16 => Instr::I64Store16(read_memarg(cur)?),
        op::I64_STORE32 => Instr::I64Store32(read_memarg(cur)?),
        op::MEMORY_SIZE => {
            let _reserved = cur.read_u8()?;
            Instr::MemorySize
        }
        op::MEMORY_GROW => {
            let _reserved = cur.read_u8()?;
            Instr::MemoryGrow
        }

        op::I32_CONST => Instr::I32Const(leb128::read_sleb_i32(cur)?),
        op::I64_CONST => Instr::I64Const(leb128::read_sleb_i64(cur)?),
        op::F32_CONST => Instr::F32Const(cur.read_f32_bits()?),
        op::F64_CONST => Instr::F64Const(cur.read_f64_bits()?),

        op::I32_EQZ => Instr::I32Eqz,
        op::I32_EQ => Instr::I32Eq,
        op::I32_NE => Instr::I32Ne,
        op::I32_LT_S => Instr::I32LtS,
        op::I32_LT_U => Instr::I32LtU,
        op::I32_GT_S => Instr::I32GtS,
        op::I32_GT_U => Instr::I32GtU,
        op::I32_LE_S => Instr::I32LeS,
        op::I32_LE_U => Instr::I32LeU,
        op::I32_GE_S => Instr::I32GeS,
        op::I32_GE_U => Instr::I32GeU,

        op::I64_EQZ => Instr::I64Eqz,
        op::I64_EQ => Instr::I64Eq,
        op::I64_NE => Instr::I64Ne,
        op::I64_LT_S => Instr::I64LtS,
        op::I64_LT_U => Instr::I64LtU,
        op::I64_GT_S => Instr::I64GtS,
        op::I64_GT_U => Instr::I64GtU,
        op::I64_LE_S => Instr::I64LeS,
        op::I64_LE_U => Instr::I64LeU,
        op::I64_GE_S => Instr::I64GeS,
        op::I64_GE_U => Instr::I64GeU,

        op::F32_EQ => Instr::F32Eq,
        op::F32_NE => Instr::F32Ne,
        op::F32_LT => Instr::F32Lt,
        op::F32_GT => Instr::F32Gt,
        op::F32_LE => Instr::F32Le,
        op::F32_GE => Instr::F32Ge,

        op::F64_EQ => Instr::F64Eq,
        op::F64_NE => Instr::F64Ne,
        op::F64_LT => Instr::F64Lt,
        op::F64_GT => Instr::F64Gt,
        op::F64_LE => Instr::F64Le,
        op::F64_GE => Instr::F64Ge,

        op::I32_CLZ => Instr::I32Clz,
        op::I32_CTZ => Instr::I32Ctz,
        op::I32_POPCNT => Instr::I32Popcnt,
        op::I32_ADD => Instr::I32Add,
        op::I32_SUB => Instr::I32Sub,
        op::I32_MUL => Instr::I32Mul,
        op::I32_DIV_S => Instr::I32DivS,
        op::I32_DIV_U => Instr::I32DivU,
        op::I32_REM_S => Instr::I32RemS,
        op::I32_REM_U => Instr::I32RemU,
        op::I32_AND => Instr::I32And,
        op::I32_OR => Instr::I32Or,
        op::I32_XOR => Instr::I32Xor,
        op::I32_SHL => Instr::I32Shl,
        op::I32_SHR_S => Instr::I32ShrS,
        op::I32_SHR_U => Instr::I32ShrU,
        op::I32_ROTL => Instr::I32Rotl,
        op::I32_ROTR => Instr::I32Rotr,

        op::I64_CLZ => Instr::I64Clz,
        op::I64_CTZ => Instr::I64Ctz,
        op::I64_POPCNT => Instr::I64Popcnt,
        op::I64_ADD => Instr::I64Add,
        op::I64_SUB => Instr::I64Sub,
        op::I64_MUL => Instr::I64Mul,
        op::I64_DIV_S => Instr::I64DivS,
        op::I64_DIV_U => Instr::I64DivU,
        op::I64_REM_S => Instr::I64RemS,
        op::I64_REM_U => Instr::I64RemU,
        op::I64_AND => Instr::I64And,
        op::I64_OR => Instr::I64Or,
        op::I64_XOR => Instr::I64Xor,
        op::I64_SHL => Instr::I64Shl,
        op::I64_SHR_S => Instr::I64ShrS,
        op::I64_SHR_U => Instr::I64ShrU,
        op::I64_ROTL => Instr::I64Rotl,
        op::I64_ROTR => Instr::I64Rotr,

        op::F32_ABS => Instr::F32Abs,
        op::F32_NEG => Instr::F32Neg,
        op::F32_CEIL => Instr::F32Ceil,
        op::F32_FLOOR => Instr::F32Floor,
        op::F32_TRUNC => Instr::F32Trunc,
        op::F32_NEAREST => Instr::F32Nearest,
        op::F32_SQRT => Instr::F32Sqrt,
        op::F32_ADD => Instr::F32Add,
        op::F32_SUB => Instr::F32Sub,
        op::F32_MUL => Instr::F32Mul,
        op::F32_DIV => Instr::F32Div,
        op::F32_MIN => Instr::F32Min,
        op::F32_MAX => Instr::F32Max,
        op::F32_COPYSIGN => Instr::F32Copysign,

        op::F64_ABS => Instr::F64Abs,
        op::F64_NEG => Instr::F64Neg,
        op::F64_CEIL => Instr::F64Ceil,
        op::F64_FLOOR => Instr::F64Floor,
        op::F64_TRUNC => Instr::F64Trunc,
        op::F64_NEAREST => Instr::F64Nearest,
        op::F64_SQRT => Instr::F64Sqrt,
        op::F64_ADD => Instr::F64Add,
        op::F64_SUB => Instr::F64Sub,
        op::F64_MUL => Instr::F64Mul,
        op::F64_DIV => Instr::F64Div,
        op::F64_MIN => Instr::F64Min,
        op::F64_MAX => Instr::F64Max,
        op::F64_COPYSIGN => Instr::F64Copysign,

        op::I32_WRAP_I64 => Instr::I32WrapI64,
        op::I32_TRUNC_F32_S => Instr::I32TruncF32S,
        op::I32_TRUNC_F32_U => Instr::I32TruncF32U,
        op::I32_TRUNC_F64_S => Instr::I32TruncF64S,
        op::I32_TRUNC_F64_U => Instr::I32TruncF64U,
        op::I64_EXTEND_I32_S => Instr::I64ExtendI32S,
        op::I64_EXTEND_I32_U => Instr::I64ExtendI32U,
        op::I64_TRUNC_F32_S => Instr::I64TruncF32S,
        op::I64_TRUNC_F32_U => Instr::I64TruncF32U,
        op::I64_TRUNC_F64_S => Instr::I64TruncF64S,
        op::I64_TRUNC_F64_U => Instr::I64TruncF64U,
        op::F32_CONVERT_I32_S => Instr::F32ConvertI32S,
        op::F32_CONVERT_I32_U => Instr::F32ConvertI32U,
        op::F32_CONVERT_I64_S => Instr::F32ConvertI64S,
        op::F32_CONVERT_I64_U => Instr::F32ConvertI64U,
        op::F32_DEMOTE_F64 => Instr::F32DemoteF64,
        op::F64_CONVERT_I32_S => Instr::F64ConvertI32S,
        op::F64_CONVERT_I32_U => Instr::F64ConvertI32U,
        op::F64_CONVERT_I64_S => Instr::F64ConvertI64S,
        op::F64_CONVERT_I64_U => Instr::F64ConvertI64U,
        op::F64_PROMOTE_F32 => Instr::F64PromoteF32,
        op::I32_REINTERPRET_F32 => Instr::I32ReinterpretF32,
        op::I64_REINTERPRET_F64 => Instr::I64ReinterpretF64,
        op::F32_REINTERPRET_I32 => Instr::F32ReinterpretI32,
        op::F64_REINTERPRET_I64 => Instr::F64ReinterpretI64,

        op::I32_EXTEND8_S => Instr::I32Extend8S,
        op::I32_EXTEND16_S => Instr::I32Extend16S,
        op::I64_EXTEND8_S => Instr::I64Extend8S,
        op::I64_EXTEND16_S => Instr::I64Extend16S,
        op::I64_EXTEND32_S => Instr::I64Extend32S,

        op::MISC_PREFIX => {
            let sub = leb128::read_uleb_u32(cur)?;
            match sub {
                op::MISC_MEMORY_COPY => {
                    let _dst_mem = cur.read_u8()?;
                    let _src_mem = cur.read_u8()?;
                    Instr::MemoryCopy
                }
                op::MISC_MEMORY_FILL => {
                    let _mem = cur.read_u8()?;
                    Instr::MemoryFill
                }
                _ => return Err(DecodeError::UnknownOpcode(op::MISC_PREFIX, cur.offset())),
            }
        }

        other => return Err(DecodeError::UnknownOpcode(other, cur.offset())),
    };
    Ok(instr)
}

/// Decode instructions until (and including) the `end` that closes the
/// implicit outer block. Nesting is tracked so inner `end`s don't terminate.
pub fn read_expr(cur: &mut Cursor) -> Result<Vec<Instr>, DecodeError> {
    let mut instrs = Vec::new();
    let mut depth: usize = 0;
    loop {
        let instr = read_instr(cur)?;
        match instr {
            Instr::Block(_) | Instr::Loop(_) | Instr::If(_) => depth += 1,
            Instr::End => {
                if depth == 0 {
                    instrs.push(instr);
                    return Ok(instrs);
                }
                depth -= 1;
            }
            _ => {}
        }
        instrs.push(instr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_simple_expr() {
        // i32.const 1, i32.const 2, i32.add, end
        let bytes = [0x41, 0x01, 0x41, 0x02, 0x6A, 0x0B];
        let mut c = Cursor::new(&bytes);
        let e = read_expr(&mut c).unwrap();
        assert_eq!(
            e,
            vec![
                Instr::I32Const(1),
                Instr::I32Const(2),
                Instr::I32Add,
                Instr::End
            ]
        );
        assert!(c.is_eof());
    }

    #[test]
    fn decode_nested_blocks() {
        // block (empty) { block (empty) { } } end end end
        let bytes = [0x02, 0x40, 0x02, 0x40, 0x0B, 0x0B, 0x0B];
        let mut c = Cursor::new(&bytes);
        let e = read_expr(&mut c).unwrap();
        assert_eq!(e.len(), 5);
        assert_eq!(e.last(), Some(&Instr::End));
    }

    #[test]
    fn decode_memarg_unsigned() {
        // i32.load align=2 offset=0x80 (two-byte uleb), end
        let bytes = [0x28, 0x02, 0x80, 0x01, 0x0B];
        let mut c = Cursor::new(&bytes);
        let e = read_expr(&mut c).unwrap();
        assert_eq!(
            e[0],
            Instr::I32Load(MemArg {
                align: 2,
                offset: 0x80
            })
        );
    }

    #[test]
    fn unknown_opcode_rejected() {
        let bytes = [0xD0, 0x0B];
        let mut c = Cursor::new(&bytes);
        assert!(matches!(
            read_expr(&mut c),
            Err(DecodeError::UnknownOpcode(0xD0, _))
        ));
    }
}
