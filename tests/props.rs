//! Property tests for the algebraic contracts: LEB128 round-trips, the
//! div/rem reconstruction identity, and shift masking.

mod common;

use proptest::prelude::*;

use common::{sleb, uleb, ModuleBuilder, I32};
use tidewasm::binary::{cursor::Cursor, leb128};
use tidewasm::binary::opcodes as op;
use tidewasm::error::Trap;
use tidewasm::model::Value;
use tidewasm::Interpreter;

fn binop_module(opcode: u8) -> Interpreter {
    let wasm = ModuleBuilder::new()
        .func_type(&[I32, I32], &[I32])
        .func(
            0,
            &[],
            &[op::LOCAL_GET, 0, op::LOCAL_GET, 1, opcode, op::END],
        )
        .export_func("run", 0)
        .build();
    Interpreter::new(&wasm).unwrap()
}

fn run_i32(i: &mut Interpreter, a: i32, b: i32) -> Result<i32, Trap> {
    let ret = i.invoke_export("run", &[Value::I32(a), Value::I32(b)])?;
    match ret[0] {
        Value::I32(v) => Ok(v),
        ref v => panic!("expected i32 result, got {v:?}"),
    }
}

proptest! {
    #[test]
    fn uleb_round_trips(v in any::<u64>()) {
        let bytes = uleb(v);
        let mut c = Cursor::new(&bytes);
        prop_assert_eq!(leb128::read_uleb_u64(&mut c).unwrap(), v);
        prop_assert!(c.is_eof());
    }

    #[test]
    fn sleb_round_trips(v in any::<i64>()) {
        let bytes = sleb(v);
        let mut c = Cursor::new(&bytes);
        prop_assert_eq!(leb128::read_sleb_i64(&mut c).unwrap(), v);
        prop_assert!(c.is_eof());
    }

    #[test]
    fn sleb_i32_round_trips(v in any::<i32>()) {
        let bytes = sleb(v as i64);
        let mut c = Cursor::new(&bytes);
        prop_assert_eq!(leb128::read_sleb_i32(&mut c).unwrap(), v);
    }

    // (a div_s b) * b + (a rem_s b) == a, whenever division is defined
    #[test]
    fn div_rem_reconstruct(a in any::<i32>(), b in any::<i32>()) {
        prop_assume!(b != 0);
        prop_assume!(!(a == i32::MIN && b == -1));
        let mut div = binop_module(op::I32_DIV_S);
        let mut rem = binop_module(op::I32_REM_S);
        let q = run_i32(&mut div, a, b).unwrap();
        let r = run_i32(&mut rem, a, b).unwrap();
        prop_assert_eq!(q.wrapping_mul(b).wrapping_add(r), a);
    }

    #[test]
    fn division_by_zero_always_traps(a in any::<i32>()) {
        let mut div = binop_module(op::I32_DIV_S);
        prop_assert_eq!(run_i32(&mut div, a, 0), Err(Trap::IntegerDivideByZero));
    }

    #[test]
    fn shifts_mask_modulo_32(a in any::<i32>(), s in any::<i32>()) {
        let mut shl = binop_module(op::I32_SHL);
        let wide = run_i32(&mut shl, a, s).unwrap();
        let masked = run_i32(&mut shl, a, s & 31).unwrap();
        prop_assert_eq!(wide, masked);
    }
}

#[test]
fn leb_reference_vectors() {
    // well-known canonical encodings
    assert_eq!(uleb(0x80), vec![0x80, 0x01]);
    assert_eq!(uleb(0xFFFF), vec![0xFF, 0xFF, 0x03]);
    assert_eq!(sleb(-1), vec![0x7F]);
    assert_eq!(sleb(-0x40), vec![0x40]);
    assert_eq!(sleb(-624485), vec![0x9B, 0xF1, 0x59]);
}
