//! Numeric helpers shared by the dispatch loop: stack-shaped unary/binary/
//! relational combinators, Wasm float min/max/nearest, and the checked
//! float-to-integer truncations.

use super::stack::ValueStack;
use crate::error::Trap;
use crate::model::Value;

#[inline]
pub fn bool_i32(b: bool) -> Value {
    Value::I32(b as i32)
}

/* ===== Stack combinators ===== */

pub fn unop_i32(stack: &mut ValueStack, f: impl Fn(i32) -> i32) -> Result<(), Trap> {
    let v = stack.pop_i32()?;
    stack.push(Value::I32(f(v)));
    Ok(())
}

pub fn unop_i64(stack: &mut ValueStack, f: impl Fn(i64) -> i64) -> Result<(), Trap> {
    let v = stack.pop_i64()?;
    stack.push(Value::I64(f(v)));
    Ok(())
}

pub fn unop_f32(stack: &mut ValueStack, f: impl Fn(f32) -> f32) -> Result<(), Trap> {
    let v = f32::from_bits(stack.pop_f32_bits()?);
    stack.push(Value::from_f32(f(v)));
    Ok(())
}

pub fn unop_f64(stack: &mut ValueStack, f: impl Fn(f64) -> f64) -> Result<(), Trap> {
    let v = f64::from_bits(stack.pop_f64_bits()?);
    stack.push(Value::from_f64(f(v)));
    Ok(())
}

pub fn binop_i32(
    stack: &mut ValueStack,
    f: impl Fn(i32, i32) -> Result<i32, Trap>,
) -> Result<(), Trap> {
    let rhs = stack.pop_i32()?;
    let lhs = stack.pop_i32()?;
    let r = f(lhs, rhs)?;
    stack.push(Value::I32(r));
    Ok(())
}

pub fn binop_i64(
    stack: &mut ValueStack,
    f: impl Fn(i64, i64) -> Result<i64, Trap>,
) -> Result<(), Trap> {
    let rhs = stack.pop_i64()?;
    let lhs = stack.pop_i64()?;
    let r = f(lhs, rhs)?;
    stack.push(Value::I64(r));
    Ok(())
}

pub fn binop_f32(stack: &mut ValueStack, f: impl Fn(f32, f32) -> f32) -> Result<(), Trap> {
    let rhs = f32::from_bits(stack.pop_f32_bits()?);
    let lhs = f32::from_bits(stack.pop_f32_bits()?);
    stack.push(Value::from_f32(f(lhs, rhs)));
    Ok(())
}

pub fn binop_f64(stack: &mut ValueStack, f: impl Fn(f64, f64) -> f64) -> Result<(), Trap> {
    let rhs = f64::from_bits(stack.pop_f64_bits()?);
    let lhs = f64::from_bits(stack.pop_f64_bits()?);
    stack.push(Value::from_f64(f(lhs, rhs)));
    Ok(())
}

pub fn cmpop_i32(stack: &mut ValueStack, f: impl Fn(i32, i32) -> bool) -> Result<(), Trap> {
    let rhs = stack.pop_i32()?;
    let lhs = stack.pop_i32()?;
    stack.push(bool_i32(f(lhs, rhs)));
    Ok(())
}

pub fn cmpop_u32(stack: &mut ValueStack, f: impl Fn(u32, u32) -> bool) -> Result<(), Trap> {
    let rhs = stack.pop_i32()? as u32;
    let lhs = stack.pop_i32()? as u32;
    stack.push(bool_i32(f(lhs, rhs)));
    Ok(())
}

pub fn cmpop_i64(stack: &mut ValueStack, f: impl Fn(i64, i64) -> bool) -> Result<(), Trap> {
    let rhs = stack.pop_i64()?;
    let lhs = stack.pop_i64()?;
    stack.push(bool_i32(f(lhs, rhs)));
    Ok(())
}

pub fn cmpop_u64(stack: &mut ValueStack, f: impl Fn(u64, u64) -> bool) -> Result<(), Trap> {
    let rhs = stack.pop_i64()? as u64;
    let lhs = stack.pop_i64()? as u64;
    stack.push(bool_i32(f(lhs, rhs)));
    Ok(())
}

pub fn cmpop_f32(stack: &mut ValueStack, f: impl Fn(f32, f32) -> bool) -> Result<(), Trap> {
    let rhs = f32::from_bits(stack.pop_f32_bits()?);
    let lhs = f32::from_bits(stack.pop_f32_bits()?);
    stack.push(bool_i32(f(lhs, rhs)));
    Ok(())
}

pub fn cmpop_f64(stack: &mut ValueStack, f: impl Fn(f64, f64) -> bool) -> Result<(), Trap> {
    let rhs = f64::from_bits(stack.pop_f64_bits()?);
    let lhs = f64::from_bits(stack.pop_f64_bits()?);
    stack.push(bool_i32(f(lhs, rhs)));
    Ok(())
}

/* ===== Wasm float semantics ===== */

/// Wasm min: NaN if either operand is NaN; -0 beats +0.
pub fn fmin32(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        f32::NAN
    } else if a == b {
        if a.is_sign_negative() {
            a
        } else {
            b
        }
    } else if a < b {
        a
    } else {
        b
    }
}

pub fn fmin64(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == b {
        if a.is_sign_negative() {
            a
        } else {
            b
        }
    } else if a < b {
        a
    } else {
        b
    }
}

/// Wasm max: NaN if either operand is NaN; +0 beats -0.
pub fn fmax32(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        f32::NAN
    } else if a == b {
        if a.is_sign_positive() {
            a
        } else {
            b
        }
    } else if a > b {
        a
    } else {
        b
    }
}

pub fn fmax64(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == b {
        if a.is_sign_positive() {
            a
        } else {
            b
        }
    } else if a > b {
        a
    } else {
        b
    }
}

/// Round to nearest integer, ties to even.
pub fn nearest32(x: f32) -> f32 {
    if x.is_nan() || x.is_infinite() || x == 0.0 {
        return x;
    }
    let t = x.trunc();
    let d = (x - t).abs();
    if d > 0.5 {
        t + 1f32.copysign(x)
    } else if d < 0.5 {
        t
    } else if t % 2.0 == 0.0 {
        t
    } else {
        t + 1f32.copysign(x)
    }
}

pub fn nearest64(x: f64) -> f64 {
    if x.is_nan() || x.is_infinite() || x == 0.0 {
        return x;
    }
    let t = x.trunc();
    let d = (x - t).abs();
    if d > 0.5 {
        t + 1f64.copysign(x)
    } else if d < 0.5 {
        t
    } else if t % 2.0 == 0.0 {
        t
    } else {
        t + 1f64.copysign(x)
    }
}

/* ===== Checked float -> integer truncations =====
 *
 * NaN traps with "invalid conversion to integer"; a value whose truncation
 * falls outside the target range traps with "integer overflow". The range
 * comparisons are on the untruncated value against exclusive bounds, which
 * sidesteps rounding artifacts at the extremes.
 */

pub fn trunc_f32_to_i32(v: f32) -> Result<i32, Trap> {
    if v.is_nan() {
        return Err(Trap::InvalidConversionToInteger);
    }
    if v >= 2147483648.0 || v < -2147483648.0 {
        return Err(Trap::IntegerOverflow);
    }
    Ok(v.trunc() as i32)
}

pub fn trunc_f32_to_u32(v: f32) -> Result<u32, Trap> {
    if v.is_nan() {
        return Err(Trap::InvalidConversionToInteger);
    }
    if v >= 4294967296.0 || v <= -1.0 {
        return Err(Trap::IntegerOverflow);
    }
    Ok(v.trunc() as u32)
}

pub fn trunc_f64_to_i32(v: f64) -> Result<i32, Trap> {
    if v.is_nan() {
        return Err(Trap::InvalidConversionToInteger);
    }
    if v >= 2147483648.0 || v <= -2147483649.0 {
        return Err(Trap::IntegerOverflow);
    }
    Ok(v.trunc() as i32)
}

pub fn trunc_f64_to_u32(v: f64) -> Result<u32, Trap> {
    if v.is_nan() {
        return Err(Trap::InvalidConversionToInteger);
    }
    if v >= 4294967296.0 || v <= -1.0 {
        return Err(Trap::IntegerOverflow);
    }
    Ok(v.trunc() as u32)
}

pub fn trunc_f32_to_i64(v: f32) -> Result<i64, Trap> {
    if v.is_nan() {
        return Err(Trap::InvalidConversionToInteger);
    }
    if v >= 9223372036854775808.0 || v < -9223372036854775808.0 {
        return Err(Trap::IntegerOverflow);
    }
    Ok(v.trunc() as i64)
}

pub fn trunc_f32_to_u64(v: f32) -> Result<u64, Trap> {
    if v.is_nan() {
        return Err(Trap::InvalidConversionToInteger);
    }
    if v >= 18446744073709551616.0 || v <= -1.0 {
        return Err(Trap::IntegerOverflow);
    }
    Ok(v.trunc() as u64)
}

pub fn trunc_f64_to_i64(v: f64) -> Result<i64, Trap> {
    if v.is_nan() {
        return Err(Trap::InvalidConversionToInteger);
    }
    if v >= 9223372036854775808.0 || v < -9223372036854775808.0 {
        return Err(Trap::IntegerOverflow);
    }
    Ok(v.trunc() as i64)
}

pub fn trunc_f64_to_u64(v: f64) -> Result<u64, Trap> {
    if v.is_nan() {
        return Err(Trap::InvalidConversionToInteger);
    }
    if v >= 18446744073709551616.0 || v <= -1.0 {
        return Err(Trap::IntegerOverflow);
    }
    Ok(v.trunc() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_ties_to_even() {
        assert_eq!(nearest64(0.5), 0.0);
        assert_eq!(nearest64(1.5), 2.0);
        assert_eq!(nearest64(2.5), 2.0);
        assert_eq!(nearest64(-0.5), -0.0);
        assert_eq!(nearest64(-1.5), -2.0);
        assert_eq!(nearest64(4.7), 5.0);
        assert_eq!(nearest64(4.3), 4.0);
        assert!(nearest64(-0.5).is_sign_negative());
        assert_eq!(nearest32(2.5), 2.0);
        assert_eq!(nearest32(3.5), 4.0);
    }

    #[test]
    fn min_max_nan_and_zero() {
        assert!(fmin32(f32::NAN, 1.0).is_nan());
        assert!(fmax32(1.0, f32::NAN).is_nan());
        assert!(fmin64(-0.0, 0.0).is_sign_negative());
        assert!(fmax64(-0.0, 0.0).is_sign_positive());
        assert_eq!(fmin64(1.0, 2.0), 1.0);
        assert_eq!(fmax64(1.0, 2.0), 2.0);
    }

    #[test]
    fn trunc_traps() {
        assert_eq!(
            trunc_f32_to_i32(f32::NAN),
            Err(Trap::InvalidConversionToInteger)
        );
        assert_eq!(trunc_f32_to_i32(2147483648.0), Err(Trap::IntegerOverflow));
        assert_eq!(trunc_f32_to_i32(-2147483648.0), Ok(i32::MIN));
        assert_eq!(trunc_f64_to_i32(2147483647.9), Ok(i32::MAX));
        assert_eq!(trunc_f64_to_u32(-0.9), Ok(0));
        assert_eq!(trunc_f64_to_u32(-1.0), Err(Trap::IntegerOverflow));
        assert_eq!(trunc_f64_to_u64(18446744073709551615.9), Err(Trap::IntegerOverflow));
    }
}
