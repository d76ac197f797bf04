//! Operand stack. Values are plain scalars, owned by copy.

use crate::error::Trap;
use crate::model::Value;

#[derive(Debug, Default)]
pub struct ValueStack {
    stack: Vec<Value>,
}

impl ValueStack {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    #[inline]
    pub fn push(&mut self, v: Value) {
        self.stack.push(v);
    }

    #[inline]
    pub fn pop(&mut self) -> Result<Value, Trap> {
        // Underflow means the input was not well typed; validation is out of
        // scope, so this surfaces as a type mismatch.
        self.stack.pop().ok_or(Trap::TypeMismatch)
    }

    pub fn pop_i32(&mut self) -> Result<i32, Trap> {
        match self.pop()? {
            Value::I32(v) => Ok(v),
            _ => Err(Trap::TypeMismatch),
        }
    }

    pub fn pop_i64(&mut self) -> Result<i64, Trap> {
        match self.pop()? {
            Value::I64(v) => Ok(v),
            _ => Err(Trap::TypeMismatch),
        }
    }

    pub fn pop_f32_bits(&mut self) -> Result<u32, Trap> {
        match self.pop()? {
            Value::F32(b) => Ok(b),
            _ => Err(Trap::TypeMismatch),
        }
    }

    pub fn pop_f64_bits(&mut self) -> Result<u64, Trap> {
        match self.pop()? {
            Value::F64(b) => Ok(b),
            _ => Err(Trap::TypeMismatch),
        }
    }

    /// Remove and return the top `n` values, preserving their stack order.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, Trap> {
        if n > self.stack.len() {
            return Err(Trap::TypeMismatch);
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    /// Drop everything above the given height.
    pub fn truncate(&mut self, height: usize) {
        self.stack.truncate(height);
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = Value>) {
        self.stack.extend(values);
    }

    /// Discard all contents (trap cleanup).
    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_n_preserves_order() {
        let mut s = ValueStack::new();
        s.push(Value::I32(1));
        s.push(Value::I32(2));
        s.push(Value::I32(3));
        let top = s.pop_n(2).unwrap();
        assert_eq!(top, vec![Value::I32(2), Value::I32(3)]);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn typed_pop_rejects_wrong_tag() {
        let mut s = ValueStack::new();
        s.push(Value::I64(1));
        assert_eq!(s.pop_i32(), Err(Trap::TypeMismatch));
    }
}
