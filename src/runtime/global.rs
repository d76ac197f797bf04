//! Global instance: value plus mutability per declared type.

use crate::error::Trap;
use crate::model::{GlobalType, Value};

#[derive(Debug, Clone)]
pub struct GlobalInstance {
    ty: GlobalType,
    val: Value,
}

impl GlobalInstance {
    pub fn new(ty: GlobalType, init: Value) -> Self {
        Self { ty, val: init }
    }

    pub fn get(&self) -> Value {
        self.val
    }

    /// Write the global. Immutable globals reject the write; so does a value
    /// whose tag differs from the declared content type.
    pub fn set(&mut self, v: Value) -> Result<(), Trap> {
        if !self.ty.mutable {
            return Err(Trap::ImmutableGlobal);
        }
        if v.ty() != self.ty.val_type {
            return Err(Trap::TypeMismatch);
        }
        self.val = v;
        Ok(())
    }

    pub fn ty(&self) -> &GlobalType {
        &self.ty
    }
}
