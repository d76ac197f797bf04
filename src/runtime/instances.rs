//! Instance records for functions and modules.

use std::collections::HashMap;
use std::sync::Arc;

use crate::host::HostFunc;
use crate::model::{FuncType, Module, TypeIdx};

/// A function instance: either defined by a module's code section or provided
/// by the host through the import seam.
#[derive(Clone)]
pub enum FuncInstance {
    Wasm {
        type_idx: TypeIdx,
        /// Index into Module.functions (definition index, imports excluded).
        func_index: usize,
        /// Owning module instance index in Store.modules.
        module: usize,
    },
    Host {
        ty: FuncType,
        f: Arc<HostFunc>,
    },
}

impl std::fmt::Debug for FuncInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FuncInstance::Wasm {
                type_idx,
                func_index,
                module,
            } => f
                .debug_struct("Wasm")
                .field("type_idx", type_idx)
                .field("func_index", func_index)
                .field("module", module)
                .finish(),
            FuncInstance::Host { ty, .. } => f.debug_struct("Host").field("ty", ty).finish(),
        }
    }
}

/// Runtime export descriptor: kind plus store address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalVal {
    Func(usize),
    Table(usize),
    Mem(usize),
    Global(usize),
}

/// A module instance holds store addresses for everything in its index
/// spaces (imports first, then definitions) plus the export table. The
/// decoded module is shared so frames can reach types and code at runtime.
#[derive(Debug, Clone, Default)]
pub struct ModuleInstance {
    pub funcs: Vec<usize>,
    pub tables: Vec<usize>,
    pub memories: Vec<usize>,
    pub globals: Vec<usize>,
    pub exports: HashMap<String, ExternalVal>,
    pub module: Arc<Module>,
}

impl ModuleInstance {
    pub fn resolve_export(&self, name: &str) -> Option<ExternalVal> {
        self.exports.get(name).copied()
    }

    pub fn func_type(&self, type_idx: TypeIdx) -> Option<&FuncType> {
        self.module.types.get(type_idx as usize)
    }
}
