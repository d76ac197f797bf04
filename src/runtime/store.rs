//! Central store for all runtime instances. Owns function, table, memory,
//! global, and module instances; everything else refers to them by index.

use std::sync::Arc;

use super::{
    global::GlobalInstance,
    instances::{FuncInstance, ModuleInstance},
    memory::MemoryInstance,
    table::TableInstance,
    InstanceHandle,
};

#[derive(Debug, Default)]
pub struct Store {
    pub funcs: Vec<FuncInstance>,
    pub tables: Vec<TableInstance>,
    pub mems: Vec<MemoryInstance>,
    pub globals: Vec<GlobalInstance>,
    pub modules: Vec<ModuleInstance>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_func(&mut self, f: FuncInstance) -> usize {
        self.funcs.push(f);
        self.funcs.len() - 1
    }

    pub fn alloc_table(&mut self, t: TableInstance) -> usize {
        self.tables.push(t);
        self.tables.len() - 1
    }

    pub fn alloc_memory(&mut self, m: MemoryInstance) -> usize {
        self.mems.push(m);
        self.mems.len() - 1
    }

    pub fn alloc_global(&mut self, g: GlobalInstance) -> usize {
        self.globals.push(g);
        self.globals.len() - 1
    }

    /// Allocate a module instance with only the decoded module attached;
    /// index spaces are committed after import resolution and definition.
    pub fn alloc_module(&mut self, module: Arc<crate::model::Module>) -> InstanceHandle {
        self.modules.push(ModuleInstance {
            module,
            ..Default::default()
        });
        InstanceHandle(self.modules.len() - 1)
    }

    pub fn get_module(&self, idx: usize) -> Option<&ModuleInstance> {
        self.modules.get(idx)
    }

    pub fn get_module_mut(&mut self, idx: usize) -> Option<&mut ModuleInstance> {
        self.modules.get_mut(idx)
    }

    pub fn get_func(&self, idx: usize) -> Option<&FuncInstance> {
        self.funcs.get(idx)
    }

    pub fn get_table(&self, idx: usize) -> Option<&TableInstance> {
        self.tables.get(idx)
    }

    pub fn get_table_mut(&mut self, idx: usize) -> Option<&mut TableInstance> {
        self.tables.get_mut(idx)
    }

    pub fn get_memory(&self, idx: usize) -> Option<&MemoryInstance> {
        self.mems.get(idx)
    }

    pub fn get_memory_mut(&mut self, idx: usize) -> Option<&mut MemoryInstance> {
        self.mems.get_mut(idx)
    }

    pub fn get_global(&self, idx: usize) -> Option<&GlobalInstance> {
        self.globals.get(idx)
    }

    pub fn get_global_mut(&mut self, idx: usize) -> Option<&mut GlobalInstance> {
        self.globals.get_mut(idx)
    }
}
