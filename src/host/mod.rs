//! Import seam. The engine implements no host ABI; a host wires imports in
//! by implementing [`ImportResolver`].

pub mod func;

pub use func::HostFunc;

use crate::model::{FuncType, GlobalType, MemoryType, TableType};

/// Resolves imported items at instantiation time.
/// - Functions resolve to a host callable with the expected signature.
/// - Tables/memories/globals resolve to pre-allocated Store addresses.
pub trait ImportResolver {
    fn resolve_func(
        &self,
        module: &str,
        name: &str,
        ty: &FuncType,
    ) -> Option<std::sync::Arc<HostFunc>>;

    fn resolve_table(&self, module: &str, name: &str, tt: &TableType) -> Option<usize>;
    fn resolve_memory(&self, module: &str, name: &str, mt: &MemoryType) -> Option<usize>;
    fn resolve_global(&self, module: &str, name: &str, gt: &GlobalType) -> Option<usize>;
}

/// Resolver for modules that import nothing; any lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyResolver;

impl ImportResolver for EmptyResolver {
    fn resolve_func(
        &self,
        _module: &str,
        _name: &str,
        _ty: &FuncType,
    ) -> Option<std::sync::Arc<HostFunc>> {
        None
    }

    fn resolve_table(&self, _module: &str, _name: &str, _tt: &TableType) -> Option<usize> {
        None
    }

    fn resolve_memory(&self, _module: &str, _name: &str, _mt: &MemoryType) -> Option<usize> {
        None
    }

    fn resolve_global(&self, _module: &str, _name: &str, _gt: &GlobalType) -> Option<usize> {
        None
    }
}
