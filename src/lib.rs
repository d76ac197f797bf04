//! tidewasm: a WebAssembly 1.0 binary decoder and stack-machine interpreter.
//!
//! The engine decodes a binary module, instantiates it (resolving imports,
//! evaluating initializers, binding exports), and evaluates exported
//! functions against caller-supplied values:
//!
//! ```
//! use tidewasm::{Interpreter, Value};
//!
//! // (module (func (export "add") (param i32 i32) (result i32)
//! //   local.get 0 local.get 1 i32.add))
//! let wasm = [
//!     0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00, 0x01, 0x07, 0x01,
//!     0x60, 0x02, 0x7F, 0x7F, 0x01, 0x7F, 0x03, 0x02, 0x01, 0x00, 0x07,
//!     0x07, 0x01, 0x03, b'a', b'd', b'd', 0x00, 0x00, 0x0A, 0x09, 0x01,
//!     0x07, 0x00, 0x20, 0x00, 0x20, 0x01, 0x6A, 0x0B,
//! ];
//! let mut interp = Interpreter::new(&wasm).unwrap();
//! let add = interp.get_func("add").unwrap();
//! let ret = interp.invoke(&add, &[Value::I32(1), Value::I32(1)]).unwrap();
//! assert_eq!(ret, vec![Value::I32(2)]);
//! ```

pub mod binary;
pub mod error;
pub mod host;
pub mod model;
pub mod runtime;
pub mod vm;

use std::sync::Arc;

use tracing::{debug, trace};

use host::{EmptyResolver, ImportResolver};
use model::{ExportDesc, Expr, ImportDesc, Instr, Module};
use runtime::{
    ExternalVal, FuncInstance, GlobalInstance, InstanceHandle, MemoryInstance, Store, TableInstance,
};

pub use error::{DecodeError, LinkError, LookupError, ModuleError, Trap};
pub use model::{FuncType, ValType, Value};

/// Decode a binary module into its IR.
pub fn parse(bytes: &[u8]) -> Result<Module, DecodeError> {
    binary::sections::parse_module_from_bytes(bytes)
}

/// Evaluate a constant expression (global initializers, segment offsets).
/// Runs against an empty operand stack in a throwaway frame; only the
/// constant instructions and `global.get` of an already-defined global are
/// meaningful here.
fn eval_const_expr(
    expr: &Expr,
    store: &Store,
    globals: &[usize],
) -> Result<Value, LinkError> {
    let mut result = None;
    for instr in &expr.instrs {
        match instr {
            Instr::I32Const(v) => result = Some(Value::I32(*v)),
            Instr::I64Const(v) => result = Some(Value::I64(*v)),
            Instr::F32Const(bits) => result = Some(Value::F32(*bits)),
            Instr::F64Const(bits) => result = Some(Value::F64(*bits)),
            Instr::GlobalGet(idx) => {
                let addr = globals
                    .get(*idx as usize)
                    .copied()
                    .ok_or(LinkError::BadConstExpr)?;
                let g = store.get_global(addr).ok_or(LinkError::BadConstExpr)?;
                result = Some(g.get());
            }
            Instr::End => break,
            _ => return Err(LinkError::BadConstExpr),
        }
    }
    result.ok_or(LinkError::BadConstExpr)
}

/// Instantiate a decoded module into the store: resolve imports, allocate
/// function/table/memory/global instances, run element and data segment
/// initialization, bind exports, and invoke the start function if present.
pub fn instantiate(
    store: &mut Store,
    module: Arc<Module>,
    resolver: &impl ImportResolver,
) -> Result<InstanceHandle, LinkError> {
    let handle = store.alloc_module(module.clone());
    let module_index = handle.0;

    let mut funcs: Vec<usize> = Vec::with_capacity(module.total_funcs() as usize);
    let mut tables: Vec<usize> = Vec::new();
    let mut memories: Vec<usize> = Vec::new();
    let mut globals: Vec<usize> = Vec::with_capacity(module.total_globals() as usize);

    // 1) Resolve imports into store addresses.
    for imp in &module.imports {
        let unresolved = || LinkError::UnresolvedImport {
            module: imp.module.clone(),
            name: imp.name.clone(),
        };
        match &imp.desc {
            ImportDesc::Func(type_idx) => {
                let ty = module
                    .types
                    .get(*type_idx as usize)
                    .cloned()
                    .ok_or_else(unresolved)?;
                let f = resolver
                    .resolve_func(&imp.module, &imp.name, &ty)
                    .ok_or_else(unresolved)?;
                funcs.push(store.alloc_func(FuncInstance::Host { ty, f }));
            }
            ImportDesc::Table(tt) => {
                let addr = resolver
                    .resolve_table(&imp.module, &imp.name, tt)
                    .ok_or_else(unresolved)?;
                let t = store.get_table(addr).ok_or_else(unresolved)?;
                if t.size() < tt.limits.min {
                    return Err(LinkError::ImportTypeMismatch {
                        module: imp.module.clone(),
                        name: imp.name.clone(),
                    });
                }
                tables.push(addr);
            }
            ImportDesc::Memory(mt) => {
                let addr = resolver
                    .resolve_memory(&imp.module, &imp.name, mt)
                    .ok_or_else(unresolved)?;
                let m = store.get_memory(addr).ok_or_else(unresolved)?;
                if m.size_pages() < mt.limits.min {
                    return Err(LinkError::ImportTypeMismatch {
                        module: imp.module.clone(),
                        name: imp.name.clone(),
                    });
                }
                memories.push(addr);
            }
            ImportDesc::Global(gt) => {
                let addr = resolver
                    .resolve_global(&imp.module, &imp.name, gt)
                    .ok_or_else(unresolved)?;
                let g = store.get_global(addr).ok_or_else(unresolved)?;
                if g.ty() != gt {
                    return Err(LinkError::ImportTypeMismatch {
                        module: imp.module.clone(),
                        name: imp.name.clone(),
                    });
                }
                globals.push(addr);
            }
        }
    }

    // 2) Define module functions.
    for (func_index, func) in module.functions.iter().enumerate() {
        funcs.push(store.alloc_func(FuncInstance::Wasm {
            type_idx: func.type_idx,
            func_index,
            module: module_index,
        }));
    }

    // 3) Tables and memories: allocated at their declared minimum.
    for tt in &module.tables {
        tables.push(store.alloc_table(TableInstance::new(tt)));
    }
    for mt in &module.memories {
        memories.push(store.alloc_memory(MemoryInstance::new(mt)));
    }

    // 4) Globals: evaluate each initializer against the globals defined so
    // far (imports included), then allocate.
    for glob in &module.globals {
        let init = eval_const_expr(&glob.init, store, &globals)?;
        if init.ty() != glob.ty.val_type {
            return Err(LinkError::BadConstExpr);
        }
        globals.push(store.alloc_global(GlobalInstance::new(glob.ty, init)));
    }

    // 5) Element segments: evaluate offset, extend the table if the segment
    // reaches past its current size, write function addresses.
    for seg in &module.elements {
        let taddr = tables
            .get(seg.table as usize)
            .copied()
            .ok_or(LinkError::InitializerOutOfRange)?;
        let base = match eval_const_expr(&seg.offset, store, &globals)? {
            Value::I32(v) if v >= 0 => v as u32,
            _ => return Err(LinkError::InitializerOutOfRange),
        };
        let needed = base
            .checked_add(seg.init.len() as u32)
            .ok_or(LinkError::InitializerOutOfRange)?;
        let table = store
            .get_table_mut(taddr)
            .ok_or(LinkError::InitializerOutOfRange)?;
        table.ensure_size(needed);
        for (i, func_idx) in seg.init.iter().enumerate() {
            let faddr = funcs
                .get(*func_idx as usize)
                .copied()
                .ok_or(LinkError::InitializerOutOfRange)?;
            table
                .set(base + i as u32, Some(faddr))
                .map_err(|_| LinkError::InitializerOutOfRange)?;
        }
    }

    // 6) Data segments: bounds-check against the target memory, then copy.
    for seg in &module.data {
        let maddr = memories
            .get(seg.memory as usize)
            .copied()
            .ok_or(LinkError::InitializerOutOfRange)?;
        let base = match eval_const_expr(&seg.offset, store, &globals)? {
            Value::I32(v) if v >= 0 => v as usize,
            _ => return Err(LinkError::InitializerOutOfRange),
        };
        let mem = store
            .get_memory_mut(maddr)
            .ok_or(LinkError::InitializerOutOfRange)?;
        let end = base
            .checked_add(seg.init.len())
            .ok_or(LinkError::InitializerOutOfRange)?;
        if end > mem.len() {
            return Err(LinkError::InitializerOutOfRange);
        }
        mem.data_mut()[base..end].copy_from_slice(&seg.init);
    }

    // 7) Exports.
    let mut exports = std::collections::HashMap::new();
    for ex in &module.exports {
        let val = match ex.desc {
            ExportDesc::Func(i) => ExternalVal::Func(
                funcs
                    .get(i as usize)
                    .copied()
                    .ok_or(LinkError::InitializerOutOfRange)?,
            ),
            ExportDesc::Table(i) => ExternalVal::Table(
                tables
                    .get(i as usize)
                    .copied()
                    .ok_or(LinkError::InitializerOutOfRange)?,
            ),
            ExportDesc::Memory(i) => ExternalVal::Mem(
                memories
                    .get(i as usize)
                    .copied()
                    .ok_or(LinkError::InitializerOutOfRange)?,
            ),
            ExportDesc::Global(i) => ExternalVal::Global(
                globals
                    .get(i as usize)
                    .copied()
                    .ok_or(LinkError::InitializerOutOfRange)?,
            ),
        };
        exports.insert(ex.name.clone(), val);
    }

    // 8) Commit the instance, then run the start function.
    let start_addr = module.start.and_then(|i| funcs.get(i as usize).copied());
    {
        let inst = store
            .get_module_mut(module_index)
            .expect("module instance just allocated");
        inst.funcs = funcs;
        inst.tables = tables;
        inst.memories = memories;
        inst.globals = globals;
        inst.exports = exports;
    }

    if let Some(faddr) = start_addr {
        vm::run_function(store, faddr, &[]).map_err(LinkError::StartTrap)?;
    }

    debug!(module = module_index, "instantiated module");
    Ok(handle)
}

/// Handle to an exported function, resolved once via [`Interpreter::get_func`].
#[derive(Debug, Clone)]
pub struct FuncHandle {
    addr: usize,
    ty: FuncType,
}

impl FuncHandle {
    pub fn ty(&self) -> &FuncType {
        &self.ty
    }
}

/// A decoded, instantiated module plus the stacks needed to run it.
/// Strictly single-threaded; each interpreter owns its store.
#[derive(Debug)]
pub struct Interpreter {
    store: Store,
    instance: InstanceHandle,
}

impl Interpreter {
    /// Decode and instantiate a module with no imports.
    pub fn new(wasm_bytes: &[u8]) -> Result<Self, ModuleError> {
        Self::with_imports(wasm_bytes, &EmptyResolver)
    }

    /// Decode and instantiate a module, binding imports via `resolver`.
    pub fn with_imports(
        wasm_bytes: &[u8],
        resolver: &impl ImportResolver,
    ) -> Result<Self, ModuleError> {
        let module = Arc::new(parse(wasm_bytes)?);
        let mut store = Store::new();
        let instance = instantiate(&mut store, module, resolver)?;
        Ok(Self { store, instance })
    }

    /// Look up an exported function by name.
    pub fn get_func(&self, name: &str) -> Result<FuncHandle, LookupError> {
        let inst = self
            .store
            .get_module(self.instance.0)
            .expect("interpreter holds a live instance");
        match inst.resolve_export(name) {
            Some(ExternalVal::Func(addr)) => {
                let ty = match self.store.get_func(addr) {
                    Some(FuncInstance::Wasm { type_idx, .. }) => inst
                        .func_type(*type_idx)
                        .cloned()
                        .ok_or_else(|| LookupError::NotFound(name.to_string()))?,
                    Some(FuncInstance::Host { ty, .. }) => ty.clone(),
                    None => return Err(LookupError::NotFound(name.to_string())),
                };
                Ok(FuncHandle { addr, ty })
            }
            Some(_) => Err(LookupError::NotAFunction(name.to_string())),
            None => Err(LookupError::NotFound(name.to_string())),
        }
    }

    /// Invoke a previously resolved function. Arguments must match the
    /// function's parameter list in number and tags; results come back in
    /// declared order.
    pub fn invoke(&mut self, func: &FuncHandle, args: &[Value]) -> Result<Vec<Value>, Trap> {
        trace!(addr = func.addr, nargs = args.len(), "invoke");
        vm::run_function(&mut self.store, func.addr, args)
    }

    /// Convenience: resolve and invoke an export in one call. Lookup
    /// failures surface as a type-mismatch trap.
    pub fn invoke_export(&mut self, name: &str, args: &[Value]) -> Result<Vec<Value>, Trap> {
        let func = self.get_func(name).map_err(|_| Trap::TypeMismatch)?;
        self.invoke(&func, args)
    }

    /// Exported memory contents, for hosts that inspect linear memory.
    pub fn memory(&self, name: &str) -> Option<&[u8]> {
        let inst = self.store.get_module(self.instance.0)?;
        match inst.resolve_export(name)? {
            ExternalVal::Mem(addr) => self.store.get_memory(addr).map(|m| m.data()),
            _ => None,
        }
    }

    /// Exported global value.
    pub fn global(&self, name: &str) -> Option<Value> {
        let inst = self.store.get_module(self.instance.0)?;
        match inst.resolve_export(name)? {
            ExternalVal::Global(addr) => self.store.get_global(addr).map(|g| g.get()),
            _ => None,
        }
    }
}
