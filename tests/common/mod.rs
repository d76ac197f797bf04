//! Hand-rolled wasm binary assembly for the integration tests: canonical
//! LEB128 encoders and a small module builder that lays sections out in id
//! order.

#![allow(dead_code)]

pub const I32: u8 = 0x7F;
pub const I64: u8 = 0x7E;
pub const F32: u8 = 0x7D;
pub const F64: u8 = 0x7C;

/// Canonical unsigned LEB128 encoding.
pub fn uleb(mut v: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// Canonical signed LEB128 encoding.
pub fn sleb(mut v: i64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        let sign_clear = byte & 0x40 == 0;
        if (v == 0 && sign_clear) || (v == -1 && !sign_clear) {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

fn name_bytes(name: &str) -> Vec<u8> {
    let mut out = uleb(name.len() as u64);
    out.extend_from_slice(name.as_bytes());
    out
}

fn limits_bytes(min: u32, max: Option<u32>) -> Vec<u8> {
    let mut out = Vec::new();
    match max {
        None => {
            out.push(0x00);
            out.extend(uleb(min as u64));
        }
        Some(max) => {
            out.push(0x01);
            out.extend(uleb(min as u64));
            out.extend(uleb(max as u64));
        }
    }
    out
}

/// An `i32.const <v>; end` initializer expression.
pub fn i32_const_expr(v: i32) -> Vec<u8> {
    let mut out = vec![0x41];
    out.extend(sleb(v as i64));
    out.push(0x0B);
    out
}

#[derive(Default)]
pub struct ModuleBuilder {
    types: Vec<Vec<u8>>,
    funcs: Vec<u32>,
    codes: Vec<Vec<u8>>,
    tables: Vec<Vec<u8>>,
    memories: Vec<Vec<u8>>,
    globals: Vec<Vec<u8>>,
    exports: Vec<Vec<u8>>,
    elems: Vec<Vec<u8>>,
    datas: Vec<Vec<u8>>,
    start: Option<u32>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a function type; returns the builder (type index is the
    /// declaration order).
    pub fn func_type(mut self, params: &[u8], results: &[u8]) -> Self {
        let mut e = vec![0x60];
        e.extend(uleb(params.len() as u64));
        e.extend_from_slice(params);
        e.extend(uleb(results.len() as u64));
        e.extend_from_slice(results);
        self.types.push(e);
        self
    }

    /// Define a function: type index, local groups (count, valtype), and the
    /// raw body bytes (must include the trailing `end`, 0x0B).
    pub fn func(mut self, type_idx: u32, locals: &[(u32, u8)], body: &[u8]) -> Self {
        self.funcs.push(type_idx);
        let mut e = uleb(locals.len() as u64);
        for (count, vt) in locals {
            e.extend(uleb(*count as u64));
            e.push(*vt);
        }
        e.extend_from_slice(body);
        self.codes.push(e);
        self
    }

    pub fn table(mut self, min: u32, max: Option<u32>) -> Self {
        let mut e = vec![0x70];
        e.extend(limits_bytes(min, max));
        self.tables.push(e);
        self
    }

    pub fn memory(mut self, min: u32, max: Option<u32>) -> Self {
        self.memories.push(limits_bytes(min, max));
        self
    }

    pub fn global(mut self, val_type: u8, mutable: bool, init_expr: &[u8]) -> Self {
        let mut e = vec![val_type, mutable as u8];
        e.extend_from_slice(init_expr);
        self.globals.push(e);
        self
    }

    fn export(mut self, name: &str, kind: u8, idx: u32) -> Self {
        let mut e = name_bytes(name);
        e.push(kind);
        e.extend(uleb(idx as u64));
        self.exports.push(e);
        self
    }

    pub fn export_func(self, name: &str, idx: u32) -> Self {
        self.export(name, 0x00, idx)
    }

    pub fn export_table(self, name: &str, idx: u32) -> Self {
        self.export(name, 0x01, idx)
    }

    pub fn export_memory(self, name: &str, idx: u32) -> Self {
        self.export(name, 0x02, idx)
    }

    pub fn export_global(self, name: &str, idx: u32) -> Self {
        self.export(name, 0x03, idx)
    }

    pub fn start(mut self, func_idx: u32) -> Self {
        self.start = Some(func_idx);
        self
    }

    pub fn elem(mut self, table_idx: u32, offset: i32, func_indices: &[u32]) -> Self {
        let mut e = uleb(table_idx as u64);
        e.extend(i32_const_expr(offset));
        e.extend(uleb(func_indices.len() as u64));
        for f in func_indices {
            e.extend(uleb(*f as u64));
        }
        self.elems.push(e);
        self
    }

    pub fn data(mut self, mem_idx: u32, offset: i32, bytes: &[u8]) -> Self {
        let mut e = uleb(mem_idx as u64);
        e.extend(i32_const_expr(offset));
        e.extend(uleb(bytes.len() as u64));
        e.extend_from_slice(bytes);
        self.datas.push(e);
        self
    }

    pub fn build(self) -> Vec<u8> {
        fn section(id: u8, payload: Vec<u8>) -> Vec<u8> {
            let mut out = vec![id];
            out.extend(uleb(payload.len() as u64));
            out.extend(payload);
            out
        }

        fn vec_section(id: u8, entries: &[Vec<u8>]) -> Vec<u8> {
            if entries.is_empty() {
                return Vec::new();
            }
            let mut payload = uleb(entries.len() as u64);
            for e in entries {
                payload.extend_from_slice(e);
            }
            section(id, payload)
        }

        let mut out = vec![0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];
        out.extend(vec_section(1, &self.types));
        if !self.funcs.is_empty() {
            let mut payload = uleb(self.funcs.len() as u64);
            for t in &self.funcs {
                payload.extend(uleb(*t as u64));
            }
            out.extend(section(3, payload));
        }
        out.extend(vec_section(4, &self.tables));
        out.extend(vec_section(5, &self.memories));
        out.extend(vec_section(6, &self.globals));
        out.extend(vec_section(7, &self.exports));
        if let Some(idx) = self.start {
            out.extend(section(8, uleb(idx as u64)));
        }
        out.extend(vec_section(9, &self.elems));
        if !self.codes.is_empty() {
            let mut payload = uleb(self.codes.len() as u64);
            for body in &self.codes {
                payload.extend(uleb(body.len() as u64));
                payload.extend_from_slice(body);
            }
            out.extend(section(10, payload));
        }
        out.extend(vec_section(11, &self.datas));
        out
    }
}
