//! Section walk and per-section payload decoders for the Wasm 1.0 binary
//! format. The decoder is permissive: it checks structure it must rely on
//! (magic, known section ids, functype form, the function/code count pairing)
//! and leaves deeper validation to execution.

use std::sync::Arc;

use tracing::debug;

use super::{
    code::{read_expr, read_val_type},
    cursor::Cursor,
    leb128,
    reader::{read_len_prefixed_bytes, read_name, read_vec},
};
use crate::error::DecodeError;
use crate::model::{
    CustomSection, DataSegment, ElementSegment, Export, ExportDesc, Expr, FuncIdx, FuncType,
    Function, Global, GlobalType, Import, ImportDesc, Limits, LocalDecl, MemIdx, MemoryType,
    Module, RefType, TableIdx, TableType, TypeIdx,
};

/// Standard section identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionId {
    Custom = 0,
    Type = 1,
    Import = 2,
    Function = 3,
    Table = 4,
    Memory = 5,
    Global = 6,
    Export = 7,
    Start = 8,
    Element = 9,
    Code = 10,
    Data = 11,
}

impl SectionId {
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0 => SectionId::Custom,
            1 => SectionId::Type,
            2 => SectionId::Import,
            3 => SectionId::Function,
            4 => SectionId::Table,
            5 => SectionId::Memory,
            6 => SectionId::Global,
            7 => SectionId::Export,
            8 => SectionId::Start,
            9 => SectionId::Element,
            10 => SectionId::Code,
            11 => SectionId::Data,
            _ => return None,
        })
    }
}

/* ---------- Type grammar helpers ---------- */

fn read_limits(cur: &mut Cursor) -> Result<Limits, DecodeError> {
    let tag = cur.read_u8()?;
    match tag {
        0x00 => {
            let min = leb128::read_uleb_u32(cur)?;
            Ok(Limits { min, max: None })
        }
        0x01 => {
            let min = leb128::read_uleb_u32(cur)?;
            let max = leb128::read_uleb_u32(cur)?;
            Ok(Limits {
                min,
                max: Some(max),
            })
        }
        other => Err(DecodeError::UnknownOpcode(other, cur.offset())),
    }
}

fn read_func_type(cur: &mut Cursor) -> Result<FuncType, DecodeError> {
    let form = cur.read_u8()?;
    if form != 0x60 {
        return Err(DecodeError::BadFuncTypeLeading(form));
    }
    let params = read_vec(cur, read_val_type)?;
    let results = read_vec(cur, read_val_type)?;
    Ok(FuncType { params, results })
}

fn read_ref_type(cur: &mut Cursor) -> Result<RefType, DecodeError> {
    let b = cur.read_u8()?;
    match b {
        0x70 => Ok(RefType::FuncRef),
        other => Err(DecodeError::UnknownOpcode(other, cur.offset())),
    }
}

fn read_table_type(cur: &mut Cursor) -> Result<TableType, DecodeError> {
    let elem = read_ref_type(cur)?;
    let limits = read_limits(cur)?;
    Ok(TableType { elem, limits })
}

fn read_memory_type(cur: &mut Cursor) -> Result<MemoryType, DecodeError> {
    let limits = read_limits(cur)?;
    Ok(MemoryType { limits })
}

fn read_global_type(cur: &mut Cursor) -> Result<GlobalType, DecodeError> {
    let val_type = read_val_type(cur)?;
    let mutability = cur.read_u8()?;
    let mutable = match mutability {
        0x00 => false,
        0x01 => true,
        other => return Err(DecodeError::UnknownOpcode(other, cur.offset())),
    };
    Ok(GlobalType { val_type, mutable })
}

fn read_const_expr(cur: &mut Cursor) -> Result<Expr, DecodeError> {
    Ok(Expr {
        instrs: read_expr(cur)?,
    })
}

/* ---------- Section readers ---------- */

fn read_type_section(cur: &mut Cursor) -> Result<Vec<FuncType>, DecodeError> {
    read_vec(cur, read_func_type)
}

fn read_import_section(cur: &mut Cursor) -> Result<Vec<Import>, DecodeError> {
    read_vec(cur, |c| {
        let module = read_name(c)?;
        let name = read_name(c)?;
        let kind = c.read_u8()?;
        let desc = match kind {
            0x00 => ImportDesc::Func(leb128::read_uleb_u32(c)?),
            0x01 => ImportDesc::Table(read_table_type(c)?),
            0x02 => ImportDesc::Memory(read_memory_type(c)?),
            0x03 => ImportDesc::Global(read_global_type(c)?),
            other => return Err(DecodeError::UnknownOpcode(other, c.offset())),
        };
        Ok(Import { module, name, desc })
    })
}

fn read_function_section(cur: &mut Cursor) -> Result<Vec<TypeIdx>, DecodeError> {
    read_vec(cur, |c| leb128::read_uleb_u32(c).map_err(DecodeError::from))
}

fn read_table_section(cur: &mut Cursor) -> Result<Vec<TableType>, DecodeError> {
    read_vec(cur, read_table_type)
}

fn read_memory_section(cur: &mut Cursor) -> Result<Vec<MemoryType>, DecodeError> {
    read_vec(cur, read_memory_type)
}

fn read_global_section(cur: &mut Cursor) -> Result<Vec<Global>, DecodeError> {
    read_vec(cur, |c| {
        let ty = read_global_type(c)?;
        let init = read_const_expr(c)?;
        Ok(Global { ty, init })
    })
}

fn read_export_section(cur: &mut Cursor) -> Result<Vec<Export>, DecodeError> {
    read_vec(cur, |c| {
        let name = read_name(c)?;
        let kind = c.read_u8()?;
        let idx = leb128::read_uleb_u32(c)?;
        let desc = match kind {
            0x00 => ExportDesc::Func(idx),
            0x01 => ExportDesc::Table(idx),
            0x02 => ExportDesc::Memory(idx),
            0x03 => ExportDesc::Global(idx),
            other => return Err(DecodeError::UnknownOpcode(other, c.offset())),
        };
        Ok(Export { name, desc })
    })
}

fn read_start_section(cur: &mut Cursor) -> Result<FuncIdx, DecodeError> {
    Ok(leb128::read_uleb_u32(cur)?)
}

fn read_element_section(cur: &mut Cursor) -> Result<Vec<ElementSegment>, DecodeError> {
    read_vec(cur, |c| {
        let table = leb128::read_uleb_u32(c)? as TableIdx;
        let offset = read_const_expr(c)?;
        let init =
            read_vec::<_, DecodeError, _>(c, |c2| leb128::read_uleb_u32(c2).map_err(Into::into))?;
        Ok(ElementSegment {
            table,
            offset,
            init,
        })
    })
}

/// Code section: size-prefixed bodies, each with local groups and a decoded
/// instruction stream. Returned separately; paired with the function section
/// by the caller.
fn read_code_section(cur: &mut Cursor) -> Result<Vec<(Vec<LocalDecl>, Vec<crate::model::Instr>)>, DecodeError> {
    read_vec(cur, |c| {
        let body_size = leb128::read_uleb_u32(c)? as usize;
        let body_bytes = c.read_bytes(body_size)?;
        let mut sub = Cursor::new(body_bytes);

        let locals = read_vec::<_, DecodeError, _>(&mut sub, |s| {
            let count = leb128::read_uleb_u32(s)?;
            let val_type = read_val_type(s)?;
            Ok(LocalDecl { count, val_type })
        })?;
        let body = read_expr(&mut sub)?;
        Ok((locals, body))
    })
}

fn read_data_section(cur: &mut Cursor) -> Result<Vec<DataSegment>, DecodeError> {
    read_vec(cur, |c| {
        let memory = leb128::read_uleb_u32(c)? as MemIdx;
        let offset = read_const_expr(c)?;
        let init = read_len_prefixed_bytes(c)?;
        Ok(DataSegment {
            memory,
            offset,
            init,
        })
    })
}

/* ---------- Top-level module parser ---------- */

/// Parse a complete module from raw bytes.
pub fn parse_module_from_bytes(bytes: &[u8]) -> Result<Module, DecodeError> {
    let mut cur = Cursor::new(bytes);

    // Magic "\0asm" and version 1
    let magic = cur.read_u32_le().map_err(|_| DecodeError::InvalidMagic)?;
    if magic != 0x6D73_6100 {
        return Err(DecodeError::InvalidMagic);
    }
    let version = cur.read_u32_le().map_err(|_| DecodeError::InvalidMagic)?;
    if version != 0x1 {
        return Err(DecodeError::InvalidMagic);
    }

    let mut module = Module::default();
    let mut func_type_indices: Vec<TypeIdx> = Vec::new();
    let mut codes: Vec<(Vec<LocalDecl>, Vec<crate::model::Instr>)> = Vec::new();

    while !cur.is_eof() {
        let id_byte = cur.read_u8()?;
        let id = SectionId::from_byte(id_byte).ok_or(DecodeError::BadSection(id_byte))?;
        let payload_len = leb128::read_uleb_u32(&mut cur)?;
        let payload = cur.read_bytes(payload_len as usize)?;
        let mut pcur = Cursor::new(payload);

        match id {
            SectionId::Custom => {
                let name = read_name(&mut pcur).unwrap_or_default();
                let data = pcur.read_bytes(pcur.remaining())?.to_vec();
                module.customs.push(CustomSection { name, data });
            }
            SectionId::Type => module.types = read_type_section(&mut pcur)?,
            SectionId::Import => {
                module.imports = read_import_section(&mut pcur)?;
                for imp in &module.imports {
                    match imp.desc {
                        ImportDesc::Func(_) => module.imported_funcs += 1,
                        ImportDesc::Table(_) => module.imported_tables += 1,
                        ImportDesc::Memory(_) => module.imported_memories += 1,
                        ImportDesc::Global(_) => module.imported_globals += 1,
                    }
                }
            }
            SectionId::Function => func_type_indices = read_function_section(&mut pcur)?,
            SectionId::Table => module.tables = read_table_section(&mut pcur)?,
            SectionId::Memory => module.memories = read_memory_section(&mut pcur)?,
            SectionId::Global => module.globals = read_global_section(&mut pcur)?,
            SectionId::Export => module.exports = read_export_section(&mut pcur)?,
            SectionId::Start => module.start = Some(read_start_section(&mut pcur)?),
            SectionId::Element => module.elements = read_element_section(&mut pcur)?,
            SectionId::Code => codes = read_code_section(&mut pcur)?,
            SectionId::Data => module.data = read_data_section(&mut pcur)?,
        }
    }

    if func_type_indices.len() != codes.len() {
        return Err(DecodeError::FunctionCodeCountMismatch);
    }
    module.functions = func_type_indices
        .into_iter()
        .zip(codes)
        .map(|(type_idx, (locals, body))| Function {
            type_idx,
            locals,
            body: Arc::from(body),
        })
        .collect();

    debug!(
        types = module.types.len(),
        functions = module.functions.len(),
        memories = module.memories.len(),
        tables = module.tables.len(),
        "decoded module"
    );
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Smallest valid module: just the header.
    #[test]
    fn empty_module() {
        let bytes = [0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];
        let m = parse_module_from_bytes(&bytes).unwrap();
        assert!(m.types.is_empty());
        assert!(m.functions.is_empty());
    }

    #[test]
    fn bad_magic() {
        let bytes = [0x00, 0x61, 0x73, 0x00, 0x01, 0x00, 0x00, 0x00];
        assert!(matches!(
            parse_module_from_bytes(&bytes),
            Err(DecodeError::InvalidMagic)
        ));
    }

    #[test]
    fn unknown_section_id() {
        let mut bytes = vec![0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&[12, 0]); // id 12 does not exist
        assert!(matches!(
            parse_module_from_bytes(&bytes),
            Err(DecodeError::BadSection(12))
        ));
    }

    #[test]
    fn function_without_code_rejected() {
        let mut bytes = vec![0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];
        // type section: one functype () -> ()
        bytes.extend_from_slice(&[1, 4, 1, 0x60, 0, 0]);
        // function section: one entry, type 0; no code section follows
        bytes.extend_from_slice(&[3, 2, 1, 0]);
        assert!(matches!(
            parse_module_from_bytes(&bytes),
            Err(DecodeError::FunctionCodeCountMismatch)
        ));
    }

    #[test]
    fn custom_section_preserved() {
        let mut bytes = vec![0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];
        // custom section: name "note", payload [1,2,3]
        bytes.extend_from_slice(&[0, 8, 4, b'n', b'o', b't', b'e', 1, 2, 3]);
        let m = parse_module_from_bytes(&bytes).unwrap();
        assert_eq!(m.customs.len(), 1);
        assert_eq!(m.customs[0].name, "note");
        assert_eq!(m.customs[0].data, vec![1, 2, 3]);
    }
}
