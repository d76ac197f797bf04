//! Higher-level binary helpers: length-prefixed vectors and UTF-8 names.

use super::{cursor::Cursor, leb128, BinaryReadError, Result};

/// Read a length-prefixed run of raw bytes (u32 length via ULEB128).
pub fn read_len_prefixed_bytes(cur: &mut Cursor) -> Result<Vec<u8>> {
    let len = leb128::read_uleb_u32(cur)? as usize;
    let bytes = cur.read_bytes(len)?.to_vec();
    Ok(bytes)
}

/// Read a UTF-8 name (length-prefixed bytes).
pub fn read_name(cur: &mut Cursor) -> Result<String> {
    let bytes = read_len_prefixed_bytes(cur)?;
    String::from_utf8(bytes).map_err(|_| BinaryReadError::InvalidUtf8 {
        offset: cur.offset(),
    })
}

/// Read a vector of T using the provided element reader closure.
/// Length is encoded as ULEB128 u32.
pub fn read_vec<T, E, F>(cur: &mut Cursor, mut elem: F) -> core::result::Result<Vec<T>, E>
where
    E: From<BinaryReadError>,
    F: FnMut(&mut Cursor) -> core::result::Result<T, E>,
{
    let len = leb128::read_uleb_u32(cur)? as usize;
    let mut out = Vec::with_capacity(len.min(1 << 16));
    for _ in 0..len {
        out.push(elem(cur)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_name_ok() {
        let data = [0x03, b'a', b'd', b'd'];
        let mut c = Cursor::new(&data);
        assert_eq!(read_name(&mut c).unwrap(), "add");
    }

    #[test]
    fn read_name_bad_utf8() {
        let data = [0x02, 0xFF, 0xFE];
        let mut c = Cursor::new(&data);
        assert!(matches!(
            read_name(&mut c),
            Err(BinaryReadError::InvalidUtf8 { .. })
        ));
    }

    #[test]
    fn read_vec_of_bytes() {
        let data = [0x02, 0xAA, 0xBB];
        let mut c = Cursor::new(&data);
        let v: Vec<u8> = read_vec::<_, BinaryReadError, _>(&mut c, |c| c.read_u8()).unwrap();
        assert_eq!(v, vec![0xAA, 0xBB]);
    }
}
