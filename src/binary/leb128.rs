//! ULEB128/SLEB128 decoding.
//!
//! The decoder is deliberately permissive: groups of 7 bits are accumulated
//! little-endian until a byte with a clear continuation bit, and on a signed
//! read the final byte's bit 6 sign-extends the result. The only failure mode
//! is running off the end of the input.

use super::{cursor::Cursor, Result};

/// Decode an unsigned LEB128 as u32.
pub fn read_uleb_u32(cur: &mut Cursor) -> Result<u32> {
    read_uleb_u64(cur).map(|v| v as u32)
}

/// Decode an unsigned LEB128 as u64.
pub fn read_uleb_u64(cur: &mut Cursor) -> Result<u64> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        let byte = cur.read_u8()?;
        if shift < 64 {
            result |= ((byte & 0x7F) as u64) << shift;
        }
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

/// Decode a signed LEB128 as i32.
pub fn read_sleb_i32(cur: &mut Cursor) -> Result<i32> {
    read_sleb_i64(cur).map(|v| v as i32)
}

/// Decode a signed LEB128 as i64.
pub fn read_sleb_i64(cur: &mut Cursor) -> Result<i64> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;
    loop {
        let byte = cur.read_u8()?;
        if shift < 64 {
            result |= ((byte & 0x7F) as i64) << shift;
        }
        shift += 7;
        if byte & 0x80 == 0 {
            if shift < 64 && byte & 0x40 != 0 {
                result |= !0i64 << shift;
            }
            return Ok(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uleb_basic() {
        let cases: &[(&[u8], u64)] = &[
            (&[0x00], 0),
            (&[0x7F], 0x7F),
            (&[0x80, 0x01], 0x80),
            (&[0xFF, 0x01], 0xFF),
            (&[0xFF, 0xFF, 0x03], 0xFFFF),
            (&[0xE5, 0x8E, 0x26], 624485),
            (
                &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01],
                u64::MAX,
            ),
        ];
        for (bytes, expect) in cases {
            let mut c = Cursor::new(bytes);
            assert_eq!(read_uleb_u64(&mut c).unwrap(), *expect);
            assert!(c.is_eof());
        }
    }

    #[test]
    fn sleb_basic() {
        let cases: &[(&[u8], i64)] = &[
            (&[0x00], 0),
            (&[0x01], 1),
            (&[0x7F], -1),
            (&[0x3F], 0x3F),
            (&[0xC0, 0x00], 0x40),
            (&[0x40], -0x40),
            (&[0xBF, 0x7F], -0x41),
            (&[0x9B, 0xF1, 0x59], -624485),
            (
                &[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x7F],
                i64::MIN,
            ),
            (
                &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00],
                i64::MAX,
            ),
        ];
        for (bytes, expect) in cases {
            let mut c = Cursor::new(bytes);
            assert_eq!(read_sleb_i64(&mut c).unwrap(), *expect);
            assert!(c.is_eof());
        }
    }

    #[test]
    fn sleb_i32_sign_extension() {
        let mut c = Cursor::new(&[0x40]);
        assert_eq!(read_sleb_i32(&mut c).unwrap(), -0x40);
    }

    #[test]
    fn truncated_input_is_eof() {
        let mut c = Cursor::new(&[0x80, 0x80]);
        assert!(read_uleb_u32(&mut c).is_err());
    }
}
