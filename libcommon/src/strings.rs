//! NUL-terminated string lookups into a shared string pool.

use std::str;

use crate::error::{Error, Result};
use crate::mapping::ByteView;

/// Reads the NUL-terminated, UTF-8 string starting at `offset` in `pool`.
///
/// Scans for the terminator with `memchr` rather than decoding byte-by-byte;
/// DCB, P4K central-directory, and CryXmlB string pools are all flat byte
/// regions of exactly this shape.
pub fn string_at(pool: ByteView<'_>, offset: usize) -> Result<&str> {
    let bytes = pool.as_slice();
    let start = bytes.get(offset..).ok_or(Error::OutOfBounds {
        offset,
        len: 0,
        bound: bytes.len(),
    })?;
    let end = memchr::memchr(0, start).ok_or(Error::InvalidString { offset })?;
    str::from_utf8(&start[..end]).map_err(|source| Error::InvalidUtf8 { offset, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_nul_terminated_string() {
        let pool = b"hello\0world\0";
        let view = ByteView::new(pool);
        assert_eq!(string_at(view, 0).unwrap(), "hello");
        assert_eq!(string_at(view, 6).unwrap(), "world");
    }

    #[test]
    fn missing_terminator_is_an_error() {
        let pool = b"hello";
        let view = ByteView::new(pool);
        assert!(matches!(string_at(view, 0), Err(Error::InvalidString { offset: 0 })));
    }

    #[test]
    fn offset_past_end_is_out_of_bounds() {
        let pool = b"hello\0";
        let view = ByteView::new(pool);
        assert!(matches!(string_at(view, 100), Err(Error::OutOfBounds { .. })));
    }
}
