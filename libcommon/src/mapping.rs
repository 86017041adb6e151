//! Memory-mapped file → zero-copy byte view.
//!
//! `Mapping` owns the file descriptor and the `mmap` region; every `ByteView`
//! and `Cursor` derived from it just borrows a `&[u8]` slice, so they're
//! `Copy` and cheap to pass around. The map (and the file descriptor used to
//! establish it) is released when `Mapping` is dropped.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{Error, Result};

pub struct Mapping {
    mmap: Mmap,
}

impl Mapping {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the file is not subsequently mutated through this handle;
        // modification by another process while mapped is a known, accepted
        // hazard of memory-mapped I/O that this crate does not attempt to
        // guard against.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap })
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> OwnedMapping {
        OwnedMapping { data: data.into() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    #[must_use]
    pub fn view(&self) -> ByteView<'_> {
        ByteView { data: &self.mmap }
    }
}

/// An in-memory stand-in for [`Mapping`], used by tests that build a DCB or
/// P4K buffer in memory instead of reading one off disk.
pub struct OwnedMapping {
    data: Vec<u8>,
}

impl OwnedMapping {
    #[must_use]
    pub fn view(&self) -> ByteView<'_> {
        ByteView { data: &self.data }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A bounded, read-only slice of bytes. Every [`Cursor`] and every
/// [`crate::strings::string_at`] call is range-checked against the view's
/// length; no multi-byte field is assumed to be aligned.
#[derive(Clone, Copy, Debug)]
pub struct ByteView<'a> {
    data: &'a [u8],
}

impl<'a> ByteView<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the `len`-byte subslice starting at `offset`, or
    /// [`Error::OutOfBounds`] if it runs past the end of this view.
    pub fn subslice(&self, offset: usize, len: usize) -> Result<ByteView<'a>> {
        let end = offset.checked_add(len).ok_or(Error::OutOfBounds {
            offset,
            len,
            bound: self.data.len(),
        })?;
        self.data
            .get(offset..end)
            .map(|data| ByteView { data })
            .ok_or(Error::OutOfBounds {
                offset,
                len,
                bound: self.data.len(),
            })
    }

    #[must_use]
    pub fn cursor(&self) -> Cursor<'a> {
        Cursor::new(self.data)
    }

    #[must_use]
    pub fn cursor_at(&self, offset: usize) -> Cursor<'a> {
        Cursor::new(self.data).with_position(offset)
    }
}

/// A logical cursor over a [`ByteView`], offering bounds-checked, unaligned
/// little-endian reads of the primitive types DCB and CryXmlB tables are
/// built from.
#[derive(Clone, Copy, Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

macro_rules! read_le {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<$ty> {
            const SIZE: usize = std::mem::size_of::<$ty>();
            let bytes = self.read_bytes(SIZE)?;
            Ok(<$ty>::from_le_bytes(bytes.try_into().unwrap()))
        }
    };
}

impl<'a> Cursor<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[must_use]
    pub fn with_position(mut self, pos: usize) -> Self {
        self.pos = pos;
        self
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(Error::Truncated {
            offset: self.pos,
            needed: len,
            available: self.remaining(),
        })?;
        let bytes = self.data.get(self.pos..end).ok_or(Error::Truncated {
            offset: self.pos,
            needed: len,
            available: self.remaining(),
        })?;
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_bytes(1)?[0] as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    read_le!(read_u16, u16);
    read_le!(read_i16, i16);
    read_le!(read_u32, u32);
    read_le!(read_i32, i32);
    read_le!(read_u64, u64);
    read_le!(read_i64, i64);
    read_le!(read_f32, f32);
    read_le!(read_f64, f64);

    pub fn read_guid_bytes(&mut self) -> Result<[u8; 16]> {
        Ok(self.read_bytes(16)?.try_into().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_checked_reads() {
        let data = [0x07, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00];
        let mut cursor = ByteView::new(&data).cursor();
        assert_eq!(cursor.read_u32().unwrap(), 7);
        assert_eq!(cursor.read_u32().unwrap(), 5);
        assert!(matches!(cursor.read_u8(), Err(Error::Truncated { .. })));
    }

    #[test]
    fn subslice_out_of_bounds() {
        let data = [1u8, 2, 3, 4];
        let view = ByteView::new(&data);
        assert!(view.subslice(2, 10).is_err());
        assert_eq!(view.subslice(1, 2).unwrap().as_slice(), &[2, 3]);
    }
}
