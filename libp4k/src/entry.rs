//! One central directory entry: a record describing where an archive
//! member's local header lives and how to turn its bytes back into
//! plaintext, without reading the member's data itself.

use binrw::BinReaderExt;

use crate::error::Result;
use crate::zip::{is_encrypted, is_sentinel_u32, parse_zip64_extra, CentralDirectoryHeader};

/// One P4K/ZIP archive member, as described by its central directory
/// record. Resolving `is_encrypted`/`compress_type` tells a caller how
/// [`crate::archive::P4kArchive::open_entry`] will decode it; nothing here
/// has read the member's actual bytes yet.
#[derive(Debug, Clone)]
pub struct P4kEntry {
    pub name: String,
    pub compress_type: u16,
    pub compress_size: u64,
    pub file_size: u64,
    pub crc32: u32,
    pub header_offset: u64,
    pub flags: u16,
    pub encrypted: bool,
}

impl P4kEntry {
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compress_type != crate::zip::COMPRESS_STORED
    }
}

/// Parses one central directory record out of `cursor`, which must be
/// positioned immediately after the record's 4-byte signature. Advances
/// the cursor past the fixed header and the variable-length
/// name/extra/comment fields that follow it.
pub(crate) fn read_central_directory_entry(
    cursor: &mut binrw::io::Cursor<&[u8]>,
) -> Result<P4kEntry> {
    let header: CentralDirectoryHeader = cursor.read_le()?;

    let mut name_bytes = vec![0u8; header.file_name_length as usize];
    std::io::Read::read_exact(cursor, &mut name_bytes)?;
    // Flag bit 11 marks a UTF-8 filename; the historical alternative is
    // cp437, which agrees with ASCII for every byte below 0x80 and is
    // approximated as Latin-1 above it (game asset paths are ASCII in
    // practice).
    let name = if header.flags & 0x0800 != 0 {
        String::from_utf8_lossy(&name_bytes).into_owned()
    } else {
        name_bytes.iter().map(|&b| b as char).collect()
    };

    let mut extra = vec![0u8; header.extra_field_length as usize];
    std::io::Read::read_exact(cursor, &mut extra)?;

    let mut comment = vec![0u8; header.comment_length as usize];
    std::io::Read::read_exact(cursor, &mut comment)?;

    let zip64 = parse_zip64_extra(
        &extra,
        is_sentinel_u32(header.file_size),
        is_sentinel_u32(header.compress_size),
        is_sentinel_u32(header.local_header_offset),
    )?;

    let file_size = zip64.file_size.unwrap_or(u64::from(header.file_size));
    let compress_size = zip64.compress_size.unwrap_or(u64::from(header.compress_size));
    let header_offset = zip64.header_offset.unwrap_or(u64::from(header.local_header_offset));

    Ok(P4kEntry {
        name,
        compress_type: header.compress_type,
        compress_size,
        file_size,
        crc32: header.crc32,
        header_offset,
        flags: header.flags,
        encrypted: is_encrypted(&extra),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn central_directory_bytes(encrypted: bool) -> Vec<u8> {
        let name = b"Data/foo.xml";
        let mut extra = Vec::new();
        if encrypted {
            extra = vec![0u8; 169];
            extra[168] = 1;
        }
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u16.to_le_bytes()); // version_made_by
        bytes.extend_from_slice(&20u16.to_le_bytes()); // version_needed
        bytes.extend_from_slice(&0u16.to_le_bytes()); // flags
        bytes.extend_from_slice(&100u16.to_le_bytes()); // compress_type: zstd
        bytes.extend_from_slice(&0u16.to_le_bytes()); // mod_time
        bytes.extend_from_slice(&0u16.to_le_bytes()); // mod_date
        bytes.extend_from_slice(&0u32.to_le_bytes()); // crc32
        bytes.extend_from_slice(&10u32.to_le_bytes()); // compress_size
        bytes.extend_from_slice(&20u32.to_le_bytes()); // file_size
        bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes()); // comment_length
        bytes.extend_from_slice(&0u16.to_le_bytes()); // disk_number_start
        bytes.extend_from_slice(&0u16.to_le_bytes()); // internal_attrs
        bytes.extend_from_slice(&0u32.to_le_bytes()); // external_attrs
        bytes.extend_from_slice(&1234u32.to_le_bytes()); // local_header_offset
        bytes.extend_from_slice(name);
        bytes.extend_from_slice(&extra);
        bytes
    }

    #[test]
    fn parses_a_plain_entry() {
        let bytes = central_directory_bytes(false);
        let mut cursor = binrw::io::Cursor::new(bytes.as_slice());
        let entry = read_central_directory_entry(&mut cursor).unwrap();
        assert_eq!(entry.name, "Data/foo.xml");
        assert_eq!(entry.compress_size, 10);
        assert_eq!(entry.file_size, 20);
        assert_eq!(entry.header_offset, 1234);
        assert!(!entry.is_encrypted());
        assert!(entry.is_compressed());
    }

    #[test]
    fn parses_an_encrypted_entry() {
        let bytes = central_directory_bytes(true);
        let mut cursor = binrw::io::Cursor::new(bytes.as_slice());
        let entry = read_central_directory_entry(&mut cursor).unwrap();
        assert!(entry.is_encrypted());
    }
}
