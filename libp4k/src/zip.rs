//! Raw ZIP structures and the handful of ways P4K's dialect deviates from
//! stock ZIP: a non-standard local file header magic, a custom compression
//! id for Zstandard, and ZIP64 extra-field promotion of sentinel-valued
//! central-directory fields.

use binrw::{BinRead, BinReaderExt};

use crate::error::{Error, Result};

pub const LOCAL_HEADER_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x14];
pub const STOCK_LOCAL_HEADER_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
pub const CENTRAL_DIR_SIGNATURE: u32 = 0x0201_4B50;
pub const EOCD_SIGNATURE: u32 = 0x0605_4B50;

/// Identifies Zstandard in a central directory entry's `compress_type`
/// field. Not part of the stock ZIP `APPNOTE.TXT` table; this is the
/// producer's own extension.
pub const COMPRESS_ZSTD: u16 = 100;
pub const COMPRESS_STORED: u16 = 0;
pub const COMPRESS_DEFLATE: u16 = 8;

const ZIP64_EXTRA_ID: u16 = 0x0001;
const SENTINEL_U32: u32 = 0xFFFF_FFFF;

/// Flag bit 5: the entry is "compressed patched data", an obsolete feature
/// this decoder does not implement.
const FLAG_PATCHED_DATA: u16 = 0x0020;
/// Flag bit 6: "strong encryption", distinct from (and unrelated to) the
/// AES-CBC scheme P4K actually uses.
const FLAG_STRONG_ENCRYPTION: u16 = 0x0040;

/// End-of-central-directory record, sans its leading 4-byte signature
/// (callers locate and strip that while scanning backward from EOF).
#[derive(Debug, Clone, BinRead)]
#[br(little)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub central_dir_disk: u16,
    pub central_dir_records_this_disk: u16,
    pub central_dir_records_total: u16,
    pub central_dir_size: u32,
    pub central_dir_offset: u32,
    pub comment_length: u16,
}

impl EndOfCentralDirectory {
    pub const SIZE: usize = 18;

    /// Scans backward from the end of `data` for the EOCD signature,
    /// bounded the same way stock ZIP readers bound it: the record plus a
    /// comment of at most 65535 bytes, so the search window is at most
    /// `SIZE + 4 + 65535` bytes from the end of the file.
    pub fn find(data: &[u8]) -> Result<(Self, usize)> {
        let window_start = data.len().saturating_sub(Self::SIZE + 4 + 0xFFFF);
        let search_region = &data[window_start..];
        for start in (0..search_region.len().saturating_sub(3)).rev() {
            if search_region[start..start + 4] == EOCD_SIGNATURE.to_le_bytes() {
                let absolute = window_start + start;
                let mut cursor = binrw::io::Cursor::new(&data[absolute + 4..]);
                let eocd = Self::read(&mut cursor)?;
                return Ok((eocd, absolute));
            }
        }
        Err(Error::BadSignature)
    }
}

/// Central directory file header, sans its leading 4-byte signature and
/// the trailing variable-length filename/extra/comment fields (read
/// separately, since their lengths live in this struct).
#[derive(Debug, Clone, BinRead)]
#[br(little)]
pub struct CentralDirectoryHeader {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compress_type: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compress_size: u32,
    pub file_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub comment_length: u16,
    pub disk_number_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub local_header_offset: u32,
}

impl CentralDirectoryHeader {
    pub const SIZE: usize = 42;
}

/// Local file header, sans its leading 4-byte magic and the trailing
/// variable-length filename/extra fields.
#[derive(Debug, Clone, BinRead)]
#[br(little)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compress_type: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compress_size: u32,
    pub file_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    pub const SIZE: usize = 26;
}

/// The three central-directory fields ZIP64 can promote to 64-bit values,
/// resolved from the entry's extra field.
#[derive(Debug, Clone, Copy, Default)]
pub struct Zip64Fields {
    pub file_size: Option<u64>,
    pub compress_size: Option<u64>,
    pub header_offset: Option<u64>,
}

/// Scans an entry's extra field for a ZIP64 record (id `0x0001`) and
/// returns whichever of `file_size`/`compress_size`/`header_offset` it
/// carries, in the fixed order the format always writes them: only the
/// fields whose central-directory value was the `0xFFFFFFFF` sentinel are
/// present, uncompressed size first, then compressed size, then local
/// header offset (§4.8, §8 "ZIP64 extensions").
pub fn parse_zip64_extra(
    extra: &[u8],
    file_size_is_sentinel: bool,
    compress_size_is_sentinel: bool,
    header_offset_is_sentinel: bool,
) -> Result<Zip64Fields> {
    let mut fields = Zip64Fields::default();
    let mut cursor = binrw::io::Cursor::new(extra);
    loop {
        let Ok(id) = cursor.read_le::<u16>() else { break };
        let Ok(size) = cursor.read_le::<u16>() else { break };
        let start = cursor.position() as usize;
        let end = start + size as usize;
        if end > extra.len() {
            return Err(Error::truncated("extra field record runs past end of extra field"));
        }
        if id == ZIP64_EXTRA_ID {
            let mut field_cursor = binrw::io::Cursor::new(&extra[start..end]);
            if file_size_is_sentinel {
                fields.file_size = Some(field_cursor.read_le::<u64>()?);
            }
            if compress_size_is_sentinel {
                fields.compress_size = Some(field_cursor.read_le::<u64>()?);
            }
            if header_offset_is_sentinel {
                fields.header_offset = Some(field_cursor.read_le::<u64>()?);
            }
            break;
        }
        cursor.set_position(end as u64);
    }
    Ok(fields)
}

#[must_use]
pub fn is_sentinel_u32(value: u32) -> bool {
    value == SENTINEL_U32
}

/// Per §4.8: entry extra fields at least 169 bytes with a non-zero byte at
/// offset 168 are AES-CBC encrypted with the key the archive was opened
/// with (see [`crate::crypto`] for the actual key size this resolves to).
#[must_use]
pub fn is_encrypted(extra: &[u8]) -> bool {
    extra.len() >= 169 && extra[168] != 0
}

pub fn check_supported_flags(flags: u16) -> Result<()> {
    if flags & FLAG_PATCHED_DATA != 0 {
        return Err(Error::unsupported_flag("compressed patched data (bit 5)"));
    }
    if flags & FLAG_STRONG_ENCRYPTION != 0 {
        return Err(Error::unsupported_flag("strong encryption (bit 6)"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_eocd_at_end_of_buffer() {
        let mut data = vec![0u8; 10];
        data.extend_from_slice(&EOCD_SIGNATURE.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&100u32.to_le_bytes());
        data.extend_from_slice(&10u32.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes()); // comment_length
        let (eocd, offset) = EndOfCentralDirectory::find(&data).unwrap();
        assert_eq!(offset, 10);
        assert_eq!(eocd.central_dir_offset, 10);
        assert_eq!(eocd.central_dir_size, 100);
    }

    #[test]
    fn missing_eocd_signature_is_bad_signature() {
        let data = vec![0u8; 64];
        assert!(matches!(EndOfCentralDirectory::find(&data), Err(Error::BadSignature)));
    }

    #[test]
    fn encryption_flag_requires_169_bytes() {
        let mut extra = vec![0u8; 168];
        assert!(!is_encrypted(&extra));
        extra.push(1);
        assert!(is_encrypted(&extra));
        extra[168] = 0;
        assert!(!is_encrypted(&extra));
    }

    #[test]
    fn zip64_extra_promotes_only_sentinel_fields() {
        let mut extra = Vec::new();
        extra.extend_from_slice(&ZIP64_EXTRA_ID.to_le_bytes());
        extra.extend_from_slice(&16u16.to_le_bytes()); // size: two u64 fields
        extra.extend_from_slice(&0xFFFF_FFFF_FFFF_FFFFu64.to_le_bytes()); // unused filler, proves we don't overrun
        extra.truncate(4);
        extra.extend_from_slice(&12345u64.to_le_bytes());
        extra.extend_from_slice(&6789u64.to_le_bytes());
        let fields = parse_zip64_extra(&extra, true, true, false).unwrap();
        assert_eq!(fields.file_size, Some(12345));
        assert_eq!(fields.compress_size, Some(6789));
        assert_eq!(fields.header_offset, None);
    }
}
