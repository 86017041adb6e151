use binrw::BinRead;

use crate::pool::PoolType;

/// Fixed-size file header: magic-unknowns, a version, five definition-table
/// counts, one count per value pool (eighteen of them, `Boolean` first) plus
/// the enum-option-name pool's own count, then the shared string pool's
/// byte length.
///
/// Several fields are labelled "unknown" because their meaning is not
/// established; they are preserved verbatim and never validated, per the
/// documented behaviour for this format.
#[derive(Debug, Clone, BinRead)]
#[br(little)]
pub struct Header {
    pub unknown0: u32,
    pub version: u32,
    pub unknown1: u16,
    pub unknown2: u16,
    pub unknown3: u16,
    pub unknown4: u16,
    pub structure_definition_count: u32,
    pub property_definition_count: u32,
    pub enum_definition_count: u32,
    pub data_mapping_definition_count: u32,
    pub record_definition_count: u32,
    #[br(count = PoolType::COUNT)]
    pub pool_counts: Vec<u32>,
    pub enum_option_name_count: u32,
    pub text_length: u32,
    pub unknown_trailing: u32,
}

impl Header {
    #[must_use]
    pub fn pool_count(&self, ty: PoolType) -> u32 {
        self.pool_counts[ty.slot()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::io::Cursor;

    fn sample_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u32.to_le_bytes()); // unknown0
        bytes.extend_from_slice(&6u32.to_le_bytes()); // version
        bytes.extend_from_slice(&0u16.to_le_bytes()); // unknown1
        bytes.extend_from_slice(&0u16.to_le_bytes()); // unknown2
        bytes.extend_from_slice(&0u16.to_le_bytes()); // unknown3
        bytes.extend_from_slice(&0u16.to_le_bytes()); // unknown4
        bytes.extend_from_slice(&1u32.to_le_bytes()); // structure_definition_count
        bytes.extend_from_slice(&1u32.to_le_bytes()); // property_definition_count
        bytes.extend_from_slice(&0u32.to_le_bytes()); // enum_definition_count
        bytes.extend_from_slice(&1u32.to_le_bytes()); // data_mapping_definition_count
        bytes.extend_from_slice(&1u32.to_le_bytes()); // record_definition_count
        for _ in 0..PoolType::COUNT {
            bytes.extend_from_slice(&0u32.to_le_bytes());
        }
        bytes.extend_from_slice(&0u32.to_le_bytes()); // enum_option_name_count
        bytes.extend_from_slice(&6u32.to_le_bytes()); // text_length: "hello\0"
        bytes.extend_from_slice(&0u32.to_le_bytes()); // unknown_trailing
        bytes
    }

    #[test]
    fn reads_header_fields() {
        let bytes = sample_bytes();
        let mut cursor = Cursor::new(bytes);
        let header = Header::read(&mut cursor).unwrap();
        assert_eq!(header.version, 6);
        assert_eq!(header.structure_definition_count, 1);
        assert_eq!(header.record_definition_count, 1);
        assert_eq!(header.text_length, 6);
        assert_eq!(header.pool_counts.len(), PoolType::COUNT);
    }
}
