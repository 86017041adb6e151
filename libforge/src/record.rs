//! The record table: every named, externally addressable instance in a DCB
//! container, plus the lookup indices built over it.
//!
//! A record is not a structure in its own right — it is a `(structure,
//! instance)` handle with a name and a source filename attached, the same
//! way a directory entry names an inode. Resolving a record's properties
//! goes through [`crate::instance::Instance`] exactly like any other
//! pointer target.

use std::collections::HashMap;

use binrw::BinRead;

use crate::error::{Error, Result};
use crate::guid::Guid;
use crate::instance::{DecodeContext, Instance};
use crate::schema::Schema;

#[derive(Debug, Clone, BinRead)]
#[br(little)]
pub struct RawRecordDefinition {
    pub name_offset: u32,
    pub filename_offset: u32,
    pub structure_index: u32,
    pub id: [u8; 16],
    pub instance_index: u16,
    /// Meaning unconfirmed; preserved verbatim and never read by this
    /// crate, same policy as the header's unknown fields.
    pub other_index: u16,
}

/// One named record: the byte offsets the file stores, resolved to
/// borrowed strings and its GUID.
#[derive(Debug, Clone, Copy)]
pub struct Record<'d> {
    pub name: &'d str,
    pub type_name: &'d str,
    pub filename: &'d str,
    pub id: Guid,
    pub structure_index: u32,
    pub instance_index: u16,
}

impl<'d> Record<'d> {
    /// The record's full dotted name with its type prefix intact, as it
    /// would appear before the `f"{type}."` trim the producer's own `.name`
    /// accessor applies (see `examples/original_source/scdatatools/forge/dftypes/__init__.py`'s
    /// `Record.name`).
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{}.{}", self.type_name, self.name)
    }

    pub fn instance<'s>(&self, ctx: DecodeContext<'s, 'd>) -> Result<Instance<'s, 'd>> {
        let bytes = ctx.instances.get(self.structure_index, u32::from(self.instance_index))?;
        Ok(Instance::new(ctx, self.structure_index, bytes))
    }
}

/// GUID and filename lookups over the full record table, built once at
/// load. Filename search is case-insensitive and normalizes backslashes to
/// forward slashes before matching, since the producer's own filenames mix
/// both separators.
pub struct RecordIndex<'d> {
    records: Vec<Record<'d>>,
    by_guid: HashMap<Guid, usize>,
}

impl<'d> RecordIndex<'d> {
    pub fn build(
        raw: &[RawRecordDefinition],
        schema: &Schema,
        text: libcommon::ByteView<'d>,
    ) -> Result<Self> {
        let mut records = Vec::with_capacity(raw.len());
        let mut by_guid = HashMap::with_capacity(raw.len());

        for r in raw {
            let structure = schema
                .structure(r.structure_index)
                .ok_or_else(|| Error::schema(format!("record names unknown structure {}", r.structure_index)))?;
            let type_name = libcommon::string_at(text, structure.name_offset as usize)?;
            let full_name = libcommon::string_at(text, r.name_offset as usize)?;
            let name = full_name
                .strip_prefix(type_name)
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(full_name);
            let filename = libcommon::string_at(text, r.filename_offset as usize)?;
            let id = Guid::from_bytes(r.id);

            by_guid.insert(id, records.len());
            records.push(Record {
                name,
                type_name,
                filename,
                id,
                structure_index: r.structure_index,
                instance_index: r.instance_index,
            });
        }

        Ok(Self { records, by_guid })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Record<'d>> {
        self.records.iter()
    }

    #[must_use]
    pub fn by_guid(&self, id: Guid) -> Option<&Record<'d>> {
        self.by_guid.get(&id).map(|&i| &self.records[i])
    }

    /// Finds every record whose filename matches `pattern`, case-insensitive
    /// and with backslashes normalized to `/` before matching (consistent
    /// with how the producer itself mixes separators in filename strings).
    #[must_use]
    pub fn find_by_filename(&self, pattern: &str) -> Vec<&Record<'d>> {
        let pattern = glob::Pattern::new(&normalize_path(pattern).to_lowercase());
        let Ok(pattern) = pattern else { return Vec::new() };
        self.records
            .iter()
            .filter(|r| pattern.matches(&normalize_path(r.filename).to_lowercase()))
            .collect()
    }
}

fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawStructureDefinition, NO_PARENT};

    fn text_pool() -> Vec<u8> {
        let mut pool = Vec::new();
        pool.extend_from_slice(b"Widget\0"); // offset 0
        pool.extend_from_slice(b"Widget.hull_plating\0"); // offset 7
        pool.extend_from_slice(b"Data/Weapons/hull_plating.xml\0"); // offset 27
        pool
    }

    fn schema_with_one_structure() -> Schema {
        let structures = vec![RawStructureDefinition {
            name_offset: 0,
            parent_index: NO_PARENT,
            property_count: 0,
            first_property_index: 0,
            node_type: 0,
        }];
        Schema::build(structures, vec![], vec![], vec![]).unwrap()
    }

    #[test]
    fn strips_type_prefix_from_record_name() {
        let schema = schema_with_one_structure();
        let text = text_pool();
        let view = libcommon::ByteView::new(&text);
        let raw = vec![RawRecordDefinition {
            name_offset: 7,
            filename_offset: 27,
            structure_index: 0,
            id: [1; 16],
            instance_index: 0,
            other_index: 0,
        }];
        let index = RecordIndex::build(&raw, &schema, view).unwrap();
        let record = index.iter().next().unwrap();
        assert_eq!(record.type_name, "Widget");
        assert_eq!(record.name, "hull_plating");
        assert_eq!(record.display_name(), "Widget.hull_plating");
    }

    #[test]
    fn finds_record_by_guid_and_filename_case_insensitively() {
        let schema = schema_with_one_structure();
        let text = text_pool();
        let view = libcommon::ByteView::new(&text);
        let raw = vec![RawRecordDefinition {
            name_offset: 7,
            filename_offset: 27,
            structure_index: 0,
            id: [9; 16],
            instance_index: 0,
            other_index: 0,
        }];
        let index = RecordIndex::build(&raw, &schema, view).unwrap();
        assert!(index.by_guid(Guid::from_bytes([9; 16])).is_some());
        assert!(index.by_guid(Guid::from_bytes([0; 16])).is_none());
        assert_eq!(index.find_by_filename("data/weapons/*.xml").len(), 1);
        assert_eq!(index.find_by_filename("*.json").len(), 0);
    }
}
