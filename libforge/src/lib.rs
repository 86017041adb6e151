// https://github.com/rust-lang/cargo/issues/5034
#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::map_err_ignore,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod guid;
pub mod header;
pub mod instance;
pub mod pool;
pub mod record;
pub mod schema;

pub use error::{Error, Result};
pub use guid::Guid;
pub use header::Header;
pub use instance::{DecodeContext, Handle, Instance, Instances, PointerKind, ReferenceValue, Value};
pub use pool::{PoolType, ValuePools};
pub use record::{Record, RecordIndex};
pub use schema::Schema;

use binrw::BinRead;
use libcommon::ByteView;
use log::debug;

use schema::{RawDataMappingDefinition, RawEnumDefinition, RawPropertyDefinition, RawStructureDefinition};

/// The deepest a `StrongPointer`/`WeakPointer`/`Class` chain may recurse
/// while dumping a record to JSON before this crate assumes a cycle and
/// bails out, rather than walking it forever.
pub const MAX_DUMP_DEPTH: usize = 64;

/// A fully parsed DataCore Binary container: schema, value pools, string
/// pool, instance table and record index, all borrowed from a single
/// memory-mapped (or in-memory) byte view. Nothing here is decoded until a
/// caller asks for a record's properties.
pub struct DataCore<'d> {
    header: Header,
    schema: Schema,
    pools: ValuePools,
    text: ByteView<'d>,
    instances: Instances<'d>,
    records: RecordIndex<'d>,
    original: ByteView<'d>,
}

impl<'d> DataCore<'d> {
    /// Parses a DCB container out of `view`, in file order: header, the
    /// five definition tables, the eighteen value pools (plus the
    /// nineteenth enum-option-name pool), the string pool, then the packed
    /// instance blobs.
    pub fn load(view: ByteView<'d>) -> Result<Self> {
        // The fixed-size header and definition tables are read with binrw,
        // which wants its own `Read + Seek` cursor over the raw slice; the
        // value pools and string/instance sections that follow are read
        // with libcommon's bounds-checked `Cursor` instead, so we hand off
        // from one cursor flavour to the other at the offset binrw leaves
        // us at.
        let mut br_cursor = binrw::io::Cursor::new(view.as_slice());
        let header = Header::read(&mut br_cursor)?;

        let structures = read_vec::<RawStructureDefinition>(&mut br_cursor, header.structure_definition_count)?;
        let properties = read_vec::<RawPropertyDefinition>(&mut br_cursor, header.property_definition_count)?;
        let enums = read_vec::<RawEnumDefinition>(&mut br_cursor, header.enum_definition_count)?;
        let data_mappings =
            read_vec::<RawDataMappingDefinition>(&mut br_cursor, header.data_mapping_definition_count)?;
        let raw_records = read_vec::<record::RawRecordDefinition>(&mut br_cursor, header.record_definition_count)?;

        let schema = Schema::build(structures, properties, enums, data_mappings)?;

        let mut cursor = view.cursor_at(br_cursor.position() as usize);
        let pools = ValuePools::read(&mut cursor, &header.pool_counts, header.enum_option_name_count)?;

        let text = view.subslice(cursor.position(), header.text_length as usize)?;
        cursor.skip(header.text_length as usize)?;

        let tail = view.subslice(cursor.position(), view.len() - cursor.position())?;
        let instances = Instances::read(&schema, tail)?;

        let records = RecordIndex::build(&raw_records, &schema, text)?;
        debug!("loaded DataCore: {} structures, {} records", schema.structures.len(), records.len());

        Ok(Self { header, schema, pools, text, instances, records, original: view })
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn records(&self) -> &RecordIndex<'d> {
        &self.records
    }

    /// Builds a fresh decode context borrowing this container's schema,
    /// pools, string pool and instance table. Cheap (every field is a
    /// reference or `Copy`); callers ask for one whenever they need to
    /// resolve a property.
    #[must_use]
    pub fn context(&self) -> DecodeContext<'_, 'd> {
        DecodeContext { schema: &self.schema, pools: &self.pools, text: self.text, instances: &self.instances }
    }

    pub fn record_instance(&self, record: &Record<'d>) -> Result<Instance<'_, 'd>> {
        record.instance(self.context())
    }

    /// Serializes a record's properties as a `serde_json::Value`, following
    /// the producer's own `dump_record_json` policy: scalars become JSON
    /// primitives, string/locale refs and enum choices become their
    /// resolved text, GUIDs become their canonical formatted string,
    /// `Reference`s that name a known record are substituted with that
    /// record's own `{name: properties}` object, pointers and nested
    /// instances become `{name: properties}` objects, and arrays become
    /// JSON arrays. Recursion is capped at [`MAX_DUMP_DEPTH`] so a cyclic
    /// pointer chain cannot recurse forever.
    pub fn dump_record_json(&self, record: &Record<'d>) -> Result<serde_json::Value> {
        let instance = self.record_instance(record)?;
        self.dump_instance_json(instance, 0)
    }

    /// Dumps every record to JSON, in record-table order. A record whose
    /// decode fails does not stop the iteration: its error is wrapped with
    /// the record's display name and the byte offset of its instance (§7:
    /// "the record-index loader propagates errors with the offending
    /// record's name and offset appended"), and the next record is yielded
    /// regardless. Aborting on the first error, if a caller wants that, is
    /// as simple as stopping at the first `Err` the iterator yields.
    pub fn iter_record_dumps(&self) -> impl Iterator<Item = (&Record<'d>, Result<serde_json::Value>)> + '_ {
        self.records.iter().map(move |record| {
            let result = self.dump_record_json(record).map_err(|err| {
                let offset = self
                    .record_instance(record)
                    .map(|instance| instance.byte_offset(self.original))
                    .unwrap_or(0);
                err.in_record(record.display_name(), offset)
            });
            (record, result)
        })
    }

    fn dump_instance_json(&self, instance: Instance<'_, 'd>, depth: usize) -> Result<serde_json::Value> {
        if depth >= MAX_DUMP_DEPTH {
            return Err(Error::schema("exceeded maximum instance nesting depth while dumping to JSON"));
        }
        let mut map = serde_json::Map::new();
        for (name, value) in instance.properties()? {
            map.insert(name.to_string(), self.dump_value_json(value, depth)?);
        }
        Ok(serde_json::Value::Object(map))
    }

    fn dump_value_json(&self, value: Value<'_, 'd>, depth: usize) -> Result<serde_json::Value> {
        Ok(match value {
            Value::Bool(v) => serde_json::Value::Bool(v),
            Value::Int8(v) => serde_json::Value::from(v),
            Value::Int16(v) => serde_json::Value::from(v),
            Value::Int32(v) => serde_json::Value::from(v),
            Value::Int64(v) => serde_json::Value::from(v),
            Value::UInt8(v) => serde_json::Value::from(v),
            Value::UInt16(v) => serde_json::Value::from(v),
            Value::UInt32(v) => serde_json::Value::from(v),
            Value::UInt64(v) => serde_json::Value::from(v),
            Value::Float(v) => serde_json::Value::from(v),
            Value::Double(v) => serde_json::Value::from(v),
            Value::Guid(v) => serde_json::Value::String(v.to_string()),
            Value::String(v) | Value::Locale(v) => serde_json::Value::String(v.to_string()),
            Value::EnumChoice { name, .. } => serde_json::Value::String(name.to_string()),
            Value::Reference(reference) => match reference {
                None => serde_json::Value::Null,
                Some(r) => match self.records.by_guid(r.guid) {
                    Some(record) => self.dump_record_json(record)?,
                    None => serde_json::Value::String(r.guid.to_string()),
                },
            },
            Value::Pointer(handle) => match handle {
                None => serde_json::Value::Null,
                Some(handle) => {
                    let target = instance_for_handle(self, handle)?;
                    self.dump_instance_json(target, depth + 1)?
                }
            },
            Value::Instance(nested) => self.dump_instance_json(nested, depth + 1)?,
            Value::Array(values) => serde_json::Value::Array(
                values
                    .into_iter()
                    .map(|v| self.dump_value_json(v, depth + 1))
                    .collect::<Result<Vec<_>>>()?,
            ),
        })
    }
}

fn instance_for_handle<'s, 'd>(dcb: &'s DataCore<'d>, handle: Handle) -> Result<Instance<'s, 'd>> {
    let bytes = dcb.instances.get(handle.structure_index, handle.instance_index)?;
    Ok(Instance::new(dcb.context(), handle.structure_index, bytes))
}

fn read_vec<T>(cursor: &mut binrw::io::Cursor<&[u8]>, count: u32) -> Result<Vec<T>>
where
    T: for<'r> BinRead<Args<'r> = ()>,
{
    let mut items = Vec::with_capacity(count as usize);
    for _ in 0..count {
        items.push(T::read(cursor)?);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_minimal_container_and_dumps_its_only_record() {
        let mut bytes = Vec::new();
        // Header: one structure {name: "Widget", props: [value: Int32]}, one record.
        bytes.extend_from_slice(&0u32.to_le_bytes()); // unknown0
        bytes.extend_from_slice(&6u32.to_le_bytes()); // version
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes()); // structure_definition_count
        bytes.extend_from_slice(&1u32.to_le_bytes()); // property_definition_count
        bytes.extend_from_slice(&0u32.to_le_bytes()); // enum_definition_count
        bytes.extend_from_slice(&1u32.to_le_bytes()); // data_mapping_definition_count
        bytes.extend_from_slice(&1u32.to_le_bytes()); // record_definition_count
        // pool counts: none needed, the one property is a scalar decoded
        // straight out of the instance bytes rather than a pool.
        for _ in 0..PoolType::COUNT {
            bytes.extend_from_slice(&0u32.to_le_bytes());
        }
        bytes.extend_from_slice(&0u32.to_le_bytes()); // enum_option_name_count
        bytes.extend_from_slice(&7u32.to_le_bytes()); // text_length: "Widget\0"
        bytes.extend_from_slice(&0u32.to_le_bytes()); // unknown_trailing

        // structure definition
        bytes.extend_from_slice(&0u32.to_le_bytes()); // name_offset
        bytes.extend_from_slice(&schema::NO_PARENT.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // property_count
        bytes.extend_from_slice(&0u16.to_le_bytes()); // first_property_index
        bytes.extend_from_slice(&0u32.to_le_bytes()); // node_type

        // property definition: value: Int32
        bytes.extend_from_slice(&0u32.to_le_bytes()); // name_offset (reuses "Widget" for simplicity)
        bytes.extend_from_slice(&0u16.to_le_bytes()); // structure_index
        bytes.extend_from_slice(&0x0004u16.to_le_bytes()); // data_type: Int32
        bytes.extend_from_slice(&0u16.to_le_bytes()); // conversion_type: Attribute
        bytes.extend_from_slice(&0u16.to_le_bytes()); // padding

        // data mapping: 1 instance of structure 0
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());

        // record
        bytes.extend_from_slice(&0u32.to_le_bytes()); // name_offset
        bytes.extend_from_slice(&0u32.to_le_bytes()); // filename_offset
        bytes.extend_from_slice(&0u32.to_le_bytes()); // structure_index
        bytes.extend_from_slice(&[7u8; 16]); // id
        bytes.extend_from_slice(&0u16.to_le_bytes()); // instance_index
        bytes.extend_from_slice(&0u16.to_le_bytes()); // other_index

        // text pool
        bytes.extend_from_slice(b"Widget\0");

        // instance bytes
        bytes.extend_from_slice(&42i32.to_le_bytes());

        let view = ByteView::new(&bytes);
        let dcb = DataCore::load(view).unwrap();
        assert_eq!(dcb.records().len(), 1);
        let record = dcb.records().iter().next().unwrap();
        let json = dcb.dump_record_json(record).unwrap();
        assert_eq!(json["value"], 42);
    }
}
