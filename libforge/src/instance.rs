//! Structure-instance decoding: walking a record's packed bytes
//! property-by-property and resolving each into a tagged [`Value`].
//!
//! Nothing here is decoded eagerly. A [`crate::DataCore`] only slices out
//! the byte range for each instance at load; turning those bytes into
//! [`Value`]s happens on demand, every time a caller asks for a property or
//! dumps a record.
//!
//! Two lifetimes thread through every type here: `'s` is how long the
//! schema/pool/instance-table borrow lasts (tied to whoever calls
//! [`crate::DataCore::context`]), and `'d` is the lifetime of the
//! underlying mapped bytes themselves (every decoded string, GUID byte
//! array, and instance slice is a direct borrow of the original map, not of
//! `'s`). Splitting them lets [`DecodeContext`] be built fresh from a
//! `&self` call without tying decoded values to that short-lived borrow.

use libcommon::{strings::string_at, ByteView};

use crate::error::{Error, Result};
use crate::guid::Guid;
use crate::pool::{PoolType, PoolValue, ValuePools};
use crate::schema::{DataType, PropertyDefinition, Schema, StructureDefinition, NO_PARENT};

/// Which of the three pointer-producing property shapes a [`Handle`] came
/// from. Resolution is identical for all three; this is kept only so a
/// caller (or the JSON dumper) can tell a strong reference from a weak one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Strong,
    Weak,
    Class,
}

/// A lightweight `(structure_index, instance_index)` pair into the shared
/// instance table. Per §9's "no owning sub-objects" note, this is never
/// resolved until a caller asks for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle {
    pub kind: PointerKind,
    pub structure_index: u32,
    pub instance_index: u32,
}

/// A `Reference` property's raw payload: the GUID of the record it names,
/// plus the instance index the producer recorded alongside it (not used for
/// resolution — records are looked up by GUID, see
/// [`crate::record::RecordIndex`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceValue {
    pub instance_index: u32,
    pub guid: Guid,
}

/// Every shape a decoded property value can take. Callers dispatch on the
/// variant rather than on a virtual method, per §9.
#[derive(Debug, Clone)]
pub enum Value<'s, 'd> {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Guid(Guid),
    String(&'d str),
    Locale(&'d str),
    /// `name` is the resolved symbolic value; `raw_index` is the raw
    /// string-pool offset the file stores inline (the original keeps this
    /// alongside the resolved name, e.g. for ordinal-based filtering).
    EnumChoice { name: &'d str, raw_index: u32 },
    Reference(Option<ReferenceValue>),
    Pointer(Option<Handle>),
    Instance(Instance<'s, 'd>),
    Array(Vec<Value<'s, 'd>>),
}

/// Everything a property read needs to resolve references: the schema, the
/// value pools, the string pool, and the instance table. Built fresh by
/// [`crate::DataCore::context`] rather than stored on each instance, per
/// §9's "no module-level mutable state" note.
#[derive(Clone, Copy)]
pub struct DecodeContext<'s, 'd> {
    pub schema: &'s Schema,
    pub pools: &'s ValuePools,
    pub text: ByteView<'d>,
    pub instances: &'s Instances<'d>,
}

/// The structure-instance blobs, grouped by structure index in the order
/// their data mappings listed them. A structure index may receive instances
/// from more than one data mapping (the producer appends), so each
/// structure's instances are stored as a flat, concatenated byte view
/// sliced on demand by `calculated_data_size`.
pub struct Instances<'d> {
    by_structure: Vec<Vec<ByteView<'d>>>,
}

impl<'d> Instances<'d> {
    pub(crate) fn read(schema: &Schema, tail: ByteView<'d>) -> Result<Self> {
        let mut by_structure: Vec<Vec<ByteView<'d>>> = (0..schema.structures.len())
            .map(|_| Vec::new())
            .collect();
        let mut offset = 0usize;
        for mapping in &schema.data_mappings {
            let structure_index = u32::from(mapping.structure_index);
            let size = schema.calculated_data_size(structure_index);
            for _ in 0..mapping.structure_count {
                let instance = tail.subslice(offset, size)?;
                by_structure
                    .get_mut(structure_index as usize)
                    .ok_or_else(|| {
                        Error::schema(format!("data mapping references unknown structure {structure_index}"))
                    })?
                    .push(instance);
                offset += size;
            }
        }
        if offset != tail.len() {
            return Err(Error::schema(format!(
                "mapped instance bytes ({offset}) do not cover the full mapped region ({})",
                tail.len()
            )));
        }
        Ok(Self { by_structure })
    }

    #[must_use]
    pub fn count(&self, structure_index: u32) -> usize {
        self.by_structure
            .get(structure_index as usize)
            .map_or(0, Vec::len)
    }

    pub fn get(&self, structure_index: u32, instance_index: u32) -> Result<ByteView<'d>> {
        self.by_structure
            .get(structure_index as usize)
            .and_then(|instances| instances.get(instance_index as usize))
            .copied()
            .ok_or_else(|| {
                Error::schema(format!(
                    "instance ({structure_index}, {instance_index}) out of range"
                ))
            })
    }
}

/// A single structure instance: its definition plus the exact byte range
/// holding it. Cheap to copy; resolving a property reads straight out of
/// `bytes` (or, for arrays, out of the shared value pools).
#[derive(Clone, Copy)]
pub struct Instance<'s, 'd> {
    ctx: DecodeContext<'s, 'd>,
    structure_index: u32,
    bytes: ByteView<'d>,
}

impl<'s, 'd> std::fmt::Debug for Instance<'s, 'd> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("structure_index", &self.structure_index)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl<'s, 'd> Instance<'s, 'd> {
    #[must_use]
    pub fn new(ctx: DecodeContext<'s, 'd>, structure_index: u32, bytes: ByteView<'d>) -> Self {
        Self { ctx, structure_index, bytes }
    }

    #[must_use]
    pub fn structure_index(&self) -> u32 {
        self.structure_index
    }

    /// This instance's byte offset relative to `base`, which must be a
    /// view over the same underlying buffer this instance's bytes were
    /// sliced from (in practice, the full mapped DCB file). Used only to
    /// annotate errors with the offending record's position (§7); never
    /// used for decoding itself.
    #[must_use]
    pub fn byte_offset(&self, base: ByteView<'d>) -> usize {
        (self.bytes.as_slice().as_ptr() as usize).saturating_sub(base.as_slice().as_ptr() as usize)
    }

    fn structure(&self) -> Result<&'s StructureDefinition> {
        self.ctx
            .schema
            .structure(self.structure_index)
            .ok_or_else(|| Error::schema(format!("unknown structure index {}", self.structure_index)))
    }

    /// Name of this instance's structure definition, resolved against the
    /// string pool.
    pub fn structure_name(&self) -> Result<&'d str> {
        let structure = self.structure()?;
        Ok(string_at(self.ctx.text, structure.name_offset as usize)?)
    }

    pub fn resolve(&self, handle: Handle) -> Result<Instance<'s, 'd>> {
        let bytes = self.ctx.instances.get(handle.structure_index, handle.instance_index)?;
        Ok(Instance::new(self.ctx, handle.structure_index, bytes))
    }

    /// Decodes this instance's full property list, left to right, and
    /// checks the final offset lands exactly on the instance's declared
    /// size (§4.6, final paragraph).
    pub fn properties(&self) -> Result<Vec<(&'d str, Value<'s, 'd>)>> {
        let structure = self.structure()?;
        let mut offset = 0usize;
        let mut out = Vec::with_capacity(structure.properties.len());
        for &prop_index in &structure.properties {
            let prop = self
                .ctx
                .schema
                .properties
                .get(prop_index as usize)
                .ok_or_else(|| Error::schema(format!("property index {prop_index} out of range")))?;
            let name = string_at(self.ctx.text, prop.name_offset as usize)?;
            let (value, next_offset) = self.read_property(offset, prop)?;
            out.push((name, value));
            offset = next_offset;
        }
        if offset != self.bytes.len() {
            return Err(Error::schema(format!(
                "instance of structure {} consumed {offset} bytes, expected {}",
                self.structure_index,
                self.bytes.len()
            )));
        }
        Ok(out)
    }

    fn read_property(&self, offset: usize, prop: &PropertyDefinition) -> Result<(Value<'s, 'd>, usize)> {
        if prop.conversion_type.is_array() {
            self.read_array(offset, prop)
        } else {
            self.read_attribute(offset, prop)
        }
    }

    fn read_attribute(&self, offset: usize, prop: &PropertyDefinition) -> Result<(Value<'s, 'd>, usize)> {
        match prop.data_type {
            DataType::Pool(PoolType::StrongPointer) => self.read_pointer(offset, PointerKind::Strong),
            DataType::Pool(PoolType::WeakPointer) => self.read_pointer(offset, PointerKind::Weak),
            DataType::Class => {
                let target = u32::from(prop.structure_index);
                let size = self.ctx.schema.calculated_data_size(target);
                let end = offset + size;
                let sub = self.bytes.subslice(offset, size)?;
                Ok((Value::Instance(Instance::new(self.ctx, target, sub)), end))
            }
            DataType::Pool(pool) => {
                let end = offset + pool.element_size();
                let mut cursor = self.bytes.cursor_at(offset);
                let value = self.read_scalar(pool, prop, &mut cursor)?;
                Ok((value, end))
            }
        }
    }

    fn read_pointer(&self, offset: usize, kind: PointerKind) -> Result<(Value<'s, 'd>, usize)> {
        let end = offset + 8;
        let mut cursor = self.bytes.cursor_at(offset);
        let structure_index = cursor.read_u32()?;
        let instance_index = cursor.read_u32()?;
        let handle = make_handle(kind, structure_index, instance_index)?;
        Ok((Value::Pointer(handle), end))
    }

    fn read_array(&self, offset: usize, prop: &PropertyDefinition) -> Result<(Value<'s, 'd>, usize)> {
        let end = offset + 8;
        let mut cursor = self.bytes.cursor_at(offset);
        let count = cursor.read_u32()?;
        let first_index = cursor.read_u32()?;

        let values = match prop.data_type {
            DataType::Class => {
                let target = u32::from(prop.structure_index);
                (0..count)
                    .map(|i| {
                        let handle = make_handle(PointerKind::Class, target, first_index + i)?;
                        Ok(Value::Pointer(handle))
                    })
                    .collect::<Result<Vec<_>>>()?
            }
            DataType::Pool(pool) => (0..count)
                .map(|i| self.resolve_pool_element(pool, first_index + i, prop))
                .collect::<Result<Vec<_>>>()?,
        };
        Ok((Value::Array(values), end))
    }

    fn read_scalar(
        &self,
        pool: PoolType,
        prop: &PropertyDefinition,
        cursor: &mut libcommon::Cursor<'d>,
    ) -> Result<Value<'s, 'd>> {
        Ok(match pool {
            PoolType::Boolean => Value::Bool(cursor.read_bool()?),
            PoolType::Int8 => Value::Int8(cursor.read_i8()?),
            PoolType::Int16 => Value::Int16(cursor.read_i16()?),
            PoolType::Int32 => Value::Int32(cursor.read_i32()?),
            PoolType::Int64 => Value::Int64(cursor.read_i64()?),
            PoolType::UInt8 => Value::UInt8(cursor.read_u8()?),
            PoolType::UInt16 => Value::UInt16(cursor.read_u16()?),
            PoolType::UInt32 => Value::UInt32(cursor.read_u32()?),
            PoolType::UInt64 => Value::UInt64(cursor.read_u64()?),
            PoolType::Float => Value::Float(cursor.read_f32()?),
            PoolType::Double => Value::Double(cursor.read_f64()?),
            PoolType::Guid => Value::Guid(Guid::from_bytes(cursor.read_guid_bytes()?)),
            PoolType::StringRef => {
                let offset = cursor.read_u32()?;
                Value::String(string_at(self.ctx.text, offset as usize)?)
            }
            PoolType::Locale => {
                let offset = cursor.read_u32()?;
                Value::Locale(string_at(self.ctx.text, offset as usize)?)
            }
            PoolType::EnumChoice => {
                let raw_offset = cursor.read_u32()?;
                self.resolve_enum_choice(raw_offset, prop)?
            }
            PoolType::Reference => {
                let instance_index = cursor.read_u32()?;
                let guid = Guid::from_bytes(cursor.read_guid_bytes()?);
                Value::Reference(reference_value(instance_index, guid))
            }
            PoolType::StrongPointer | PoolType::WeakPointer => {
                unreachable!("pointers are handled by read_pointer")
            }
        })
    }

    fn resolve_pool_element(&self, pool: PoolType, index: u32, prop: &PropertyDefinition) -> Result<Value<'s, 'd>> {
        Ok(match self.ctx.pools.get(pool, index)? {
            PoolValue::Boolean(v) => Value::Bool(v),
            PoolValue::Int8(v) => Value::Int8(v),
            PoolValue::Int16(v) => Value::Int16(v),
            PoolValue::Int32(v) => Value::Int32(v),
            PoolValue::Int64(v) => Value::Int64(v),
            PoolValue::UInt8(v) => Value::UInt8(v),
            PoolValue::UInt16(v) => Value::UInt16(v),
            PoolValue::UInt32(v) => Value::UInt32(v),
            PoolValue::UInt64(v) => Value::UInt64(v),
            PoolValue::Float(v) => Value::Float(v),
            PoolValue::Double(v) => Value::Double(v),
            PoolValue::Guid(v) => Value::Guid(v),
            PoolValue::StringRef(offset) => Value::String(string_at(self.ctx.text, offset as usize)?),
            PoolValue::Locale(offset) => Value::Locale(string_at(self.ctx.text, offset as usize)?),
            PoolValue::EnumChoice(raw_offset) => self.resolve_enum_choice(raw_offset, prop)?,
            PoolValue::StrongPointer { structure_index, instance_index } => {
                Value::Pointer(make_handle(PointerKind::Strong, structure_index, instance_index)?)
            }
            PoolValue::WeakPointer { structure_index, instance_index } => {
                Value::Pointer(make_handle(PointerKind::Weak, structure_index, instance_index)?)
            }
            PoolValue::Reference { instance_index, value } => {
                Value::Reference(reference_value(instance_index, value))
            }
        })
    }

    /// Resolves an enum-choice's raw string-pool offset to its symbolic
    /// name, and checks it is a legal value for the enum definition named
    /// by `prop.structure_index` (which, for `EnumChoice` properties, is
    /// reused by the producer as an index into the enum-definition table
    /// rather than the structure table — see
    /// `examples/original_source/scdatatools/forge/dftypes/__init__.py`).
    fn resolve_enum_choice(&self, raw_offset: u32, prop: &PropertyDefinition) -> Result<Value<'s, 'd>> {
        let name = string_at(self.ctx.text, raw_offset as usize)?;
        let enum_index = u32::from(prop.structure_index);
        let enum_def = self
            .ctx
            .schema
            .enums
            .get(enum_index as usize)
            .ok_or_else(|| Error::schema(format!("enum-choice property names unknown enum {enum_index}")))?;

        let mut is_legal = false;
        for value_index in enum_def.first_value_index..enum_def.first_value_index + enum_def.value_count {
            let option_offset = self.ctx.pools.enum_option_name(value_index)?;
            if string_at(self.ctx.text, option_offset as usize)? == name {
                is_legal = true;
                break;
            }
        }
        if !is_legal {
            return Err(Error::schema(format!(
                "enum choice {name:?} is not a legal value for enum {enum_index}"
            )));
        }
        Ok(Value::EnumChoice { name, raw_index: raw_offset })
    }
}

fn make_handle(kind: PointerKind, structure_index: u32, instance_index: u32) -> Result<Option<Handle>> {
    if structure_index == NO_PARENT || instance_index == NO_PARENT {
        return Ok(None);
    }
    Ok(Some(Handle { kind, structure_index, instance_index }))
}

fn reference_value(instance_index: u32, guid: Guid) -> Option<ReferenceValue> {
    if instance_index == NO_PARENT && guid.is_nil() {
        None
    } else {
        Some(ReferenceValue { instance_index, guid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawDataMappingDefinition, RawPropertyDefinition, RawStructureDefinition};

    fn build_schema(
        structures: Vec<RawStructureDefinition>,
        properties: Vec<RawPropertyDefinition>,
        mappings: Vec<RawDataMappingDefinition>,
    ) -> Schema {
        Schema::build(structures, properties, vec![], mappings).unwrap()
    }

    fn prop(structure_index: u16, data_type: u16, conversion_type: u16, name_offset: u32) -> RawPropertyDefinition {
        RawPropertyDefinition {
            name_offset,
            structure_index,
            data_type,
            conversion_type,
            padding: 0,
        }
    }

    fn empty_pools() -> ValuePools {
        let empty = ByteView::new(&[]);
        let mut cursor = empty.cursor();
        ValuePools::read(&mut cursor, &[0; 18], 0).unwrap()
    }

    #[test]
    fn decodes_int32_and_string_ref_scalar_properties() {
        // Scenario 1 from spec §8: S{a:Int32, b:StringRef}.
        let structures = vec![RawStructureDefinition {
            name_offset: 0,
            parent_index: NO_PARENT,
            property_count: 2,
            first_property_index: 0,
            node_type: 0,
        }];
        let properties = vec![
            prop(0, 0x0004, 0, 10), // a: Int32
            prop(0, 0x000A, 0, 12), // b: StringRef
        ];
        let mappings = vec![RawDataMappingDefinition { structure_count: 1, structure_index: 0 }];
        let schema = build_schema(structures, properties, mappings);

        let mut instance_bytes = Vec::new();
        instance_bytes.extend_from_slice(&7i32.to_le_bytes());
        instance_bytes.extend_from_slice(&5u32.to_le_bytes());
        let instances = Instances::read(&schema, ByteView::new(&instance_bytes)).unwrap();
        let pools = empty_pools();
        let text = b"aaaaahello\0";
        let ctx = DecodeContext { schema: &schema, pools: &pools, text: ByteView::new(text), instances: &instances };

        let instance = Instance::new(ctx, 0, instances.get(0, 0).unwrap());
        let props = instance.properties().unwrap();
        assert!(matches!(props[0].1, Value::Int32(7)));
        assert!(matches!(props[1].1, Value::String("hello")));
    }

    #[test]
    fn inherited_properties_decode_in_parent_then_child_order() {
        // Scenario 2 from spec §8: Parent{x:Int8}, Child extends Parent{y:Int8}.
        let structures = vec![
            RawStructureDefinition {
                name_offset: 0,
                parent_index: NO_PARENT,
                property_count: 1,
                first_property_index: 0,
                node_type: 0,
            },
            RawStructureDefinition {
                name_offset: 0,
                parent_index: 0,
                property_count: 1,
                first_property_index: 1,
                node_type: 0,
            },
        ];
        let properties = vec![
            prop(0, 0x0002, 0, 0), // x: Int8
            prop(1, 0x0002, 0, 1), // y: Int8
        ];
        let mappings = vec![RawDataMappingDefinition { structure_count: 1, structure_index: 1 }];
        let schema = build_schema(structures, properties, mappings);

        let instance_bytes = [0x2Au8, 0x2B];
        let instances = Instances::read(&schema, ByteView::new(&instance_bytes)).unwrap();
        let pools = empty_pools();
        let text = b"\0";
        let ctx = DecodeContext { schema: &schema, pools: &pools, text: ByteView::new(text), instances: &instances };

        let instance = Instance::new(ctx, 1, instances.get(1, 0).unwrap());
        let props = instance.properties().unwrap();
        assert!(matches!(props[0].1, Value::Int8(42)));
        assert!(matches!(props[1].1, Value::Int8(43)));
    }

    #[test]
    fn null_pointer_round_trips_as_none() {
        let structures = vec![RawStructureDefinition {
            name_offset: 0,
            parent_index: NO_PARENT,
            property_count: 1,
            first_property_index: 0,
            node_type: 0,
        }];
        let properties = vec![prop(0, 0x0110, 0, 0)]; // StrongPointer
        let mappings = vec![RawDataMappingDefinition { structure_count: 1, structure_index: 0 }];
        let schema = build_schema(structures, properties, mappings);

        let mut instance_bytes = Vec::new();
        instance_bytes.extend_from_slice(&NO_PARENT.to_le_bytes());
        instance_bytes.extend_from_slice(&NO_PARENT.to_le_bytes());
        let instances = Instances::read(&schema, ByteView::new(&instance_bytes)).unwrap();
        let pools = empty_pools();
        let ctx = DecodeContext { schema: &schema, pools: &pools, text: ByteView::new(b""), instances: &instances };

        let instance = Instance::new(ctx, 0, instances.get(0, 0).unwrap());
        let props = instance.properties().unwrap();
        assert!(matches!(props[0].1, Value::Pointer(None)));
    }
}
