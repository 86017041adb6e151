use binrw::BinRead;

use crate::error::{Error, Result};
use crate::pool::PoolType;

pub const NO_PARENT: u32 = 0xFFFF_FFFF;

/// Every value a property slot's data type can name: the eighteen pool
/// kinds, plus `Class` for an embedded (non-pooled) structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Pool(PoolType),
    Class,
}

impl DataType {
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        if code == 0x0010 {
            Some(DataType::Class)
        } else {
            PoolType::from_code(code).map(DataType::Pool)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionType {
    Attribute,
    ComplexArray,
    SimpleArray,
    ClassArray,
}

impl ConversionType {
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(ConversionType::Attribute),
            1 => Some(ConversionType::ComplexArray),
            2 => Some(ConversionType::SimpleArray),
            3 => Some(ConversionType::ClassArray),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_array(self) -> bool {
        !matches!(self, ConversionType::Attribute)
    }
}

#[derive(Debug, Clone, BinRead)]
#[br(little)]
pub struct RawStructureDefinition {
    pub name_offset: u32,
    pub parent_index: u32,
    pub property_count: u16,
    pub first_property_index: u16,
    pub node_type: u32,
}

#[derive(Debug, Clone, BinRead)]
#[br(little)]
pub struct RawPropertyDefinition {
    pub name_offset: u32,
    pub structure_index: u16,
    pub data_type: u16,
    pub conversion_type: u16,
    pub padding: u16,
}

#[derive(Debug, Clone, BinRead)]
#[br(little)]
pub struct RawEnumDefinition {
    pub name_offset: u32,
    pub value_count: u16,
    pub first_value_index: u16,
}

#[derive(Debug, Clone, BinRead)]
#[br(little)]
pub struct RawDataMappingDefinition {
    pub structure_count: u16,
    pub structure_index: u16,
}

/// A structure's own property slice plus its resolved full property list
/// (parent's full list followed by its own), and the fixed byte size an
/// instance of this structure occupies.
#[derive(Debug, Clone)]
pub struct StructureDefinition {
    pub name_offset: u32,
    pub parent_index: Option<u32>,
    pub node_type: u32,
    pub own_properties: Vec<u32>,
    pub properties: Vec<u32>,
    pub calculated_size: usize,
}

#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    pub name_offset: u32,
    pub structure_index: u16,
    pub data_type: DataType,
    pub conversion_type: ConversionType,
}

#[derive(Debug, Clone)]
pub struct EnumDefinition {
    pub name_offset: u32,
    pub first_value_index: u16,
    pub value_count: u16,
}

impl EnumDefinition {
    #[must_use]
    pub fn contains(&self, value_index: u16) -> bool {
        value_index >= self.first_value_index
            && value_index < self.first_value_index + self.value_count
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DataMapping {
    pub structure_count: u16,
    pub structure_index: u16,
}

/// The fully resolved schema: every structure's inherited property list and
/// computed instance size, ready for the instance decoder to index into
/// without re-walking the inheritance chain on every access.
pub struct Schema {
    pub structures: Vec<StructureDefinition>,
    pub properties: Vec<PropertyDefinition>,
    pub enums: Vec<EnumDefinition>,
    pub data_mappings: Vec<DataMapping>,
}

impl Schema {
    pub fn build(
        raw_structures: Vec<RawStructureDefinition>,
        raw_properties: Vec<RawPropertyDefinition>,
        raw_enums: Vec<RawEnumDefinition>,
        raw_data_mappings: Vec<RawDataMappingDefinition>,
    ) -> Result<Self> {
        let properties = raw_properties
            .iter()
            .map(|p| {
                let data_type = DataType::from_code(p.data_type)
                    .ok_or_else(|| Error::schema(format!("unknown data type code {:#06x}", p.data_type)))?;
                let conversion_type = ConversionType::from_code(p.conversion_type).ok_or_else(|| {
                    Error::schema(format!("unknown conversion type code {}", p.conversion_type))
                })?;
                Ok(PropertyDefinition {
                    name_offset: p.name_offset,
                    structure_index: p.structure_index,
                    data_type,
                    conversion_type,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let enums = raw_enums
            .iter()
            .map(|e| EnumDefinition {
                name_offset: e.name_offset,
                first_value_index: e.first_value_index,
                value_count: e.value_count,
            })
            .collect();

        let data_mappings = raw_data_mappings
            .iter()
            .map(|m| DataMapping {
                structure_count: m.structure_count,
                structure_index: m.structure_index,
            })
            .collect();

        let mut structures = Vec::with_capacity(raw_structures.len());
        for raw in &raw_structures {
            let own_properties = (u32::from(raw.first_property_index)
                ..u32::from(raw.first_property_index) + u32::from(raw.property_count))
                .collect::<Vec<_>>();
            structures.push(StructureDefinition {
                name_offset: raw.name_offset,
                parent_index: (raw.parent_index != NO_PARENT).then_some(raw.parent_index),
                node_type: raw.node_type,
                own_properties,
                properties: Vec::new(),
                calculated_size: 0,
            });
        }

        let mut schema = Self {
            structures,
            properties,
            enums,
            data_mappings,
        };

        for index in 0..schema.structures.len() {
            schema.resolve_properties(index as u32)?;
        }
        for index in 0..schema.structures.len() {
            let size = schema.compute_size(index as u32)?;
            schema.structures[index as usize].calculated_size = size;
        }

        Ok(schema)
    }

    fn resolve_properties(&mut self, index: u32) -> Result<()> {
        if !self.structures[index as usize].properties.is_empty() {
            return Ok(());
        }

        let mut chain = vec![index];
        let mut cur = self.structures[index as usize].parent_index;
        while let Some(parent) = cur {
            if chain.len() > self.structures.len() {
                return Err(Error::SchemaCycle(index));
            }
            chain.push(parent);
            cur = self.structures[parent as usize].parent_index;
        }

        let mut properties = Vec::new();
        for &idx in chain.iter().rev() {
            properties.extend_from_slice(&self.structures[idx as usize].own_properties);
        }
        self.structures[index as usize].properties = properties;
        Ok(())
    }

    fn compute_size(&self, index: u32) -> Result<usize> {
        let structure = &self.structures[index as usize];
        let mut size = 0usize;
        for &prop_index in &structure.properties {
            let prop = self
                .properties
                .get(prop_index as usize)
                .ok_or_else(|| Error::schema(format!("property index {prop_index} out of range")))?;
            size += self.slot_size(prop)?;
        }
        Ok(size)
    }

    fn slot_size(&self, prop: &PropertyDefinition) -> Result<usize> {
        if prop.conversion_type.is_array() {
            return Ok(8);
        }
        match prop.data_type {
            DataType::Class => {
                let target = u32::from(prop.structure_index);
                if self.structures.get(target as usize).is_none() {
                    return Err(Error::schema(format!("structure index {target} out of range")));
                }
                self.compute_size(target)?
            }
            DataType::Pool(PoolType::StrongPointer) | DataType::Pool(PoolType::WeakPointer) => Ok(8),
            DataType::Pool(pool) => Ok(pool.element_size()),
        }
    }

    #[must_use]
    pub fn structure(&self, index: u32) -> Option<&StructureDefinition> {
        self.structures.get(index as usize)
    }

    #[must_use]
    pub fn calculated_data_size(&self, index: u32) -> usize {
        self.structures
            .get(index as usize)
            .map_or(0, |s| s.calculated_size)
    }
}
