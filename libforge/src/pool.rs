use crate::error::{Error, Result};
use crate::guid::Guid;

/// One of the eighteen scalar/reference kinds a property slot can hold.
///
/// Numeric values match the wire data-type codes exactly so a code read out
/// of a `PropertyDefinition` can be matched straight onto a variant.
/// `Class` is deliberately absent: an embedded structure is not stored in a
/// value pool, it is read inline as `calculated_data_size(target)` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PoolType {
    Boolean = 0x0001,
    Int8 = 0x0002,
    Int16 = 0x0003,
    Int32 = 0x0004,
    Int64 = 0x0005,
    UInt8 = 0x0006,
    UInt16 = 0x0007,
    UInt32 = 0x0008,
    UInt64 = 0x0009,
    StringRef = 0x000A,
    Float = 0x000B,
    Double = 0x000C,
    Locale = 0x000D,
    Guid = 0x000E,
    EnumChoice = 0x000F,
    StrongPointer = 0x0110,
    WeakPointer = 0x0210,
    Reference = 0x0310,
}

impl PoolType {
    pub const COUNT: usize = 18;

    /// Order the eighteen pool *counts* appear in the header, with `Boolean`
    /// leading. This is **not** the order the pool *bodies* themselves
    /// follow later in the file — that sequence is hardcoded directly in
    /// [`ValuePools::read`] (`Int8` first, `Boolean` ninth) because the
    /// producer apparently built the header and the value section from two
    /// different internal orderings. `slot()` only ever answers "where is
    /// this pool's count in the header", never "where is this pool's data
    /// in the file".
    pub const ORDER: [PoolType; Self::COUNT] = [
        PoolType::Boolean,
        PoolType::Int8,
        PoolType::Int16,
        PoolType::Int32,
        PoolType::Int64,
        PoolType::UInt8,
        PoolType::UInt16,
        PoolType::UInt32,
        PoolType::UInt64,
        PoolType::Float,
        PoolType::Double,
        PoolType::Guid,
        PoolType::StringRef,
        PoolType::Locale,
        PoolType::EnumChoice,
        PoolType::StrongPointer,
        PoolType::WeakPointer,
        PoolType::Reference,
    ];

    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ORDER.into_iter().find(|p| *p as u16 == code)
    }

    /// Fixed byte width of one element of this pool, as stored on disk.
    #[must_use]
    pub fn element_size(self) -> usize {
        match self {
            PoolType::Boolean | PoolType::Int8 | PoolType::UInt8 => 1,
            PoolType::Int16 | PoolType::UInt16 => 2,
            PoolType::Int32
            | PoolType::UInt32
            | PoolType::Float
            | PoolType::StringRef
            | PoolType::Locale
            | PoolType::EnumChoice => 4,
            PoolType::Int64 | PoolType::UInt64 | PoolType::Double => 8,
            PoolType::Guid => 16,
            PoolType::StrongPointer | PoolType::WeakPointer => 8,
            PoolType::Reference => 20,
        }
    }

    /// Index of this pool within [`PoolType::ORDER`], matching the order
    /// pool counts (and pool bodies) appear in the file.
    #[must_use]
    pub fn slot(self) -> usize {
        Self::ORDER.iter().position(|p| *p == self).unwrap()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoolValue {
    Boolean(bool),
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
    StringRef(u32),
    Locale(u32),
    EnumChoice(u32),
    StrongPointer { structure_index: u32, instance_index: u32 },
    WeakPointer { structure_index: u32, instance_index: u32 },
    Reference { instance_index: u32, value: Guid },
}

/// The eighteen flat, typed arrays that back every scalar and array
/// property in the file. Pools are read once at load and never mutated;
/// lookups borrow nothing (every element is `Copy`), so resolving a handle
/// is just indexing.
pub struct ValuePools {
    booleans: Vec<bool>,
    int8: Vec<i8>,
    int16: Vec<i16>,
    int32: Vec<i32>,
    int64: Vec<i64>,
    uint8: Vec<u8>,
    uint16: Vec<u16>,
    uint32: Vec<u32>,
    uint64: Vec<u64>,
    floats: Vec<f32>,
    doubles: Vec<f64>,
    guids: Vec<Guid>,
    string_refs: Vec<u32>,
    locale_refs: Vec<u32>,
    enum_choices: Vec<u32>,
    strong_pointers: Vec<(u32, u32)>,
    weak_pointers: Vec<(u32, u32)>,
    references: Vec<(u32, Guid)>,
    /// Raw string-pool offsets for every enum's possible choice values, in
    /// the order enum definitions index into. This is a nineteenth pool
    /// with no property-level data-type code of its own: an `EnumChoice`
    /// property stores its resolved string offset inline, but the enum's
    /// full set of legal values still has to live somewhere, and this is
    /// where the file puts it.
    enum_option_names: Vec<u32>,
}

impl ValuePools {
    pub(crate) fn read(
        cursor: &mut libcommon::Cursor<'_>,
        counts: &[u32],
        enum_option_name_count: u32,
    ) -> Result<Self> {
        let count_of = |ty: PoolType| counts[ty.slot()] as usize;

        let mut int8 = Vec::with_capacity(count_of(PoolType::Int8));
        for _ in 0..count_of(PoolType::Int8) {
            int8.push(cursor.read_i8()?);
        }
        let mut int16 = Vec::with_capacity(count_of(PoolType::Int16));
        for _ in 0..count_of(PoolType::Int16) {
            int16.push(cursor.read_i16()?);
        }
        let mut int32 = Vec::with_capacity(count_of(PoolType::Int32));
        for _ in 0..count_of(PoolType::Int32) {
            int32.push(cursor.read_i32()?);
        }
        let mut int64 = Vec::with_capacity(count_of(PoolType::Int64));
        for _ in 0..count_of(PoolType::Int64) {
            int64.push(cursor.read_i64()?);
        }
        let mut uint8 = Vec::with_capacity(count_of(PoolType::UInt8));
        for _ in 0..count_of(PoolType::UInt8) {
            uint8.push(cursor.read_u8()?);
        }
        let mut uint16 = Vec::with_capacity(count_of(PoolType::UInt16));
        for _ in 0..count_of(PoolType::UInt16) {
            uint16.push(cursor.read_u16()?);
        }
        let mut uint32 = Vec::with_capacity(count_of(PoolType::UInt32));
        for _ in 0..count_of(PoolType::UInt32) {
            uint32.push(cursor.read_u32()?);
        }
        let mut uint64 = Vec::with_capacity(count_of(PoolType::UInt64));
        for _ in 0..count_of(PoolType::UInt64) {
            uint64.push(cursor.read_u64()?);
        }
        let mut booleans = Vec::with_capacity(count_of(PoolType::Boolean));
        for _ in 0..count_of(PoolType::Boolean) {
            booleans.push(cursor.read_bool()?);
        }
        let mut floats = Vec::with_capacity(count_of(PoolType::Float));
        for _ in 0..count_of(PoolType::Float) {
            floats.push(cursor.read_f32()?);
        }
        let mut doubles = Vec::with_capacity(count_of(PoolType::Double));
        for _ in 0..count_of(PoolType::Double) {
            doubles.push(cursor.read_f64()?);
        }
        let mut guids = Vec::with_capacity(count_of(PoolType::Guid));
        for _ in 0..count_of(PoolType::Guid) {
            guids.push(Guid::from_bytes(cursor.read_guid_bytes()?));
        }
        let mut string_refs = Vec::with_capacity(count_of(PoolType::StringRef));
        for _ in 0..count_of(PoolType::StringRef) {
            string_refs.push(cursor.read_u32()?);
        }
        let mut locale_refs = Vec::with_capacity(count_of(PoolType::Locale));
        for _ in 0..count_of(PoolType::Locale) {
            locale_refs.push(cursor.read_u32()?);
        }
        let mut enum_choices = Vec::with_capacity(count_of(PoolType::EnumChoice));
        for _ in 0..count_of(PoolType::EnumChoice) {
            enum_choices.push(cursor.read_u32()?);
        }
        let mut strong_pointers = Vec::with_capacity(count_of(PoolType::StrongPointer));
        for _ in 0..count_of(PoolType::StrongPointer) {
            strong_pointers.push((cursor.read_u32()?, cursor.read_u32()?));
        }
        let mut weak_pointers = Vec::with_capacity(count_of(PoolType::WeakPointer));
        for _ in 0..count_of(PoolType::WeakPointer) {
            weak_pointers.push((cursor.read_u32()?, cursor.read_u32()?));
        }
        let mut references = Vec::with_capacity(count_of(PoolType::Reference));
        for _ in 0..count_of(PoolType::Reference) {
            let instance_index = cursor.read_u32()?;
            let value = Guid::from_bytes(cursor.read_guid_bytes()?);
            references.push((instance_index, value));
        }
        let mut enum_option_names = Vec::with_capacity(enum_option_name_count as usize);
        for _ in 0..enum_option_name_count {
            enum_option_names.push(cursor.read_u32()?);
        }

        Ok(Self {
            booleans,
            int8,
            int16,
            int32,
            int64,
            uint8,
            uint16,
            uint32,
            uint64,
            floats,
            doubles,
            guids,
            string_refs,
            locale_refs,
            enum_choices,
            strong_pointers,
            weak_pointers,
            references,
            enum_option_names,
        })
    }

    /// Raw string-pool offset of one enum choice's possible value, by its
    /// absolute index into the enum-option-name pool (see
    /// [`crate::schema::EnumDefinition`] for how a definition's
    /// `first_value_index`/`value_count` slice into this pool).
    pub fn enum_option_name(&self, index: u16) -> Result<u32> {
        self.enum_option_names
            .get(index as usize)
            .copied()
            .ok_or_else(|| Error::schema(format!("enum option name index {index} out of range")))
    }

    #[must_use]
    pub fn enum_option_name_count(&self) -> usize {
        self.enum_option_names.len()
    }

    pub fn get(&self, ty: PoolType, index: u32) -> Result<PoolValue> {
        let index = index as usize;
        macro_rules! at {
            ($slice:expr, $variant:ident) => {
                $slice
                    .get(index)
                    .copied()
                    .map(PoolValue::$variant)
                    .ok_or_else(|| Error::schema(format!("{ty:?} pool index {index} out of range")))
            };
        }
        match ty {
            PoolType::Boolean => at!(self.booleans, Boolean),
            PoolType::Int8 => at!(self.int8, Int8),
            PoolType::Int16 => at!(self.int16, Int16),
            PoolType::Int32 => at!(self.int32, Int32),
            PoolType::Int64 => at!(self.int64, Int64),
            PoolType::UInt8 => at!(self.uint8, UInt8),
            PoolType::UInt16 => at!(self.uint16, UInt16),
            PoolType::UInt32 => at!(self.uint32, UInt32),
            PoolType::UInt64 => at!(self.uint64, UInt64),
            PoolType::Float => at!(self.floats, Float),
            PoolType::Double => at!(self.doubles, Double),
            PoolType::Guid => at!(self.guids, Guid),
            PoolType::StringRef => at!(self.string_refs, StringRef),
            PoolType::Locale => at!(self.locale_refs, Locale),
            PoolType::EnumChoice => at!(self.enum_choices, EnumChoice),
            PoolType::StrongPointer => self
                .strong_pointers
                .get(index)
                .map(|&(structure_index, instance_index)| PoolValue::StrongPointer {
                    structure_index,
                    instance_index,
                })
                .ok_or_else(|| Error::schema(format!("StrongPointer pool index {index} out of range"))),
            PoolType::WeakPointer => self
                .weak_pointers
                .get(index)
                .map(|&(structure_index, instance_index)| PoolValue::WeakPointer {
                    structure_index,
                    instance_index,
                })
                .ok_or_else(|| Error::schema(format!("WeakPointer pool index {index} out of range"))),
            PoolType::Reference => self
                .references
                .get(index)
                .map(|&(instance_index, value)| PoolValue::Reference { instance_index, value })
                .ok_or_else(|| Error::schema(format!("Reference pool index {index} out of range"))),
        }
    }

    #[must_use]
    pub fn len(&self, ty: PoolType) -> usize {
        match ty {
            PoolType::Boolean => self.booleans.len(),
            PoolType::Int8 => self.int8.len(),
            PoolType::Int16 => self.int16.len(),
            PoolType::Int32 => self.int32.len(),
            PoolType::Int64 => self.int64.len(),
            PoolType::UInt8 => self.uint8.len(),
            PoolType::UInt16 => self.uint16.len(),
            PoolType::UInt32 => self.uint32.len(),
            PoolType::UInt64 => self.uint64.len(),
            PoolType::Float => self.floats.len(),
            PoolType::Double => self.doubles.len(),
            PoolType::Guid => self.guids.len(),
            PoolType::StringRef => self.string_refs.len(),
            PoolType::Locale => self.locale_refs.len(),
            PoolType::EnumChoice => self.enum_choices.len(),
            PoolType::StrongPointer => self.strong_pointers.len(),
            PoolType::WeakPointer => self.weak_pointers.len(),
            PoolType::Reference => self.references.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_type_round_trips_through_code() {
        for ty in PoolType::ORDER {
            assert_eq!(PoolType::from_code(ty as u16), Some(ty));
        }
    }

    #[test]
    fn element_sizes_match_the_wire_format() {
        assert_eq!(PoolType::Reference.element_size(), 20);
        assert_eq!(PoolType::StrongPointer.element_size(), 8);
        assert_eq!(PoolType::Guid.element_size(), 16);
    }
}
