//! Core entity types shared by the page substrate, field codec, B+tree and
//! inverted index (spec §3.1). Grounded on the teacher's `core/types.rs`
//! (`DocId` newtype, `FieldValue` enum idiom) generalized to the typed SQL
//! tuple model spec §4.2 describes.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Identifies a fixed-size page within a file (spec §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageId(pub u32);

impl PageId {
    pub const INVALID: PageId = PageId(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// Identifies a variable-length area within a page (spec §3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AreaId(pub u16);

impl AreaId {
    pub const INVALID: AreaId = AreaId(u16::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// `(PageId, AreaId)` pair addressing any persistent object (spec §3.1 / GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    pub page_id: PageId,
    pub area_id: AreaId,
}

impl ObjectId {
    pub const INVALID: ObjectId = ObjectId {
        page_id: PageId::INVALID,
        area_id: AreaId::INVALID,
    };

    pub fn new(page_id: PageId, area_id: AreaId) -> Self {
        ObjectId { page_id, area_id }
    }

    pub fn is_valid(self) -> bool {
        self.page_id.is_valid() && self.area_id.is_valid()
    }

    /// Object-id bytes: page-id (4) then area-id (4), per spec §6.
    pub fn to_le_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0..4].copy_from_slice(&self.page_id.0.to_le_bytes());
        out[4..8].copy_from_slice(&(self.area_id.0 as u32).to_le_bytes());
        out
    }

    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        let page_id = PageId(u32::from_le_bytes(bytes[0..4].try_into().unwrap()));
        let area_id = AreaId(u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as u16);
        ObjectId { page_id, area_id }
    }
}

/// Dense 32-bit identifier internal to one full-text file (spec GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u32);

impl DocId {
    pub const UNDEFINED: DocId = DocId(u32::MAX);

    pub fn is_defined(self) -> bool {
        self != Self::UNDEFINED
    }
}

/// SQL kernel's stable row identifier (spec GLOSSARY: bidirectionally mapped
/// to `DocId`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId(pub u64);

impl RowId {
    pub const UNDEFINED: RowId = RowId(u64::MAX);

    pub fn is_defined(self) -> bool {
        self != Self::UNDEFINED
    }
}

/// Per-field sort direction multiplier, `{+1, -1}` (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn multiplier(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// Declared type of one schema field (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Date,
    DateTime,
    ObjectId,
    /// Inline-variable or outside-variable string; which storage the field
    /// uses is decided by `max_len` vs. the file's inline budget, not by a
    /// separate type tag (spec §3.1: "KeyObject area... Fields are: fixed,
    /// inline-variable, outside-variable").
    VarChar { max_len: u32 },
    /// Array of a declared element type, cardinality bounded by `max_len`
    /// elements (spec §4.4.1's "array cardinality ≤ declared element-max").
    Array {
        element: Box<FieldType>,
        max_len: u32,
    },
}

/// A single typed field value, or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    ObjectId(ObjectId),
    Text(String),
    Array(Vec<FieldValue>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Int32(_) => "int32",
            FieldValue::UInt32(_) => "uint32",
            FieldValue::Int64(_) => "int64",
            FieldValue::UInt64(_) => "uint64",
            FieldValue::Float32(_) => "float32",
            FieldValue::Float64(_) => "float64",
            FieldValue::Date(_) => "date",
            FieldValue::DateTime(_) => "datetime",
            FieldValue::ObjectId(_) => "object_id",
            FieldValue::Text(_) => "text",
            FieldValue::Array(_) => "array",
        }
    }
}

/// A tuple of field values as passed across the LogicalFile boundary (spec §6).
/// Element 0 is conventionally the object-id placeholder column (null allowed
/// until the row is written), matching spec §4.4.1's insert-argument contract.
pub type Tuple = Vec<FieldValue>;
