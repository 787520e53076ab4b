//! Field codec (C2): null-bitmap plus typed field encode/decode for a
//! B+tree tuple (spec §4.2). Grounded on the teacher's `core/types.rs`
//! (`FieldValue` enum) generalized into the on-disk wire format spec.md
//! describes: fixed-width fields, inline-variable strings, and
//! outside-variable strings that may additionally be compressed or split
//! ("divided") across areas.

use chrono::{NaiveDate, NaiveDateTime};
use unicode_segmentation::UnicodeSegmentation;

use crate::compression::{CompressedBlock, CompressionType};
use crate::core::error::{Error, Result};
use crate::core::types::{FieldType, FieldValue, ObjectId, SortDirection};

/// How an outside-variable string's bytes are laid out once they leave the
/// inline key (spec §3.1/§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// Stored as one contiguous area.
    Normal,
    /// Split across more than one area when it exceeds a single area's
    /// capacity; chunk boundaries are managed by the caller (btree::ops),
    /// not by this codec.
    Divide,
    /// Compressed with `compression::block` before storage.
    Compressed,
    /// Both divided and compressed.
    DivideCompressed,
    /// An array of divided strings, one object per element.
    DivideArray,
}

/// Bit `i` set means field `i` is null. Grounded on the teacher's
/// `FieldValue`/`Document` model, which had no explicit null representation
/// (a missing `HashMap` entry stood in for null); this makes null positional
/// and dense, as a B+tree key tuple requires.
pub fn null_bitmap(values: &[FieldValue]) -> Vec<u8> {
    let mut bitmap = vec![0u8; values.len().div_ceil(8)];
    for (i, v) in values.iter().enumerate() {
        if v.is_null() {
            bitmap[i / 8] |= 1 << (i % 8);
        }
    }
    bitmap
}

pub fn is_null(bitmap: &[u8], index: usize) -> bool {
    bitmap
        .get(index / 8)
        .map(|byte| byte & (1 << (index % 8)) != 0)
        .unwrap_or(false)
}

/// Encode one fixed-width field's payload (no null bitmap, no length
/// prefix). `FieldValue::Null` encodes to nothing — the bitmap alone
/// records it and the decoder must consult the bitmap first.
pub fn encode_fixed(value: &FieldValue) -> Result<Vec<u8>> {
    Ok(match value {
        FieldValue::Null => Vec::new(),
        FieldValue::Int32(v) => v.to_le_bytes().to_vec(),
        FieldValue::UInt32(v) => v.to_le_bytes().to_vec(),
        FieldValue::Int64(v) => v.to_le_bytes().to_vec(),
        FieldValue::UInt64(v) => v.to_le_bytes().to_vec(),
        FieldValue::Float32(v) => v.to_le_bytes().to_vec(),
        FieldValue::Float64(v) => v.to_le_bytes().to_vec(),
        FieldValue::Date(d) => d.num_days_from_ce().to_le_bytes().to_vec(),
        FieldValue::DateTime(dt) => dt.and_utc().timestamp_millis().to_le_bytes().to_vec(),
        FieldValue::ObjectId(oid) => oid.to_le_bytes().to_vec(),
        other => {
            return Err(Error::BadArgument(format!(
                "{} is not a fixed-width field type",
                other.type_name()
            )))
        }
    })
}

pub fn fixed_width(ty: FieldType) -> Option<usize> {
    match ty {
        FieldType::Int32 | FieldType::UInt32 | FieldType::Float32 => Some(4),
        FieldType::Int64 | FieldType::UInt64 | FieldType::Float64 => Some(8),
        FieldType::Date => Some(4),
        FieldType::DateTime => Some(8),
        FieldType::ObjectId => Some(8),
        FieldType::VarChar { .. } | FieldType::Array { .. } => None,
    }
}

pub fn decode_fixed(ty: FieldType, bytes: &[u8]) -> Result<FieldValue> {
    let want = fixed_width(ty).ok_or_else(|| {
        Error::BadArgument("decode_fixed called on a variable-length field type".to_string())
    })?;
    if bytes.len() < want {
        return Err(Error::Parse("field buffer too short for fixed field".to_string()));
    }
    Ok(match ty {
        FieldType::Int32 => FieldValue::Int32(i32::from_le_bytes(bytes[0..4].try_into().unwrap())),
        FieldType::UInt32 => FieldValue::UInt32(u32::from_le_bytes(bytes[0..4].try_into().unwrap())),
        FieldType::Int64 => FieldValue::Int64(i64::from_le_bytes(bytes[0..8].try_into().unwrap())),
        FieldType::UInt64 => FieldValue::UInt64(u64::from_le_bytes(bytes[0..8].try_into().unwrap())),
        FieldType::Float32 => FieldValue::Float32(f32::from_le_bytes(bytes[0..4].try_into().unwrap())),
        FieldType::Float64 => FieldValue::Float64(f64::from_le_bytes(bytes[0..8].try_into().unwrap())),
        FieldType::Date => {
            let days = i32::from_le_bytes(bytes[0..4].try_into().unwrap());
            let date = NaiveDate::from_num_days_from_ce_opt(days)
                .ok_or_else(|| Error::Parse("invalid encoded date".to_string()))?;
            FieldValue::Date(date)
        }
        FieldType::DateTime => {
            let millis = i64::from_le_bytes(bytes[0..8].try_into().unwrap());
            let dt = NaiveDateTime::from_timestamp_millis(millis)
                .ok_or_else(|| Error::Parse("invalid encoded datetime".to_string()))?;
            FieldValue::DateTime(dt)
        }
        FieldType::ObjectId => {
            FieldValue::ObjectId(ObjectId::from_le_bytes(bytes[0..8].try_into().unwrap()))
        }
        FieldType::VarChar { .. } | FieldType::Array { .. } => unreachable!(),
    })
}

/// Inline-variable text: a 2-byte little-endian length prefix followed by
/// UTF-8 bytes, used while the string fits the node's inline budget.
pub fn encode_inline_text(s: &str) -> Result<Vec<u8>> {
    if s.len() > u16::MAX as usize {
        return Err(Error::BadArgument(format!(
            "text of {} bytes exceeds the inline-variable length prefix",
            s.len()
        )));
    }
    let mut out = Vec::with_capacity(2 + s.len());
    out.extend_from_slice(&(s.len() as u16).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
    Ok(out)
}

pub fn decode_inline_text(bytes: &[u8]) -> Result<(String, usize)> {
    if bytes.len() < 2 {
        return Err(Error::Parse("inline-variable length prefix truncated".to_string()));
    }
    let len = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
    if bytes.len() < 2 + len {
        return Err(Error::Parse("inline-variable text truncated".to_string()));
    }
    let s = std::str::from_utf8(&bytes[2..2 + len])
        .map_err(|e| Error::Parse(format!("inline-variable text is not valid UTF-8: {e}")))?
        .to_string();
    Ok((s, 2 + len))
}

/// Outside-variable text: stored as bytes meant to live in a separate area
/// (or areas, if `ObjectType::Divide*`), optionally compressed.
pub fn encode_outside_text(s: &str, object_type: ObjectType) -> Result<Vec<u8>> {
    match object_type {
        ObjectType::Normal | ObjectType::Divide | ObjectType::DivideArray => Ok(s.as_bytes().to_vec()),
        ObjectType::Compressed | ObjectType::DivideCompressed => {
            let block = CompressedBlock::compress(s.as_bytes(), CompressionType::LZ4)?;
            bincode::serialize(&block).map_err(Error::from)
        }
    }
}

pub fn decode_outside_text(bytes: &[u8], object_type: ObjectType) -> Result<String> {
    let raw = match object_type {
        ObjectType::Normal | ObjectType::Divide | ObjectType::DivideArray => bytes.to_vec(),
        ObjectType::Compressed | ObjectType::DivideCompressed => {
            let block: CompressedBlock = bincode::deserialize(bytes)?;
            block.decompress()?
        }
    };
    String::from_utf8(raw).map_err(|e| Error::Parse(format!("outside-variable text is not valid UTF-8: {e}")))
}

/// Code-point-correct comparison of two materialized strings (spec §4.2:
/// "materialize to a single unicode string before comparison"). Grapheme
/// boundaries are compared cluster-by-cluster so combining marks never split
/// a comparison unit.
pub fn compare_text(a: &str, b: &str) -> std::cmp::Ordering {
    a.graphemes(true).cmp(b.graphemes(true))
}

/// Field-wise comparison using the declared type's natural ordering,
/// multiplied by the field's direction (spec §4.2). Null compares as `+1 *
/// multiplier`, i.e. it sorts first on an ascending field and last on a
/// descending one — `equals_to_null` (§4.4.2) relies on this to pick which
/// end of the leaf chain to scan from.
pub fn compare_value(a: &FieldValue, b: &FieldValue, direction: SortDirection) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    let mult = direction.multiplier();
    let raw = match (a, b) {
        (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
        (FieldValue::Null, _) => Ordering::Less,
        (_, FieldValue::Null) => Ordering::Greater,
        (FieldValue::Int32(x), FieldValue::Int32(y)) => x.cmp(y),
        (FieldValue::UInt32(x), FieldValue::UInt32(y)) => x.cmp(y),
        (FieldValue::Int64(x), FieldValue::Int64(y)) => x.cmp(y),
        (FieldValue::UInt64(x), FieldValue::UInt64(y)) => x.cmp(y),
        (FieldValue::Float32(x), FieldValue::Float32(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (FieldValue::Float64(x), FieldValue::Float64(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (FieldValue::Date(x), FieldValue::Date(y)) => x.cmp(y),
        (FieldValue::DateTime(x), FieldValue::DateTime(y)) => x.cmp(y),
        (FieldValue::ObjectId(x), FieldValue::ObjectId(y)) => x.cmp(y),
        (FieldValue::Text(x), FieldValue::Text(y)) => compare_text(x, y),
        (FieldValue::Array(xs), FieldValue::Array(ys)) => {
            xs.iter()
                .zip(ys.iter())
                .map(|(x, y)| compare_value(x, y, SortDirection::Ascending))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or_else(|| xs.len().cmp(&ys.len()))
        }
        (x, y) => {
            // Mismatched variants only arise from a schema/argument bug;
            // fall back to a stable (if arbitrary) discriminant order so a
            // comparator never panics mid-descent.
            discriminant_rank(x).cmp(&discriminant_rank(y))
        }
    };
    if mult < 0 {
        raw.reverse()
    } else {
        raw
    }
}

fn discriminant_rank(v: &FieldValue) -> u8 {
    match v {
        FieldValue::Null => 0,
        FieldValue::Int32(_) => 1,
        FieldValue::UInt32(_) => 2,
        FieldValue::Int64(_) => 3,
        FieldValue::UInt64(_) => 4,
        FieldValue::Float32(_) => 5,
        FieldValue::Float64(_) => 6,
        FieldValue::Date(_) => 7,
        FieldValue::DateTime(_) => 8,
        FieldValue::ObjectId(_) => 9,
        FieldValue::Text(_) => 10,
        FieldValue::Array(_) => 11,
    }
}

/// Compare two key tuples field-by-field under the file's declared
/// directions, short-circuiting at the first unequal field (spec §3.2
/// invariant 1). The slices must be the same declared arity; a caller
/// passing a prefix (compound search, §4.4.2) should slice both sides to
/// the matching length first.
pub fn compare_tuple(a: &[FieldValue], b: &[FieldValue], directions: &[SortDirection]) -> std::cmp::Ordering {
    for ((x, y), dir) in a.iter().zip(b.iter()).zip(directions.iter()) {
        let ord = compare_value(x, y, *dir);
        if ord != std::cmp::Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

/// Encode a full tuple: null bitmap, then each non-null field in schema
/// order. Variable-length fields are always inline-encoded here; a caller
/// that needs outside storage re-encodes that one field with
/// `encode_outside_text` and replaces the inline bytes with the resulting
/// `ObjectId` (encoded via `encode_fixed(&FieldValue::ObjectId(..))`).
pub fn encode_tuple(types: &[FieldType], values: &[FieldValue]) -> Result<Vec<u8>> {
    if types.len() != values.len() {
        return Err(Error::BadArgument(format!(
            "schema has {} fields but tuple has {}",
            types.len(),
            values.len()
        )));
    }
    let mut out = null_bitmap(values);
    for (ty, value) in types.iter().zip(values.iter()) {
        if value.is_null() {
            continue;
        }
        match ty {
            FieldType::VarChar { .. } => match value {
                FieldValue::Text(s) => out.extend(encode_inline_text(s)?),
                other => {
                    return Err(Error::BadArgument(format!(
                        "expected text for a VarChar field, got {}",
                        other.type_name()
                    )))
                }
            },
            FieldType::Array { element, .. } => match value {
                FieldValue::Array(items) => {
                    out.extend((items.len() as u16).to_le_bytes());
                    for item in items {
                        out.extend(encode_tuple(std::slice::from_ref(element), std::slice::from_ref(item))?);
                    }
                }
                other => {
                    return Err(Error::BadArgument(format!(
                        "expected array for an Array field, got {}",
                        other.type_name()
                    )))
                }
            },
            fixed => out.extend(encode_fixed(value).map_err(|_| {
                Error::BadArgument(format!("value does not match declared type {fixed:?}"))
            })?),
        }
    }
    Ok(out)
}

pub fn decode_tuple(types: &[FieldType], bytes: &[u8]) -> Result<Vec<FieldValue>> {
    let bitmap_len = types.len().div_ceil(8);
    if bytes.len() < bitmap_len {
        return Err(Error::Parse("tuple buffer shorter than its null bitmap".to_string()));
    }
    let bitmap = &bytes[..bitmap_len];
    let mut pos = bitmap_len;
    let mut values = Vec::with_capacity(types.len());
    for (i, ty) in types.iter().enumerate() {
        if is_null(bitmap, i) {
            values.push(FieldValue::Null);
            continue;
        }
        match ty {
            FieldType::VarChar { .. } => {
                let (s, consumed) = decode_inline_text(&bytes[pos..])?;
                pos += consumed;
                values.push(FieldValue::Text(s));
            }
            FieldType::Array { element, .. } => {
                if bytes.len() < pos + 2 {
                    return Err(Error::Parse("array element count truncated".to_string()));
                }
                let count = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]) as usize;
                pos += 2;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    let decoded = decode_tuple(std::slice::from_ref(element.as_ref()), &bytes[pos..])?;
                    // Re-encode to learn how many bytes the element consumed;
                    // cheap relative to the I/O this codec already does, and
                    // keeps one cursor-advance rule instead of two.
                    pos += encode_tuple(std::slice::from_ref(element.as_ref()), &decoded)?.len();
                    items.push(decoded.into_iter().next().unwrap());
                }
                values.push(FieldValue::Array(items));
            }
            fixed => {
                let width = fixed_width(*fixed).ok_or_else(|| {
                    Error::Internal("fixed_width returned None for a non-variable type".to_string())
                })?;
                values.push(decode_fixed(*fixed, &bytes[pos..pos + width])?);
                pos += width;
            }
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AreaId, PageId};

    #[test]
    fn fixed_tuple_round_trips() {
        let types = vec![FieldType::Int32, FieldType::Float64, FieldType::ObjectId];
        let values = vec![
            FieldValue::Int32(-7),
            FieldValue::Float64(3.5),
            FieldValue::ObjectId(ObjectId::new(PageId(4), AreaId(1))),
        ];
        let bytes = encode_tuple(&types, &values).unwrap();
        assert_eq!(decode_tuple(&types, &bytes).unwrap(), values);
    }

    #[test]
    fn null_field_round_trips() {
        let types = vec![FieldType::Int32, FieldType::VarChar { max_len: 32 }];
        let values = vec![FieldValue::Null, FieldValue::Text("hi".to_string())];
        let bytes = encode_tuple(&types, &values).unwrap();
        assert_eq!(decode_tuple(&types, &bytes).unwrap(), values);
    }

    #[test]
    fn outside_text_compressed_round_trips() {
        let s = "a repeated phrase ".repeat(20);
        let enc = encode_outside_text(&s, ObjectType::Compressed).unwrap();
        assert_eq!(decode_outside_text(&enc, ObjectType::Compressed).unwrap(), s);
    }

    #[test]
    fn compare_text_orders_by_grapheme_cluster() {
        assert_eq!(compare_text("abc", "abd"), std::cmp::Ordering::Less);
        assert_eq!(compare_text("abc", "abc"), std::cmp::Ordering::Equal);
    }

    #[test]
    fn null_compare_result_is_direction_dependent() {
        use std::cmp::Ordering;
        assert_eq!(
            compare_value(&FieldValue::Null, &FieldValue::Int32(5), SortDirection::Ascending),
            Ordering::Less
        );
        assert_eq!(
            compare_value(&FieldValue::Null, &FieldValue::Int32(5), SortDirection::Descending),
            Ordering::Greater
        );
    }

    #[test]
    fn descending_direction_reverses_non_null_order() {
        use std::cmp::Ordering;
        assert_eq!(
            compare_value(&FieldValue::Int32(1), &FieldValue::Int32(2), SortDirection::Descending),
            Ordering::Greater
        );
    }

    #[test]
    fn compare_tuple_short_circuits_on_first_difference() {
        let dirs = vec![SortDirection::Ascending, SortDirection::Ascending];
        let a = vec![FieldValue::Int32(1), FieldValue::Int32(99)];
        let b = vec![FieldValue::Int32(1), FieldValue::Int32(2)];
        assert_eq!(compare_tuple(&a, &b, &dirs), std::cmp::Ordering::Greater);
    }
}
