use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Logical map value: unique keys, iterated in key order. Inserting an
/// existing key replaces its value.
pub type DatumMap = BTreeMap<DatumKey, Datum>;

/// A single logical value read out of (or appended into) a column.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub enum Datum {
    #[default]
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    Float32(f32),
    Float64(f64),
    Binary(Vec<u8>),
    Map(DatumMap),
}

/// The hashable, totally-ordered subset of `Datum` usable as a map key.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum DatumKey {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),
    Binary(Vec<u8>),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    // Panics on datums that cannot be keys (null, maps): callers only
    // convert values read back out of a key column.
    pub fn to_key(&self) -> DatumKey {
        match self {
            Datum::Int8(v) => DatumKey::Int8(*v),
            Datum::Int16(v) => DatumKey::Int16(*v),
            Datum::Int32(v) => DatumKey::Int32(*v),
            Datum::Int64(v) => DatumKey::Int64(*v),
            Datum::UInt32(v) => DatumKey::UInt32(*v),
            Datum::Float32(v) => DatumKey::Float32(OrderedFloat(*v)),
            Datum::Float64(v) => DatumKey::Float64(OrderedFloat(*v)),
            Datum::Binary(v) => DatumKey::Binary(v.clone()),
            Datum::Null | Datum::Map(_) => panic!("datum {:?} cannot be used as a map key", self),
        }
    }

    pub fn as_map(&self) -> Option<&DatumMap> {
        match self {
            Datum::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Datum::Binary(b) => Some(b),
            _ => None,
        }
    }
}

impl DatumKey {
    pub fn to_datum(&self) -> Datum {
        match self {
            DatumKey::Int8(v) => Datum::Int8(*v),
            DatumKey::Int16(v) => Datum::Int16(*v),
            DatumKey::Int32(v) => Datum::Int32(*v),
            DatumKey::Int64(v) => Datum::Int64(*v),
            DatumKey::UInt32(v) => Datum::UInt32(*v),
            DatumKey::Float32(v) => Datum::Float32(v.0),
            DatumKey::Float64(v) => Datum::Float64(v.0),
            DatumKey::Binary(v) => Datum::Binary(v.clone()),
        }
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::Binary(s.as_bytes().to_vec())
    }
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Datum::Int32(v)
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Int64(v)
    }
}

impl From<DatumMap> for Datum {
    fn from(m: DatumMap) -> Self {
        Datum::Map(m)
    }
}

impl From<&str> for DatumKey {
    fn from(s: &str) -> Self {
        DatumKey::Binary(s.as_bytes().to_vec())
    }
}

impl From<i32> for DatumKey {
    fn from(v: i32) -> Self {
        DatumKey::Int32(v)
    }
}

impl From<i64> for DatumKey {
    fn from(v: i64) -> Self {
        DatumKey::Int64(v)
    }
}
