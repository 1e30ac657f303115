use crate::{
    column::{check_capacity, down_cast, down_cast_mut, Column, ColumnBox, MAX_CAPACITY_LIMIT},
    datum::Datum,
    filter::{filter_keep, filter_vec_range},
    hash::{crc32_hash, fnv_hash},
    row_buffer::RowBuffer,
};
use std::{any::Any, fmt::Debug, fmt::Display};
use strata_base::{Result, SizeMismatch, Truncated};

/// A plain scalar stored at a fixed width.
pub trait FixedValue: Copy + Default + PartialOrd + Debug + Display + Send + Sync + 'static {
    const NAME: &'static str;
    const WIDTH: usize;

    fn to_datum(self) -> Datum;
    fn from_datum(datum: &Datum) -> Self;
    /// Writes `WIDTH` little-endian bytes to the front of `out`.
    fn write_le(self, out: &mut [u8]);
    fn read_le(bytes: &[u8]) -> Self;
    /// The value's contribution to an xor checksum.
    fn checksum_bits(self) -> i64;
    fn is_nan(self) -> bool {
        false
    }
}

macro_rules! fixed_value {
    ($t:ty, $variant:ident, $name:literal, |$v:ident| $bits:expr, |$n:ident| $nan:expr) => {
        impl FixedValue for $t {
            const NAME: &'static str = $name;
            const WIDTH: usize = std::mem::size_of::<$t>();

            fn to_datum(self) -> Datum {
                Datum::$variant(self)
            }
            fn from_datum(datum: &Datum) -> Self {
                match datum {
                    Datum::$variant(v) => *v,
                    other => panic!("{} column cannot append {:?}", $name, other),
                }
            }
            fn write_le(self, out: &mut [u8]) {
                out[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
            }
            fn read_le(bytes: &[u8]) -> Self {
                let mut buf = [0_u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(&bytes[..Self::WIDTH]);
                <$t>::from_le_bytes(buf)
            }
            fn checksum_bits(self) -> i64 {
                let $v = self;
                $bits
            }
            fn is_nan(self) -> bool {
                let $n = self;
                $nan
            }
        }
    };
}

fixed_value!(i8, Int8, "int8", |v| v as i64, |_v| false);
fixed_value!(i16, Int16, "int16", |v| v as i64, |_v| false);
fixed_value!(i32, Int32, "int32", |v| v as i64, |_v| false);
fixed_value!(i64, Int64, "int64", |v| v, |_v| false);
fixed_value!(u32, UInt32, "uint32", |v| v as i64, |_v| false);
fixed_value!(f32, Float32, "float", |v| v.to_bits() as i64, |v| v.is_nan());
fixed_value!(f64, Float64, "double", |v| v.to_bits() as i64, |v| v.is_nan());

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FixedLengthColumn<T: FixedValue> {
    data: Vec<T>,
}

pub type Int8Column = FixedLengthColumn<i8>;
pub type Int16Column = FixedLengthColumn<i16>;
pub type Int32Column = FixedLengthColumn<i32>;
pub type Int64Column = FixedLengthColumn<i64>;
pub type UInt32Column = FixedLengthColumn<u32>;
pub type FloatColumn = FixedLengthColumn<f32>;
pub type DoubleColumn = FixedLengthColumn<f64>;

impl<T: FixedValue> FixedLengthColumn<T> {
    pub fn new() -> Self {
        FixedLengthColumn { data: Vec::new() }
    }

    pub fn from_vec(data: Vec<T>) -> Self {
        FixedLengthColumn { data }
    }

    pub fn get_data(&self) -> &[T] {
        &self.data
    }

    pub fn get_data_mut(&mut self) -> &mut Vec<T> {
        &mut self.data
    }

    pub fn append_value(&mut self, v: T) {
        self.data.push(v);
    }
}

impl<T: FixedValue> Column for FixedLengthColumn<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn get_name(&self) -> &'static str {
        T::NAME
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn capacity(&self) -> usize {
        self.data.capacity()
    }

    fn check_or_die(&self) {}

    fn raw_data(&self) -> Vec<u8> {
        let mut out = vec![0_u8; self.data.len() * T::WIDTH];
        for (v, dst) in self.data.iter().zip(out.chunks_exact_mut(T::WIDTH)) {
            v.write_le(dst);
        }
        out
    }

    fn byte_size_range(&self, from: usize, size: usize) -> usize {
        assert!(from + size <= self.size(), "range error");
        size * T::WIDTH
    }

    fn byte_size_at(&self, _idx: usize) -> usize {
        T::WIDTH
    }

    fn reserve(&mut self, n: usize) {
        self.data.reserve(n.saturating_sub(self.data.len()));
    }

    fn resize(&mut self, n: usize) {
        self.data.resize(n, T::default());
    }

    fn assign(&mut self, n: usize, idx: usize) {
        let v = self.data[idx];
        self.data.clear();
        self.data.resize(n, v);
    }

    fn append_datum(&mut self, datum: &Datum) {
        self.data.push(T::from_datum(datum));
    }

    fn append(&mut self, src: &dyn Column, offset: usize, count: usize) {
        let src = down_cast::<Self>(src);
        self.data
            .extend_from_slice(&src.data[offset..offset + count]);
    }

    fn append_selective(&mut self, src: &dyn Column, indexes: &[u32], from: usize, size: usize) {
        let src = down_cast::<Self>(src);
        self.data.extend(
            indexes[from..from + size]
                .iter()
                .map(|i| src.data[*i as usize]),
        );
    }

    fn append_value_multiple_times(&mut self, src: &dyn Column, index: usize, count: usize) {
        let v = down_cast::<Self>(src).data[index];
        self.data.extend(std::iter::repeat(v).take(count));
    }

    fn append_nulls(&mut self, _count: usize) -> bool {
        false
    }

    fn append_default(&mut self, count: usize) {
        self.data
            .extend(std::iter::repeat(T::default()).take(count));
    }

    fn fill_default(&mut self, filter: &[u8]) -> Result<()> {
        for (v, f) in self.data.iter_mut().zip(filter) {
            if filter_keep(*f) {
                *v = T::default();
            }
        }
        Ok(())
    }

    fn update_rows(&mut self, src: &dyn Column, indexes: &[u32]) -> Result<()> {
        let src = down_cast::<Self>(src);
        if src.data.len() != indexes.len() {
            return Err(SizeMismatch {
                column: T::NAME,
                expected: indexes.len(),
                actual: src.data.len(),
            }
            .into());
        }
        for (v, idx) in src.data.iter().zip(indexes) {
            self.data[*idx as usize] = *v;
        }
        Ok(())
    }

    fn filter_range(&mut self, filter: &[u8], from: usize, to: usize) -> usize {
        filter_vec_range(&mut self.data, filter, from, to)
    }

    fn compare_at(&self, left: usize, right: usize, rhs: &dyn Column, nan_direction_hint: i32) -> i32 {
        let l = self.data[left];
        let r = down_cast::<Self>(rhs).data[right];
        match l.partial_cmp(&r) {
            Some(ord) => ord as i32,
            None if l.is_nan() && r.is_nan() => 0,
            None if l.is_nan() => nan_direction_hint,
            None => -nan_direction_hint,
        }
    }

    fn fnv_hash_at(&self, hash: &mut u32, idx: usize) {
        let mut buf = [0_u8; 8];
        self.data[idx].write_le(&mut buf);
        *hash = fnv_hash(&buf[..T::WIDTH], *hash);
    }

    fn crc32_hash_at(&self, hash: &mut u32, idx: usize) {
        let mut buf = [0_u8; 8];
        self.data[idx].write_le(&mut buf);
        *hash = crc32_hash(&buf[..T::WIDTH], *hash);
    }

    fn xor_checksum(&self, from: usize, to: usize) -> i64 {
        self.data[from..to]
            .iter()
            .fold(0, |acc, v| acc ^ v.checksum_bits())
    }

    fn serialize(&self, idx: usize, pos: &mut [u8]) -> u32 {
        self.data[idx].write_le(pos);
        T::WIDTH as u32
    }

    fn serialize_default(&self, pos: &mut [u8]) -> u32 {
        T::default().write_le(pos);
        T::WIDTH as u32
    }

    fn serialize_size(&self, _idx: usize) -> u32 {
        T::WIDTH as u32
    }

    fn max_one_element_serialize_size(&self) -> u32 {
        T::WIDTH as u32
    }

    fn deserialize_and_append<'a>(&mut self, pos: &'a [u8]) -> Result<&'a [u8]> {
        if pos.len() < T::WIDTH {
            return Err(Truncated {
                column: T::NAME,
                needed: T::WIDTH,
                remaining: pos.len(),
            }
            .into());
        }
        self.data.push(T::read_le(pos));
        Ok(&pos[T::WIDTH..])
    }

    fn put_row_buffer(&self, buf: &mut RowBuffer, idx: usize) {
        buf.push_number(self.data[idx]);
    }

    fn get(&self, idx: usize) -> Datum {
        self.data[idx].to_datum()
    }

    fn debug_item(&self, idx: usize) -> String {
        format!("{}", self.data[idx])
    }

    fn clone_empty(&self) -> ColumnBox {
        Box::new(Self::new())
    }

    fn clone_column(&self) -> ColumnBox {
        Box::new(self.clone())
    }

    fn swap_column(&mut self, rhs: &mut dyn Column) {
        std::mem::swap(self, down_cast_mut::<Self>(rhs));
    }

    fn reset_column(&mut self) {
        self.data.clear();
    }

    fn upgrade_if_overflow(&mut self) -> Result<Option<ColumnBox>> {
        check_capacity(T::NAME, self.data.len(), MAX_CAPACITY_LIMIT)?;
        Ok(None)
    }

    fn downgrade(&mut self) -> Result<Option<ColumnBox>> {
        Ok(None)
    }
}
