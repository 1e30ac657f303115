use crate::{
    column::{check_capacity, down_cast, down_cast_mut, Column, ColumnBox, MAX_CAPACITY_LIMIT},
    datum::Datum,
    filter::filter_keep,
    hash::{crc32_hash, fnv_hash, xor_fold_bytes},
    row_buffer::RowBuffer,
};
use std::any::Any;
use strata_base::{CapacityExceeded, Result, SizeMismatch, Truncated};

/// Largest byte length a `BinaryColumn` can address.
pub const BINARY_OFFSET_LIMIT: usize = u32::MAX as usize;

/// Byte length past which `upgrade_if_overflow` widens a `BinaryColumn`,
/// leaving headroom for the appends of the batch in flight.
pub const BINARY_UPGRADE_THRESHOLD: usize = BINARY_OFFSET_LIMIT / 2;

pub trait BinaryOffset: Copy + Default + Ord + std::fmt::Debug + Send + Sync + 'static {
    const NAME: &'static str;
    const LARGE: bool;
    fn from_usize(v: usize) -> Self;
    fn to_usize(self) -> usize;
}

impl BinaryOffset for u32 {
    const NAME: &'static str = "binary";
    const LARGE: bool = false;
    fn from_usize(v: usize) -> Self {
        match u32::try_from(v) {
            Ok(o) => o,
            Err(_) => panic!("binary offset {} overflows u32, column must be upgraded first", v),
        }
    }
    fn to_usize(self) -> usize {
        self as usize
    }
}

impl BinaryOffset for u64 {
    const NAME: &'static str = "large_binary";
    const LARGE: bool = true;
    fn from_usize(v: usize) -> Self {
        v as u64
    }
    fn to_usize(self) -> usize {
        self as usize
    }
}

/// Variable-length byte strings, concatenated, delimited by `size() + 1`
/// offsets.
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryColumnBase<O: BinaryOffset> {
    offsets: Vec<O>,
    bytes: Vec<u8>,
}

pub type BinaryColumn = BinaryColumnBase<u32>;
pub type LargeBinaryColumn = BinaryColumnBase<u64>;

impl<O: BinaryOffset> Default for BinaryColumnBase<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: BinaryOffset> BinaryColumnBase<O> {
    pub fn new() -> Self {
        BinaryColumnBase {
            offsets: vec![O::default()],
            bytes: Vec::new(),
        }
    }

    pub fn from_slices<'a>(items: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut col = Self::new();
        for item in items {
            col.append_bytes(item);
        }
        col
    }

    pub fn append_bytes(&mut self, item: &[u8]) {
        self.bytes.extend_from_slice(item);
        self.offsets.push(O::from_usize(self.bytes.len()));
    }

    pub fn get_slice(&self, idx: usize) -> &[u8] {
        &self.bytes[self.offsets[idx].to_usize()..self.offsets[idx + 1].to_usize()]
    }

    pub fn get_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn start(&self, idx: usize) -> usize {
        self.offsets[idx].to_usize()
    }

    fn convert<P: BinaryOffset>(&self) -> BinaryColumnBase<P> {
        BinaryColumnBase {
            offsets: self
                .offsets
                .iter()
                .map(|o| P::from_usize(o.to_usize()))
                .collect(),
            bytes: self.bytes.clone(),
        }
    }

    // Rebuilds the column with `replace(i)` substituted for each row `i`
    // where it returns Some.
    fn rebuild_with<'a>(&self, replace: impl Fn(usize) -> Option<&'a [u8]>) -> Self {
        let mut out = Self::new();
        out.bytes.reserve(self.bytes.len());
        for i in 0..self.size() {
            match replace(i) {
                Some(item) => out.append_bytes(item),
                None => out.append_bytes(self.get_slice(i)),
            }
        }
        out
    }
}

impl<O: BinaryOffset> Column for BinaryColumnBase<O> {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn get_name(&self) -> &'static str {
        O::NAME
    }

    fn size(&self) -> usize {
        self.offsets.len() - 1
    }

    fn capacity(&self) -> usize {
        self.offsets.capacity() - 1
    }

    fn check_or_die(&self) {
        assert_eq!(self.offsets[0], O::default(), "first binary offset must be 0");
        assert!(
            self.offsets.windows(2).all(|w| w[0] <= w[1]),
            "binary offsets must be non-decreasing"
        );
        assert_eq!(
            self.offsets[self.offsets.len() - 1].to_usize(),
            self.bytes.len(),
            "last binary offset must equal byte length"
        );
    }

    fn raw_data(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    fn byte_size_range(&self, from: usize, size: usize) -> usize {
        assert!(from + size <= self.size(), "range error");
        (self.start(from + size) - self.start(from)) + size * std::mem::size_of::<O>()
    }

    fn byte_size_at(&self, idx: usize) -> usize {
        self.byte_size_range(idx, 1)
    }

    fn reserve(&mut self, n: usize) {
        self.offsets
            .reserve((n + 1).saturating_sub(self.offsets.len()));
    }

    fn resize(&mut self, n: usize) {
        if n <= self.size() {
            self.offsets.truncate(n + 1);
            let end = self.start(n);
            self.bytes.truncate(end);
        } else {
            let last = self.offsets[self.offsets.len() - 1];
            self.offsets.resize(n + 1, last);
        }
    }

    fn assign(&mut self, n: usize, idx: usize) {
        let item = self.get_slice(idx).to_vec();
        let mut out = Self::new();
        for _ in 0..n {
            out.append_bytes(&item);
        }
        *self = out;
    }

    fn append_datum(&mut self, datum: &Datum) {
        match datum {
            Datum::Binary(b) => self.append_bytes(b),
            other => panic!("{} column cannot append {:?}", O::NAME, other),
        }
    }

    fn append(&mut self, src: &dyn Column, offset: usize, count: usize) {
        let src = down_cast::<Self>(src);
        let begin = src.start(offset);
        let end = src.start(offset + count);
        let base = self.bytes.len();
        self.bytes.extend_from_slice(&src.bytes[begin..end]);
        for i in offset..offset + count {
            let o = base + src.start(i + 1) - begin;
            self.offsets.push(O::from_usize(o));
        }
    }

    fn append_selective(&mut self, src: &dyn Column, indexes: &[u32], from: usize, size: usize) {
        let src = down_cast::<Self>(src);
        for idx in &indexes[from..from + size] {
            self.append_bytes(src.get_slice(*idx as usize));
        }
    }

    fn append_value_multiple_times(&mut self, src: &dyn Column, index: usize, count: usize) {
        let item = down_cast::<Self>(src).get_slice(index);
        for _ in 0..count {
            self.append_bytes(item);
        }
    }

    fn append_nulls(&mut self, _count: usize) -> bool {
        false
    }

    fn append_default(&mut self, count: usize) {
        let last = self.offsets[self.offsets.len() - 1];
        self.offsets
            .extend(std::iter::repeat(last).take(count));
    }

    fn fill_default(&mut self, filter: &[u8]) -> Result<()> {
        let empty: &[u8] = &[];
        *self = self.rebuild_with(|i| filter.get(i).is_some_and(|b| filter_keep(*b)).then_some(empty));
        Ok(())
    }

    fn update_rows(&mut self, src: &dyn Column, indexes: &[u32]) -> Result<()> {
        let src = down_cast::<Self>(src);
        if src.size() != indexes.len() {
            return Err(SizeMismatch {
                column: O::NAME,
                expected: indexes.len(),
                actual: src.size(),
            }
            .into());
        }
        let mut next = 0;
        let mut out = Self::new();
        out.bytes.reserve(self.bytes.len());
        for i in 0..self.size() {
            if next < indexes.len() && indexes[next] as usize == i {
                out.append_bytes(src.get_slice(next));
                next += 1;
            } else {
                out.append_bytes(self.get_slice(i));
            }
        }
        *self = out;
        Ok(())
    }

    fn filter_range(&mut self, filter: &[u8], from: usize, to: usize) -> usize {
        assert!(filter.len() >= to, "filter shorter than row range");
        let mut result = from;
        let mut write = self.start(from);
        for i in from..to {
            if filter_keep(filter[i]) {
                let (begin, end) = (self.start(i), self.start(i + 1));
                self.bytes.copy_within(begin..end, write);
                write += end - begin;
                self.offsets[result + 1] = O::from_usize(write);
                result += 1;
            }
        }
        // Rows past `to` shift down unfiltered.
        let size = self.size();
        let tail_begin = self.start(to);
        for i in to..size {
            let end = self.start(i + 1);
            self.offsets[result + 1] = O::from_usize(write + end - tail_begin);
            result += 1;
        }
        let tail_len = self.bytes.len() - tail_begin;
        self.bytes.copy_within(tail_begin.., write);
        self.bytes.truncate(write + tail_len);
        self.offsets.truncate(result + 1);
        result
    }

    fn compare_at(&self, left: usize, right: usize, rhs: &dyn Column, _nan_direction_hint: i32) -> i32 {
        let r = down_cast::<Self>(rhs).get_slice(right);
        self.get_slice(left).cmp(r) as i32
    }

    fn fnv_hash_at(&self, hash: &mut u32, idx: usize) {
        *hash = fnv_hash(self.get_slice(idx), *hash);
    }

    fn crc32_hash_at(&self, hash: &mut u32, idx: usize) {
        *hash = crc32_hash(self.get_slice(idx), *hash);
    }

    fn xor_checksum(&self, from: usize, to: usize) -> i64 {
        (from..to).fold(0, |acc, i| acc ^ xor_fold_bytes(self.get_slice(i)))
    }

    fn serialize(&self, idx: usize, pos: &mut [u8]) -> u32 {
        let item = self.get_slice(idx);
        let len = item.len() as u32;
        pos[..4].copy_from_slice(&len.to_le_bytes());
        pos[4..4 + item.len()].copy_from_slice(item);
        4 + len
    }

    fn serialize_default(&self, pos: &mut [u8]) -> u32 {
        pos[..4].copy_from_slice(&0_u32.to_le_bytes());
        4
    }

    fn serialize_size(&self, idx: usize) -> u32 {
        4 + (self.start(idx + 1) - self.start(idx)) as u32
    }

    fn deserialize_and_append<'a>(&mut self, pos: &'a [u8]) -> Result<&'a [u8]> {
        let truncated = |needed: usize| Truncated {
            column: O::NAME,
            needed,
            remaining: pos.len(),
        };
        if pos.len() < 4 {
            return Err(truncated(4).into());
        }
        let len = u32::from_le_bytes([pos[0], pos[1], pos[2], pos[3]]) as usize;
        if pos.len() < 4 + len {
            return Err(truncated(4 + len).into());
        }
        self.append_bytes(&pos[4..4 + len]);
        Ok(&pos[4 + len..])
    }

    fn put_row_buffer(&self, buf: &mut RowBuffer, idx: usize) {
        buf.push_string(self.get_slice(idx), '"');
    }

    fn get(&self, idx: usize) -> Datum {
        Datum::Binary(self.get_slice(idx).to_vec())
    }

    fn debug_item(&self, idx: usize) -> String {
        format!("'{}'", String::from_utf8_lossy(self.get_slice(idx)))
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
        self.offsets.truncate(1);
        self.bytes.clear();
    }

    fn upgrade_if_overflow(&mut self) -> Result<Option<ColumnBox>> {
        check_capacity(O::NAME, self.size(), MAX_CAPACITY_LIMIT)?;
        if !O::LARGE && self.bytes.len() > BINARY_UPGRADE_THRESHOLD {
            return Ok(Some(Box::new(self.convert::<u64>())));
        }
        Ok(None)
    }

    fn downgrade(&mut self) -> Result<Option<ColumnBox>> {
        if !O::LARGE {
            return Ok(None);
        }
        if self.bytes.len() > BINARY_OFFSET_LIMIT {
            return Err(CapacityExceeded {
                column: O::NAME,
                limit: BINARY_OFFSET_LIMIT,
                len: self.bytes.len(),
            }
            .into());
        }
        Ok(Some(Box::new(self.convert::<u32>())))
    }

    fn has_large_column(&self) -> bool {
        O::LARGE
    }
}
