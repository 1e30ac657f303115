// A column of maps. Row `i` owns the elements `offsets[i]..offsets[i + 1]`
// of two parallel child columns, one of keys and one of values, which hold
// every row's entries concatenated in row order.
//
// Invariants:
//   - offsets.len() == size() + 1, offsets[0] == 0, offsets non-decreasing
//   - keys.size() == values.size() == offsets.last()
//   - keys and values are nullable columns, whatever the map's own type
//
// Null keys are never produced by append_datum; they come from callers
// building children directly or from nulled-out entries, and get() skips
// them when it materializes the row.
//
// The map column itself has no null representation: a null map and an empty
// map are both a zero-length element span. A column that needs to tell them
// apart wraps this one in a NullableColumn.

use crate::{
    column::{
        check_capacity, down_cast, down_cast_mut, downgrade_helper, upgrade_helper, Column,
        ColumnBox, MAX_CAPACITY_LIMIT,
    },
    datum::{Datum, DatumMap},
    filter::{compact_offsets, filter_keep, FilterKernel},
    fixed::UInt32Column,
    hash::{crc32_hash, fnv_hash},
    nullable::NullableColumn,
    row_buffer::RowBuffer,
};
use std::any::Any;
use strata_base::{Result, SizeMismatch, Truncated};
use tracing::debug;

const NAME: &str = "MapColumn";
const COUNT_SIZE: usize = std::mem::size_of::<u32>();

#[derive(Debug)]
pub struct MapColumn {
    keys: ColumnBox,
    values: ColumnBox,
    offsets: UInt32Column,
}

impl MapColumn {
    /// Takes ownership of prebuilt children. An empty `offsets` is seeded
    /// with the leading 0; a non-empty one must already start with it.
    pub fn new(keys: ColumnBox, values: ColumnBox, mut offsets: UInt32Column) -> Self {
        if offsets.is_empty() {
            offsets.append_value(0);
        }
        MapColumn {
            keys,
            values,
            offsets,
        }
    }

    /// Like `new` with empty offsets, wrapping either child in a
    /// `NullableColumn` if it is not one already. Children must be empty.
    pub fn with_children(keys: ColumnBox, values: ColumnBox) -> Self {
        assert!(keys.is_empty() && values.is_empty(), "children must start empty");
        let wrap = |c: ColumnBox| -> ColumnBox {
            if c.is_nullable() {
                c
            } else {
                Box::new(NullableColumn::wrap(c))
            }
        };
        MapColumn::new(wrap(keys), wrap(values), UInt32Column::new())
    }

    pub fn keys(&self) -> &dyn Column {
        self.keys.as_ref()
    }

    pub fn values(&self) -> &dyn Column {
        self.values.as_ref()
    }

    pub fn offsets(&self) -> &UInt32Column {
        &self.offsets
    }

    fn offset(&self, i: usize) -> usize {
        self.offsets.get_data()[i] as usize
    }

    fn last_offset(&self) -> u32 {
        let data = self.offsets.get_data();
        data[data.len() - 1]
    }

    /// Element span `(start, len)` of row `idx`.
    fn span(&self, idx: usize) -> (usize, usize) {
        let data = self.offsets.get_data();
        assert!(idx + 1 < data.len(), "row {} out of range {}", idx, data.len() - 1);
        let start = data[idx] as usize;
        (start, data[idx + 1] as usize - start)
    }

    pub fn get_map_size(&self, idx: usize) -> usize {
        self.span(idx).1
    }

    fn push_offset(&mut self, len: usize) {
        let next = self.last_offset() as usize + len;
        self.offsets.append_value(next as u32);
    }

    /// `filter_range` with an explicit choice of row-pass kernel. Every
    /// kernel leaves the column in the same state.
    pub fn filter_range_with_kernel(
        &mut self,
        kernel: FilterKernel,
        filter: &[u8],
        from: usize,
        to: usize,
    ) -> usize {
        assert_eq!(self.size(), to, "map filter must reach the end of the column");
        let offsets = self.offsets.get_data_mut();
        let elements_start = offsets[from] as usize;
        let elements_end = offsets[to] as usize;
        let mut element_filter = vec![0_u8; elements_end];

        let result = compact_offsets(kernel, filter, offsets, from, to, &mut element_filter);
        let kept_elements = offsets[result] as usize;

        let kept = self
            .keys
            .filter_range(&element_filter, elements_start, elements_end);
        debug_assert_eq!(kept, kept_elements);
        let kept = self
            .values
            .filter_range(&element_filter, elements_start, elements_end);
        debug_assert_eq!(kept, kept_elements);
        self.resize(result);
        result
    }

    fn deserialize_entries<'a>(&mut self, mut pos: &'a [u8], count: usize) -> Result<&'a [u8]> {
        for _ in 0..count {
            pos = self.keys.deserialize_and_append(pos)?;
            pos = self.values.deserialize_and_append(pos)?;
        }
        Ok(pos)
    }
}

impl Column for MapColumn {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn get_name(&self) -> &'static str {
        NAME
    }

    fn size(&self) -> usize {
        self.offsets.size() - 1
    }

    fn capacity(&self) -> usize {
        self.offsets.capacity() - 1
    }

    fn check_or_die(&self) {
        let last = self.last_offset() as usize;
        assert_eq!(self.offsets.get_data()[0], 0, "first map offset must be 0");
        assert!(
            self.offsets.get_data().windows(2).all(|w| w[0] <= w[1]),
            "map offsets must be non-decreasing"
        );
        assert_eq!(last, self.keys.size(), "last map offset must equal key count");
        assert_eq!(last, self.values.size(), "last map offset must equal value count");
        assert!(self.keys.is_nullable(), "map keys must be nullable");
        assert!(self.values.is_nullable(), "map values must be nullable");
        self.offsets.check_or_die();
        self.keys.check_or_die();
        self.values.check_or_die();
    }

    fn raw_data(&self) -> Vec<u8> {
        panic!("Don't support map column raw_data");
    }

    fn byte_size_range(&self, from: usize, size: usize) -> usize {
        assert!(from + size <= self.size(), "range error");
        let start = self.offset(from);
        let len = self.offset(from + size) - start;
        self.keys.byte_size_range(start, len)
            + self.values.byte_size_range(start, len)
            + self.offsets.byte_size_range(from, size)
    }

    fn byte_size_at(&self, idx: usize) -> usize {
        let (start, len) = self.span(idx);
        self.keys.byte_size_range(start, len)
            + self.values.byte_size_range(start, len)
            + std::mem::size_of::<u32>()
    }

    fn element_memory_usage(&self, from: usize, size: usize) -> usize {
        assert!(from + size <= self.size(), "range error");
        let start = self.offset(from);
        let len = self.offset(from + size) - start;
        self.keys.element_memory_usage(start, len)
            + self.values.element_memory_usage(start, len)
            + self.offsets.element_memory_usage(from, size)
    }

    fn reserve(&mut self, n: usize) {
        self.offsets.reserve(n + 1);
    }

    fn resize(&mut self, n: usize) {
        let last = self.last_offset();
        self.offsets.get_data_mut().resize(n + 1, last);
        let elements = self.last_offset() as usize;
        self.keys.resize(elements);
        self.values.resize(elements);
    }

    fn assign(&mut self, n: usize, idx: usize) {
        assert!(idx < self.size(), "range error when assigning map column");
        let mut desc = MapColumn::new(
            self.keys.clone_empty(),
            self.values.clone_empty(),
            UInt32Column::new(),
        );
        desc.append_value_multiple_times(self, idx, n);
        self.swap_column(&mut desc);
    }

    fn append_datum(&mut self, datum: &Datum) {
        let map = match datum {
            Datum::Map(m) => m,
            Datum::Null => {
                self.append_default(1);
                return;
            }
            other => panic!("map column cannot append {:?}", other),
        };
        for (k, v) in map {
            self.keys.append_datum(&k.to_datum());
            self.values.append_datum(v);
        }
        self.push_offset(map.len());
    }

    // Copies the elements of all `count` rows in one call per child, then
    // replays the source's row lengths onto our offsets.
    fn append(&mut self, src: &dyn Column, offset: usize, count: usize) {
        let src = down_cast::<MapColumn>(src);
        let src_offsets = src.offsets.get_data();
        let src_start = src_offsets[offset] as usize;
        let src_len = src_offsets[offset + count] as usize - src_start;

        self.keys.append(src.keys(), src_start, src_len);
        self.values.append(src.values(), src_start, src_len);

        let data = self.offsets.get_data_mut();
        data.reserve(count);
        for i in offset..offset + count {
            let len = src_offsets[i + 1] - src_offsets[i];
            let next = data[data.len() - 1] + len;
            data.push(next);
        }
    }

    fn append_selective(&mut self, src: &dyn Column, indexes: &[u32], from: usize, size: usize) {
        for idx in &indexes[from..from + size] {
            self.append(src, *idx as usize, 1);
        }
    }

    fn append_value_multiple_times(&mut self, src: &dyn Column, index: usize, count: usize) {
        for _ in 0..count {
            self.append(src, index, 1);
        }
    }

    fn append_datum_multiple_times(&mut self, datum: &Datum, count: usize) {
        for _ in 0..count {
            self.append_datum(datum);
        }
    }

    // Nulls and defaults are both empty maps here; see the module comment.
    fn append_nulls(&mut self, count: usize) -> bool {
        self.append_default(count);
        true
    }

    fn append_default(&mut self, count: usize) {
        let last = self.last_offset();
        self.offsets
            .get_data_mut()
            .extend(std::iter::repeat(last).take(count));
    }

    fn fill_default(&mut self, filter: &[u8]) -> Result<()> {
        let indexes = filter
            .iter()
            .take(self.size())
            .enumerate()
            .filter(|(i, f)| filter_keep(**f) && self.get_map_size(*i) > 0)
            .map(|(i, _)| i as u32)
            .collect::<Vec<u32>>();
        let mut defaults = MapColumn::new(
            self.keys.clone_empty(),
            self.values.clone_empty(),
            UInt32Column::new(),
        );
        defaults.append_default(indexes.len());
        self.update_rows(&defaults, &indexes)
    }

    // When every replacement row has the same element count as the row it
    // replaces, the children are updated in place and the offsets stay put.
    // Otherwise the column is rebuilt around the replacements and swapped in.
    fn update_rows(&mut self, src: &dyn Column, indexes: &[u32]) -> Result<()> {
        let src = down_cast::<MapColumn>(src);
        let replace_num = src.size();
        if indexes.len() != replace_num {
            return Err(SizeMismatch {
                column: NAME,
                expected: indexes.len(),
                actual: replace_num,
            }
            .into());
        }
        debug_assert!(indexes.windows(2).all(|w| w[0] < w[1]));

        let need_resize = indexes
            .iter()
            .enumerate()
            .any(|(i, idx)| self.get_map_size(*idx as usize) != src.get_map_size(i));

        if !need_resize {
            let mut element_idxes = Vec::with_capacity(src.keys.size());
            for (i, idx) in indexes.iter().enumerate() {
                let start = self.offset(*idx as usize) as u32;
                let len = src.get_map_size(i) as u32;
                element_idxes.extend(start..start + len);
            }
            self.keys.update_rows(src.keys(), &element_idxes)?;
            self.values.update_rows(src.values(), &element_idxes)?;
        } else {
            debug!(rows = self.size(), replace_num, "rebuilding map column for update");
            let mut rebuilt = MapColumn::new(
                self.keys.clone_empty(),
                self.values.clone_empty(),
                UInt32Column::new(),
            );
            rebuilt.reserve(self.size());
            let mut idx_begin = 0;
            for (i, idx) in indexes.iter().enumerate() {
                let idx = *idx as usize;
                rebuilt.append(self, idx_begin, idx - idx_begin);
                rebuilt.append(src, i, 1);
                idx_begin = idx + 1;
            }
            let remain = self.size() - idx_begin;
            if remain > 0 {
                rebuilt.append(self, idx_begin, remain);
            }
            self.swap_column(&mut rebuilt);
        }
        Ok(())
    }

    fn filter_range(&mut self, filter: &[u8], from: usize, to: usize) -> usize {
        self.filter_range_with_kernel(FilterKernel::detect(), filter, from, to)
    }

    // Maps have no order.
    fn compare_at(&self, _left: usize, _right: usize, _rhs: &dyn Column, _nan_direction_hint: i32) -> i32 {
        -1
    }

    fn fnv_hash_at(&self, hash: &mut u32, idx: usize) {
        let (start, len) = self.span(idx);
        *hash = fnv_hash(&(len as u64).to_le_bytes(), *hash);
        for e in start..start + len {
            self.keys.fnv_hash_at(hash, e);
            self.values.fnv_hash_at(hash, e);
        }
    }

    fn crc32_hash_at(&self, hash: &mut u32, idx: usize) {
        let (start, len) = self.span(idx);
        *hash = crc32_hash(&(len as u64).to_le_bytes(), *hash);
        for e in start..start + len {
            self.keys.crc32_hash_at(hash, e);
            self.values.crc32_hash_at(hash, e);
        }
    }

    fn xor_checksum(&self, from: usize, to: usize) -> i64 {
        let mut checksum = (from..to).fold(0_i64, |acc, i| acc ^ self.get_map_size(i) as i64);
        let element_from = self.offset(from);
        let element_to = self.offset(to);
        checksum ^= self.keys.xor_checksum(element_from, element_to);
        checksum ^ self.values.xor_checksum(element_from, element_to)
    }

    // [u32 element count][key 0][value 0][key 1][value 1]...
    fn serialize(&self, idx: usize, pos: &mut [u8]) -> u32 {
        let (start, len) = self.span(idx);
        pos[..COUNT_SIZE].copy_from_slice(&(len as u32).to_le_bytes());
        let mut ser_size = COUNT_SIZE as u32;
        for e in start..start + len {
            ser_size += self.keys.serialize(e, &mut pos[ser_size as usize..]);
            ser_size += self.values.serialize(e, &mut pos[ser_size as usize..]);
        }
        ser_size
    }

    fn serialize_default(&self, pos: &mut [u8]) -> u32 {
        pos[..COUNT_SIZE].copy_from_slice(&0_u32.to_le_bytes());
        COUNT_SIZE as u32
    }

    fn serialize_size(&self, idx: usize) -> u32 {
        let (start, len) = self.span(idx);
        (start..start + len).fold(COUNT_SIZE as u32, |size, e| {
            size + self.keys.serialize_size(e) + self.values.serialize_size(e)
        })
    }

    // A row that fails to decode part way leaves the column as it was.
    fn deserialize_and_append<'a>(&mut self, pos: &'a [u8]) -> Result<&'a [u8]> {
        if pos.len() < COUNT_SIZE {
            return Err(Truncated {
                column: NAME,
                needed: COUNT_SIZE,
                remaining: pos.len(),
            }
            .into());
        }
        let count = u32::from_le_bytes([pos[0], pos[1], pos[2], pos[3]]) as usize;
        let elements = self.last_offset() as usize;
        match self.deserialize_entries(&pos[COUNT_SIZE..], count) {
            Ok(rest) => {
                self.push_offset(count);
                Ok(rest)
            }
            Err(e) => {
                self.keys.resize(elements);
                self.values.resize(elements);
                Err(e)
            }
        }
    }

    fn put_row_buffer(&self, buf: &mut RowBuffer, idx: usize) {
        let (start, len) = self.span(idx);
        buf.begin_push_bracket();
        for e in start..start + len {
            if e > start {
                buf.separator(',');
            }
            self.keys.put_row_buffer(buf, e);
            buf.separator(':');
            self.values.put_row_buffer(buf, e);
        }
        buf.finish_push_bracket();
    }

    fn get(&self, idx: usize) -> Datum {
        let (start, len) = self.span(idx);
        let mut res = DatumMap::new();
        for e in start..start + len {
            if !self.keys.is_null(e) {
                res.insert(self.keys.get(e).to_key(), self.values.get(e));
            }
        }
        Datum::Map(res)
    }

    fn debug_item(&self, idx: usize) -> String {
        let (start, len) = self.span(idx);
        let items = (start..start + len)
            .map(|e| format!("{}:{}", self.keys.debug_item(e), self.values.debug_item(e)))
            .collect::<Vec<String>>();
        format!("{{{}}}", items.join(", "))
    }

    fn debug_string(&self) -> String {
        (0..self.size())
            .map(|i| self.debug_item(i))
            .collect::<Vec<String>>()
            .join(", ")
    }

    fn clone_empty(&self) -> ColumnBox {
        Box::new(MapColumn::new(
            self.keys.clone_empty(),
            self.values.clone_empty(),
            UInt32Column::new(),
        ))
    }

    fn clone_column(&self) -> ColumnBox {
        Box::new(MapColumn::new(
            self.keys.clone_column(),
            self.values.clone_column(),
            self.offsets.clone(),
        ))
    }

    fn swap_column(&mut self, rhs: &mut dyn Column) {
        let rhs = down_cast_mut::<MapColumn>(rhs);
        std::mem::swap(&mut self.offsets, &mut rhs.offsets);
        std::mem::swap(&mut self.keys, &mut rhs.keys);
        std::mem::swap(&mut self.values, &mut rhs.values);
    }

    fn reset_column(&mut self) {
        self.offsets.get_data_mut().truncate(1);
        self.keys.reset_column();
        self.values.reset_column();
    }

    // Offsets index the element space as u32, so they cannot be widened on
    // their own; only the children get the chance to.
    fn upgrade_if_overflow(&mut self) -> Result<Option<ColumnBox>> {
        check_capacity(NAME, self.offsets.size(), MAX_CAPACITY_LIMIT)?;
        upgrade_helper(&mut self.keys)?;
        upgrade_helper(&mut self.values)?;
        Ok(None)
    }

    fn downgrade(&mut self) -> Result<Option<ColumnBox>> {
        downgrade_helper(&mut self.keys)?;
        downgrade_helper(&mut self.values)?;
        Ok(None)
    }

    fn has_large_column(&self) -> bool {
        self.keys.has_large_column() || self.values.has_large_column()
    }
}
