use crate::{
    column::{down_cast_mut, downgrade_helper, upgrade_helper, Column, ColumnBox},
    datum::Datum,
    filter::{filter_keep, filter_vec_range},
    hash::{crc32_hash, fnv_hash, NULL_HASH_SEED},
    row_buffer::RowBuffer,
};
use std::any::Any;
use strata_base::{Result, SizeMismatch, Truncated};

const NULL_FLAG: u8 = 1;
const NOT_NULL_FLAG: u8 = 0;

/// Wraps any column with one null byte per row. The wrapped column keeps a
/// (default) placeholder at null positions so the two stay the same length.
#[derive(Debug)]
pub struct NullableColumn {
    data: ColumnBox,
    nulls: Vec<u8>,
    has_null: bool,
}

impl NullableColumn {
    pub fn new(data: ColumnBox, nulls: Vec<u8>) -> Self {
        assert_eq!(data.size(), nulls.len(), "null flags must cover every row");
        let has_null = nulls.iter().any(|n| *n != NOT_NULL_FLAG);
        NullableColumn {
            data,
            nulls,
            has_null,
        }
    }

    /// Wraps `data` with every row non-null.
    pub fn wrap(data: ColumnBox) -> Self {
        let nulls = vec![NOT_NULL_FLAG; data.size()];
        NullableColumn {
            data,
            nulls,
            has_null: false,
        }
    }

    pub fn data_column(&self) -> &dyn Column {
        self.data.as_ref()
    }

    pub fn null_flags(&self) -> &[u8] {
        &self.nulls
    }

    fn update_has_null(&mut self) {
        self.has_null = self.nulls.iter().any(|n| *n != NOT_NULL_FLAG);
    }

    // The source's data column and null flags; plain columns count as all
    // non-null.
    fn split_source(src: &dyn Column) -> (&dyn Column, Option<&[u8]>) {
        match src.as_any().downcast_ref::<NullableColumn>() {
            Some(n) => (n.data.as_ref(), Some(n.nulls.as_slice())),
            None => (src, None),
        }
    }
}

impl Column for NullableColumn {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn get_name(&self) -> &'static str {
        "nullable"
    }

    fn size(&self) -> usize {
        self.nulls.len()
    }

    fn capacity(&self) -> usize {
        self.nulls.capacity()
    }

    fn is_nullable(&self) -> bool {
        true
    }

    fn is_null(&self, idx: usize) -> bool {
        self.has_null && self.nulls[idx] != NOT_NULL_FLAG
    }

    fn has_null(&self) -> bool {
        self.has_null
    }

    fn check_or_die(&self) {
        assert_eq!(self.nulls.len(), self.data.size(), "null flags out of step with data");
        self.data.check_or_die();
    }

    fn raw_data(&self) -> Vec<u8> {
        self.data.raw_data()
    }

    fn byte_size_range(&self, from: usize, size: usize) -> usize {
        self.data.byte_size_range(from, size) + size
    }

    fn byte_size_at(&self, idx: usize) -> usize {
        self.data.byte_size_at(idx) + 1
    }

    fn reserve(&mut self, n: usize) {
        self.nulls.reserve(n.saturating_sub(self.nulls.len()));
        self.data.reserve(n);
    }

    fn resize(&mut self, n: usize) {
        self.nulls.resize(n, NOT_NULL_FLAG);
        self.data.resize(n);
        self.update_has_null();
    }

    fn assign(&mut self, n: usize, idx: usize) {
        let flag = self.nulls[idx];
        self.data.assign(n, idx);
        self.nulls = vec![flag; n];
        self.has_null = flag != NOT_NULL_FLAG && n > 0;
    }

    fn append_datum(&mut self, datum: &Datum) {
        if datum.is_null() {
            self.append_nulls(1);
        } else {
            self.data.append_datum(datum);
            self.nulls.push(NOT_NULL_FLAG);
        }
    }

    fn append(&mut self, src: &dyn Column, offset: usize, count: usize) {
        let (data, nulls) = Self::split_source(src);
        self.data.append(data, offset, count);
        match nulls {
            Some(flags) => {
                let flags = &flags[offset..offset + count];
                self.has_null |= flags.iter().any(|n| *n != NOT_NULL_FLAG);
                self.nulls.extend_from_slice(flags);
            }
            None => self
                .nulls
                .extend(std::iter::repeat(NOT_NULL_FLAG).take(count)),
        }
    }

    fn append_selective(&mut self, src: &dyn Column, indexes: &[u32], from: usize, size: usize) {
        let (data, nulls) = Self::split_source(src);
        self.data.append_selective(data, indexes, from, size);
        for idx in &indexes[from..from + size] {
            let flag = nulls.map_or(NOT_NULL_FLAG, |n| n[*idx as usize]);
            self.has_null |= flag != NOT_NULL_FLAG;
            self.nulls.push(flag);
        }
    }

    fn append_value_multiple_times(&mut self, src: &dyn Column, index: usize, count: usize) {
        let (data, nulls) = Self::split_source(src);
        let flag = nulls.map_or(NOT_NULL_FLAG, |n| n[index]);
        self.data.append_value_multiple_times(data, index, count);
        self.has_null |= flag != NOT_NULL_FLAG && count > 0;
        self.nulls.extend(std::iter::repeat(flag).take(count));
    }

    fn append_nulls(&mut self, count: usize) -> bool {
        self.data.append_default(count);
        self.nulls.extend(std::iter::repeat(NULL_FLAG).take(count));
        self.has_null |= count > 0;
        true
    }

    fn append_default(&mut self, count: usize) {
        self.append_nulls(count);
    }

    fn fill_default(&mut self, filter: &[u8]) -> Result<()> {
        for (n, f) in self.nulls.iter_mut().zip(filter) {
            if filter_keep(*f) {
                *n = NULL_FLAG;
                self.has_null = true;
            }
        }
        self.data.fill_default(filter)
    }

    fn update_rows(&mut self, src: &dyn Column, indexes: &[u32]) -> Result<()> {
        if src.size() != indexes.len() {
            return Err(SizeMismatch {
                column: "nullable",
                expected: indexes.len(),
                actual: src.size(),
            }
            .into());
        }
        let (data, nulls) = Self::split_source(src);
        self.data.update_rows(data, indexes)?;
        for (i, idx) in indexes.iter().enumerate() {
            self.nulls[*idx as usize] = nulls.map_or(NOT_NULL_FLAG, |n| n[i]);
        }
        self.update_has_null();
        Ok(())
    }

    fn filter_range(&mut self, filter: &[u8], from: usize, to: usize) -> usize {
        let kept = filter_vec_range(&mut self.nulls, filter, from, to);
        let data_kept = self.data.filter_range(filter, from, to);
        debug_assert_eq!(kept, data_kept);
        self.update_has_null();
        kept
    }

    fn compare_at(&self, left: usize, right: usize, rhs: &dyn Column, nan_direction_hint: i32) -> i32 {
        let (rhs_data, rhs_nulls) = Self::split_source(rhs);
        let l_null = self.is_null(left);
        let r_null = rhs_nulls.is_some_and(|n| n[right] != NOT_NULL_FLAG);
        match (l_null, r_null) {
            (true, true) => 0,
            (true, false) => nan_direction_hint,
            (false, true) => -nan_direction_hint,
            (false, false) => self
                .data
                .compare_at(left, right, rhs_data, nan_direction_hint),
        }
    }

    fn fnv_hash_at(&self, hash: &mut u32, idx: usize) {
        if self.is_null(idx) {
            *hash = fnv_hash(&NULL_HASH_SEED.to_le_bytes(), *hash);
        } else {
            self.data.fnv_hash_at(hash, idx);
        }
    }

    fn crc32_hash_at(&self, hash: &mut u32, idx: usize) {
        if self.is_null(idx) {
            *hash = crc32_hash(&NULL_HASH_SEED.to_le_bytes(), *hash);
        } else {
            self.data.crc32_hash_at(hash, idx);
        }
    }

    fn xor_checksum(&self, from: usize, to: usize) -> i64 {
        if !self.has_null {
            return self.data.xor_checksum(from, to);
        }
        let mut acc = 0_i64;
        for i in from..to {
            acc ^= self.nulls[i] as i64;
            if self.nulls[i] == NOT_NULL_FLAG {
                acc ^= self.data.xor_checksum(i, i + 1);
            }
        }
        acc
    }

    fn serialize(&self, idx: usize, pos: &mut [u8]) -> u32 {
        if self.is_null(idx) {
            pos[0] = NULL_FLAG;
            return 1;
        }
        pos[0] = NOT_NULL_FLAG;
        1 + self.data.serialize(idx, &mut pos[1..])
    }

    fn serialize_default(&self, pos: &mut [u8]) -> u32 {
        pos[0] = NULL_FLAG;
        1
    }

    fn serialize_size(&self, idx: usize) -> u32 {
        if self.is_null(idx) {
            1
        } else {
            1 + self.data.serialize_size(idx)
        }
    }

    fn deserialize_and_append<'a>(&mut self, pos: &'a [u8]) -> Result<&'a [u8]> {
        let Some((flag, rest)) = pos.split_first() else {
            return Err(Truncated {
                column: "nullable",
                needed: 1,
                remaining: 0,
            }
            .into());
        };
        if *flag != NOT_NULL_FLAG {
            self.append_nulls(1);
            return Ok(rest);
        }
        let rest = self.data.deserialize_and_append(rest)?;
        self.nulls.push(NOT_NULL_FLAG);
        Ok(rest)
    }

    fn put_row_buffer(&self, buf: &mut RowBuffer, idx: usize) {
        if self.is_null(idx) {
            buf.push_null();
        } else {
            self.data.put_row_buffer(buf, idx);
        }
    }

    fn get(&self, idx: usize) -> Datum {
        if self.is_null(idx) {
            Datum::Null
        } else {
            self.data.get(idx)
        }
    }

    fn set_null(&mut self, idx: usize) -> bool {
        self.nulls[idx] = NULL_FLAG;
        self.has_null = true;
        true
    }

    fn debug_item(&self, idx: usize) -> String {
        if self.is_null(idx) {
            "NULL".to_string()
        } else {
            self.data.debug_item(idx)
        }
    }

    fn clone_empty(&self) -> ColumnBox {
        Box::new(NullableColumn::wrap(self.data.clone_empty()))
    }

    fn clone_column(&self) -> ColumnBox {
        Box::new(NullableColumn {
            data: self.data.clone_column(),
            nulls: self.nulls.clone(),
            has_null: self.has_null,
        })
    }

    fn swap_column(&mut self, rhs: &mut dyn Column) {
        std::mem::swap(self, down_cast_mut::<Self>(rhs));
    }

    fn reset_column(&mut self) {
        self.data.reset_column();
        self.nulls.clear();
        self.has_null = false;
    }

    fn upgrade_if_overflow(&mut self) -> Result<Option<ColumnBox>> {
        upgrade_helper(&mut self.data)?;
        Ok(None)
    }

    fn downgrade(&mut self) -> Result<Option<ColumnBox>> {
        downgrade_helper(&mut self.data)?;
        Ok(None)
    }

    fn has_large_column(&self) -> bool {
        self.data.has_large_column()
    }
}
