use crate::{datum::Datum, row_buffer::RowBuffer};
use std::any::Any;
use strata_base::{CapacityExceeded, Result};
use tracing::debug;

/// One byte per row (or per element); nonzero keeps the row.
pub type Filter = Vec<u8>;

pub type ColumnBox = Box<dyn Column>;

/// Hard ceiling on the number of rows (and offset entries) any column holds.
pub const MAX_CAPACITY_LIMIT: usize = u32::MAX as usize;

/// The capability set every column variant provides. Nested columns
/// implement each operation by recursing into their children through this
/// same interface, so maps of maps (of anything) compose without the outer
/// column knowing the inner types.
///
/// Operations that take a `src: &dyn Column` expect `src` to be the same
/// variant as `self` (nullable columns also accept their data variant);
/// anything else is a caller bug and panics.
pub trait Column: std::fmt::Debug + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn get_name(&self) -> &'static str;

    fn size(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.size() == 0
    }
    fn capacity(&self) -> usize;

    fn is_nullable(&self) -> bool {
        false
    }
    fn is_null(&self, _idx: usize) -> bool {
        false
    }
    fn has_null(&self) -> bool {
        false
    }

    /// Asserts structural invariants, recursively. Only meant for debug and
    /// verification paths: a failure here is fatal.
    fn check_or_die(&self);

    /// Contiguous fixed-stride image of the column. Nested variable-length
    /// columns have none and panic.
    fn raw_data(&self) -> Vec<u8>;

    fn byte_size(&self) -> usize {
        self.byte_size_range(0, self.size())
    }
    fn byte_size_range(&self, from: usize, size: usize) -> usize;
    fn byte_size_at(&self, idx: usize) -> usize;
    fn element_memory_usage(&self, from: usize, size: usize) -> usize {
        self.byte_size_range(from, size)
    }

    fn reserve(&mut self, n: usize);
    fn resize(&mut self, n: usize);
    /// Replaces the whole column with `n` copies of row `idx`.
    fn assign(&mut self, n: usize, idx: usize);

    fn append_datum(&mut self, datum: &Datum);
    fn append(&mut self, src: &dyn Column, offset: usize, count: usize);
    fn append_selective(&mut self, src: &dyn Column, indexes: &[u32], from: usize, size: usize);
    fn append_value_multiple_times(&mut self, src: &dyn Column, index: usize, count: usize);
    fn append_datum_multiple_times(&mut self, datum: &Datum, count: usize) {
        for _ in 0..count {
            self.append_datum(datum);
        }
    }
    /// Returns false when the column cannot represent nulls.
    fn append_nulls(&mut self, count: usize) -> bool;
    fn append_default(&mut self, count: usize);
    fn fill_default(&mut self, filter: &[u8]) -> Result<()>;

    /// Overwrites row `indexes[i]` with row `i` of `src`. `indexes` is
    /// strictly increasing and as long as `src`.
    fn update_rows(&mut self, src: &dyn Column, indexes: &[u32]) -> Result<()>;

    /// Keeps the rows in `[from, to)` whose filter byte is nonzero, shifting
    /// survivors down. Returns the new size.
    fn filter_range(&mut self, filter: &[u8], from: usize, to: usize) -> usize;
    fn filter(&mut self, filter: &[u8]) -> usize {
        let to = self.size();
        self.filter_range(filter, 0, to)
    }

    fn compare_at(&self, left: usize, right: usize, rhs: &dyn Column, nan_direction_hint: i32) -> i32;

    fn fnv_hash_at(&self, hash: &mut u32, idx: usize);
    fn crc32_hash_at(&self, hash: &mut u32, idx: usize);
    fn fnv_hash(&self, hashes: &mut [u32], from: usize, to: usize) {
        for i in from..to {
            self.fnv_hash_at(&mut hashes[i], i);
        }
    }
    fn crc32_hash(&self, hashes: &mut [u32], from: usize, to: usize) {
        for i in from..to {
            self.crc32_hash_at(&mut hashes[i], i);
        }
    }
    fn xor_checksum(&self, from: usize, to: usize) -> i64;

    /// Writes row `idx` at the start of `pos`, returning the bytes written.
    /// `pos` must hold at least `serialize_size(idx)` bytes.
    fn serialize(&self, idx: usize, pos: &mut [u8]) -> u32;
    fn serialize_default(&self, pos: &mut [u8]) -> u32;
    fn serialize_size(&self, idx: usize) -> u32;
    fn max_one_element_serialize_size(&self) -> u32 {
        (0..self.size())
            .map(|i| self.serialize_size(i))
            .max()
            .unwrap_or(0)
    }
    /// Row `i` lands at `dst[i * max_one_row_size + slice_sizes[i]..]`, and
    /// `slice_sizes[i]` grows by the bytes written.
    fn serialize_batch(
        &self,
        dst: &mut [u8],
        slice_sizes: &mut [u32],
        chunk_size: usize,
        max_one_row_size: u32,
    ) {
        for i in 0..chunk_size {
            let start = i * max_one_row_size as usize + slice_sizes[i] as usize;
            slice_sizes[i] += self.serialize(i, &mut dst[start..]);
        }
    }
    /// Decodes one row from the front of `pos`, returning the rest.
    fn deserialize_and_append<'a>(&mut self, pos: &'a [u8]) -> Result<&'a [u8]>;
    fn deserialize_and_append_batch<'a>(&mut self, srcs: &mut [&'a [u8]], chunk_size: usize) -> Result<()> {
        self.reserve(self.size() + chunk_size);
        for src in srcs.iter_mut().take(chunk_size) {
            *src = self.deserialize_and_append(src)?;
        }
        Ok(())
    }

    fn put_row_buffer(&self, buf: &mut RowBuffer, idx: usize);

    fn get(&self, idx: usize) -> Datum;
    fn set_null(&mut self, _idx: usize) -> bool {
        false
    }

    fn debug_item(&self, idx: usize) -> String;
    fn debug_string(&self) -> String {
        let items = (0..self.size())
            .map(|i| self.debug_item(i))
            .collect::<Vec<String>>();
        format!("[{}]", items.join(", "))
    }

    fn clone_empty(&self) -> ColumnBox;
    fn clone_column(&self) -> ColumnBox;
    /// Exchanges contents with `rhs`, which must be the same variant.
    fn swap_column(&mut self, rhs: &mut dyn Column);
    fn reset_column(&mut self);

    /// `Ok(Some(col))` asks the owner to replace this column with `col`.
    fn upgrade_if_overflow(&mut self) -> Result<Option<ColumnBox>>;
    fn downgrade(&mut self) -> Result<Option<ColumnBox>>;
    fn has_large_column(&self) -> bool {
        false
    }
}

pub fn down_cast<T: Column>(col: &dyn Column) -> &T {
    match col.as_any().downcast_ref::<T>() {
        Some(t) => t,
        None => panic!(
            "expected {}, got {}",
            std::any::type_name::<T>(),
            col.get_name()
        ),
    }
}

pub fn down_cast_mut<T: Column>(col: &mut dyn Column) -> &mut T {
    let name = col.get_name();
    match col.as_any_mut().downcast_mut::<T>() {
        Some(t) => t,
        None => panic!("expected {}, got {}", std::any::type_name::<T>(), name),
    }
}

pub fn check_capacity(column: &'static str, len: usize, limit: usize) -> Result<()> {
    if len > limit {
        return Err(CapacityExceeded { column, limit, len }.into());
    }
    Ok(())
}

/// Runs `upgrade_if_overflow` on a boxed child and swaps in the widened
/// column if one comes back.
pub fn upgrade_helper(col: &mut ColumnBox) -> Result<()> {
    if let Some(upgraded) = col.upgrade_if_overflow()? {
        debug!(from = col.get_name(), to = upgraded.get_name(), "widened column");
        *col = upgraded;
    }
    Ok(())
}

pub fn downgrade_helper(col: &mut ColumnBox) -> Result<()> {
    if let Some(downgraded) = col.downgrade()? {
        debug!(from = col.get_name(), to = downgraded.get_name(), "narrowed column");
        *col = downgraded;
    }
    Ok(())
}
