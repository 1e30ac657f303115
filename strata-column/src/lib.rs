// In-memory columns for a vectorized engine.
//
// A chunk of rows is a set of columns, each implementing the `Column`
// trait. Scalars live in `FixedLengthColumn`s, byte strings in
// `BinaryColumn`s (widened to `LargeBinaryColumn` when their byte heap
// outgrows u32 offsets), and `NullableColumn` layers one null byte per row
// over any of them.
//
// `MapColumn` is the nested case: one offsets column over two nullable child
// columns (keys and values) holding every row's entries back to back. All of
// its operations recurse into the children through `Column`, so maps nest to
// any depth.
//
// Filtering a nested column is a two-step affair: a row pass
// (`filter::compact_offsets`) compacts the offsets and marks the surviving
// element spans in an element filter, then each child filters itself with
// that. The row pass has a lane-at-a-time kernel, with AVX2 used for the
// lane masks when available.
//
// Rows serialize to a self-delimiting little-endian form and hash into
// caller-supplied running u32 seeds (FNV-1a or CRC-32), so an outer
// operator can hash or spill a row of any shape without knowing it.

mod binary;
mod column;
mod datum;
mod filter;
mod fixed;
mod hash;
mod map;
mod nullable;
mod row_buffer;
mod shared;


pub use binary::{
    BinaryColumn, BinaryColumnBase, BinaryOffset, LargeBinaryColumn, BINARY_OFFSET_LIMIT,
    BINARY_UPGRADE_THRESHOLD,
};
pub use column::{
    check_capacity, down_cast, down_cast_mut, downgrade_helper, upgrade_helper, Column,
    ColumnBox, Filter, MAX_CAPACITY_LIMIT,
};
pub use datum::{Datum, DatumKey, DatumMap};
pub use filter::{build_selective, compact_offsets, filter_keep, FilterKernel, FILTER_LANE_WIDTH};
pub use fixed::{
    DoubleColumn, FixedLengthColumn, FixedValue, FloatColumn, Int16Column, Int32Column,
    Int64Column, Int8Column, UInt32Column,
};
pub use hash::{crc32_hash, fnv_hash, FNV_PRIME, FNV_SEED, NULL_HASH_SEED};
pub use map::MapColumn;
pub use nullable::NullableColumn;
pub use row_buffer::RowBuffer;
pub use shared::{make_exclusive, SharedColumn};
