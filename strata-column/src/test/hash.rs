use super::{abc_column, map_column_of, random_map_column};
use crate::{
    crc32_hash, fnv_hash, BinaryColumn, Column, Int32Column, MapColumn, NullableColumn,
    UInt32Column, FNV_SEED, NULL_HASH_SEED,
};
use test_log::test;

#[test]
fn test_fnv_known_value() {
    assert_eq!(fnv_hash(b"", FNV_SEED), FNV_SEED);
    assert_eq!(fnv_hash(b"a", FNV_SEED), 0xe40c_292c);
}

#[test]
fn test_crc32_known_value_and_chaining() {
    assert_eq!(crc32_hash(b"123456789", 0), 0xcbf4_3926);
    assert_eq!(
        crc32_hash(b"6789", crc32_hash(b"12345", 0)),
        crc32_hash(b"123456789", 0)
    );
}

#[test]
fn test_map_row_hash_layout() {
    let col = abc_column();

    let mut h = FNV_SEED;
    col.fnv_hash_at(&mut h, 0);
    let mut expect = fnv_hash(&2_u64.to_le_bytes(), FNV_SEED);
    expect = fnv_hash(&1_i32.to_le_bytes(), expect);
    expect = fnv_hash(b"a", expect);
    expect = fnv_hash(&2_i32.to_le_bytes(), expect);
    expect = fnv_hash(b"b", expect);
    assert_eq!(h, expect);

    let mut h = 0;
    col.crc32_hash_at(&mut h, 2);
    let mut expect = crc32_hash(&1_u64.to_le_bytes(), 0);
    expect = crc32_hash(&3_i32.to_le_bytes(), expect);
    expect = crc32_hash(b"c", expect);
    assert_eq!(h, expect);

    let mut h = FNV_SEED;
    col.fnv_hash_at(&mut h, 1);
    assert_eq!(h, fnv_hash(&0_u64.to_le_bytes(), FNV_SEED));
}

#[test]
fn test_null_entries_hash_seed() {
    let keys = NullableColumn::wrap(Box::new(Int32Column::from_vec(vec![1])));
    let values = NullableColumn::new(Box::new(BinaryColumn::from_slices([&b""[..]])), vec![1]);
    let col = MapColumn::new(
        Box::new(keys),
        Box::new(values),
        UInt32Column::from_vec(vec![0, 1]),
    );
    let mut h = FNV_SEED;
    col.fnv_hash_at(&mut h, 0);
    let mut expect = fnv_hash(&1_u64.to_le_bytes(), FNV_SEED);
    expect = fnv_hash(&1_i32.to_le_bytes(), expect);
    expect = fnv_hash(&NULL_HASH_SEED.to_le_bytes(), expect);
    assert_eq!(h, expect);
}

#[test]
fn test_equal_rows_hash_equal() {
    let col = map_column_of(&[&[(1, "a")], &[(2, "b")], &[(1, "a")]]);
    let mut hashes = vec![FNV_SEED; 3];
    col.fnv_hash(&mut hashes, 0, 3);
    assert_eq!(hashes[0], hashes[2]);
    assert_ne!(hashes[0], hashes[1]);

    let mut crcs = vec![0; 3];
    col.crc32_hash(&mut crcs, 0, 3);
    assert_eq!(crcs[0], crcs[2]);
    assert_ne!(crcs[0], crcs[1]);

    // Only the range is touched.
    let mut partial = vec![7; 3];
    col.fnv_hash(&mut partial, 1, 2);
    assert_eq!(partial[0], 7);
    assert_eq!(partial[2], 7);
}

#[test]
fn test_xor_checksum_ignores_row_order() {
    let a = map_column_of(&[&[(1, "a"), (2, "b")], &[], &[(3, "c")]]);
    let b = map_column_of(&[&[(3, "c")], &[(1, "a"), (2, "b")], &[]]);
    assert_eq!(a.xor_checksum(0, 3), b.xor_checksum(0, 3));
    assert_ne!(a.xor_checksum(0, 3), 0);
}

#[test]
fn test_xor_checksum_detects_changes() {
    let a = abc_column();
    let b = map_column_of(&[&[(1, "a"), (2, "x")], &[], &[(3, "c")]]);
    assert_ne!(a.xor_checksum(0, 3), b.xor_checksum(0, 3));

    let mut state = 8;
    let col = random_map_column(&mut state, 50);
    let whole = col.xor_checksum(0, 50);
    assert_eq!(whole, col.xor_checksum(0, 20) ^ col.xor_checksum(20, 50));
}
