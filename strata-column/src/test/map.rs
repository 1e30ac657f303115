use super::{abc_column, map_column_of, map_datum, new_map_column, rows_of};
use crate::{
    BinaryColumn, Column, Datum, DatumKey, DatumMap, Int32Column, MapColumn, NullableColumn,
    RowBuffer, UInt32Column,
};
use test_log::test;

#[test]
fn test_offsets_layout() {
    let col = abc_column();
    assert_eq!(col.size(), 3);
    assert_eq!(col.offsets().get_data(), &[0, 2, 2, 3]);
    assert_eq!(col.keys().size(), 3);
    assert_eq!(col.values().size(), 3);
    assert_eq!(col.get_map_size(0), 2);
    assert_eq!(col.get_map_size(1), 0);
    assert_eq!(col.get_map_size(2), 1);
    assert!(col.keys().is_nullable());
    assert!(col.values().is_nullable());
    col.check_or_die();
}

#[test]
fn test_get() {
    let col = abc_column();
    assert_eq!(col.get(0), map_datum(&[(1, "a"), (2, "b")]));
    assert_eq!(col.get(1), Datum::Map(DatumMap::new()));
    assert_eq!(col.get(2), map_datum(&[(3, "c")]));
}

#[test]
fn test_get_skips_null_keys_keeps_null_values() {
    let keys = NullableColumn::new(Box::new(Int32Column::from_vec(vec![1, 0, 7])), vec![0, 1, 0]);
    let values = NullableColumn::new(
        Box::new(BinaryColumn::from_slices([&b"a"[..], &b"z"[..], &b""[..]])),
        vec![0, 0, 1],
    );
    let col = MapColumn::new(
        Box::new(keys),
        Box::new(values),
        UInt32Column::from_vec(vec![0, 3]),
    );
    col.check_or_die();
    let mut expect = DatumMap::new();
    expect.insert(DatumKey::from(1), Datum::from("a"));
    expect.insert(DatumKey::from(7), Datum::Null);
    assert_eq!(col.get(0), Datum::Map(expect));
    assert_eq!(col.get_map_size(0), 3);
}

#[test]
fn test_byte_sizes() {
    let col = abc_column();
    // Keys: 2 int32 + 2 null bytes. Values: "a", "b" + 2 offsets + 2 null
    // bytes. Plus the row's own offset.
    assert_eq!(col.byte_size_at(0), (8 + 2) + (2 + 8 + 2) + 4);
    assert_eq!(col.byte_size_at(1), 4);
    assert_eq!(col.byte_size_range(0, 3), (12 + 3) + (3 + 12 + 3) + 12);
    assert_eq!(col.byte_size(), col.byte_size_range(0, 3));
    assert_eq!(col.element_memory_usage(0, 3), col.byte_size_range(0, 3));
    assert_eq!(col.byte_size_range(1, 1), 4);
}

#[test]
fn test_append_datum_null_is_empty_map() {
    let mut col = abc_column();
    col.append_datum(&Datum::Null);
    assert_eq!(col.size(), 4);
    assert_eq!(col.get(3), Datum::Map(DatumMap::new()));
    assert_eq!(col.offsets().get_data(), &[0, 2, 2, 3, 3]);
}

#[test]
fn test_append_is_associative() {
    let src = abc_column();
    let mut whole = new_map_column();
    whole.append(&src, 0, 3);

    let mut pieces = new_map_column();
    pieces.append(&src, 0, 1);
    pieces.append(&src, 1, 2);

    assert_eq!(whole.offsets().get_data(), pieces.offsets().get_data());
    assert_eq!(rows_of(&whole), rows_of(&pieces));
    assert_eq!(rows_of(&whole), rows_of(&src));
    pieces.check_or_die();
}

#[test]
fn test_append_onto_nonempty() {
    let mut col = map_column_of(&[&[(9, "z")]]);
    let src = abc_column();
    col.append(&src, 1, 2);
    assert_eq!(col.offsets().get_data(), &[0, 1, 1, 2]);
    assert_eq!(col.get(2), map_datum(&[(3, "c")]));
    col.check_or_die();
}

#[test]
fn test_append_selective_and_repeated() {
    let src = abc_column();
    let mut col = new_map_column();
    col.append_selective(&src, &[2, 0, 2], 1, 2);
    assert_eq!(rows_of(&col), vec![src.get(0), src.get(2)]);

    col.append_value_multiple_times(&src, 0, 2);
    assert_eq!(col.size(), 4);
    assert_eq!(col.get(3), src.get(0));
    assert_eq!(col.offsets().get_data(), &[0, 2, 3, 5, 7]);

    col.append_datum_multiple_times(&map_datum(&[(4, "d")]), 3);
    assert_eq!(col.size(), 7);
    assert_eq!(col.get(6), map_datum(&[(4, "d")]));
    col.check_or_die();
}

#[test]
fn test_empty_operations_change_nothing() {
    let mut col = abc_column();
    let before = rows_of(&col);
    assert!(col.append_nulls(0));
    col.append_default(0);
    col.append(&abc_column(), 1, 0);
    col.append_selective(&abc_column(), &[0, 1], 0, 0);
    assert_eq!(col.filter(&[1, 1, 1]), 3);
    assert_eq!(col.offsets().get_data(), &[0, 2, 2, 3]);
    assert_eq!(rows_of(&col), before);
}

#[test]
fn test_nulls_and_defaults_are_empty_maps() {
    let mut col = abc_column();
    assert!(col.append_nulls(2));
    col.append_default(1);
    assert_eq!(col.offsets().get_data(), &[0, 2, 2, 3, 3, 3, 3]);
    assert!(!col.is_null(3));
    assert!(!col.set_null(0));
    assert_eq!(col.get(0), map_datum(&[(1, "a"), (2, "b")]));
}

#[test]
fn test_nullable_map() {
    let mut col = NullableColumn::wrap(Box::new(new_map_column()));
    col.append_datum(&map_datum(&[(1, "a")]));
    col.append_datum(&Datum::Null);
    assert!(col.is_null(1));
    assert_eq!(col.get(1), Datum::Null);
    assert_eq!(col.debug_item(1), "NULL");
    assert!(col.set_null(0));
    assert_eq!(col.get(0), Datum::Null);
    col.check_or_die();
}

#[test]
fn test_put_row_buffer() {
    let col = abc_column();
    let mut buf = RowBuffer::new();
    col.put_row_buffer(&mut buf, 0);
    assert_eq!(buf.as_str(), r#"{1:"a",2:"b"}"#);
    buf.clear();
    col.put_row_buffer(&mut buf, 1);
    assert_eq!(buf.as_str(), "{}");
}

#[test]
fn test_debug_rendering() {
    let col = abc_column();
    assert_eq!(col.debug_item(0), "{1:'a', 2:'b'}");
    assert_eq!(col.debug_item(1), "{}");
    assert_eq!(col.debug_string(), "{1:'a', 2:'b'}, {}, {3:'c'}");
}

#[test]
fn test_compare_at_is_unordered() {
    let col = abc_column();
    assert_eq!(col.compare_at(0, 0, &col, 1), -1);
    assert_eq!(col.compare_at(2, 1, &col, -1), -1);
}

#[test]
#[should_panic(expected = "raw_data")]
fn test_raw_data_unsupported() {
    abc_column().raw_data();
}

#[test]
fn test_nested_map_values() {
    let mut col = MapColumn::with_children(Box::new(Int32Column::new()), Box::new(new_map_column()));
    let mut outer = DatumMap::new();
    outer.insert(DatumKey::from(1), map_datum(&[(10, "x"), (11, "y")]));
    outer.insert(DatumKey::from(2), Datum::Null);
    col.append_datum(&Datum::Map(outer.clone()));
    col.append_datum(&map_datum(&[]));

    assert_eq!(col.get(0), Datum::Map(outer));
    assert_eq!(col.get(1), Datum::Map(DatumMap::new()));
    assert_eq!(col.debug_item(0), "{1:{10:'x', 11:'y'}, 2:NULL}");

    let mut buf = RowBuffer::new();
    col.put_row_buffer(&mut buf, 0);
    assert_eq!(buf.as_str(), r#"{1:{10:"x",11:"y"},2:null}"#);
    col.check_or_die();
}

#[test]
fn test_reserve_and_capacity() {
    let mut col = new_map_column();
    col.reserve(100);
    assert!(col.capacity() >= 100);
    assert!(col.is_empty());
}

#[test]
fn test_resize() {
    let mut col = abc_column();
    col.resize(1);
    assert_eq!(col.offsets().get_data(), &[0, 2]);
    assert_eq!(col.keys().size(), 2);
    col.resize(3);
    assert_eq!(col.offsets().get_data(), &[0, 2, 2, 2]);
    assert_eq!(col.get(2), Datum::Map(DatumMap::new()));
    col.check_or_die();
}
