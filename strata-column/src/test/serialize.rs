use super::{abc_column, map_datum, new_map_column, random_map_column, rows_of};
use crate::{Column, Datum, DatumKey, DatumMap, Int32Column, MapColumn};
use ordered_float::OrderedFloat;
use strata_base::Result;
use test_log::test;

fn serialize_row(col: &dyn Column, idx: usize) -> Vec<u8> {
    let mut buf = vec![0_u8; col.serialize_size(idx) as usize];
    let n = col.serialize(idx, &mut buf);
    assert_eq!(n as usize, buf.len());
    buf
}

#[test]
fn test_serialize_layout() {
    let col = abc_column();
    assert_eq!(col.serialize_size(0), 26);
    #[rustfmt::skip]
    let expect: Vec<u8> = vec![
        2, 0, 0, 0,
        0, 1, 0, 0, 0,      0, 1, 0, 0, 0, b'a',
        0, 2, 0, 0, 0,      0, 1, 0, 0, 0, b'b',
    ];
    assert_eq!(serialize_row(&col, 0), expect);
    assert_eq!(serialize_row(&col, 1), vec![0, 0, 0, 0]);
    assert_eq!(col.max_one_element_serialize_size(), 26);

    let mut buf = [0xaa_u8; 4];
    assert_eq!(col.serialize_default(&mut buf), 4);
    assert_eq!(buf, [0, 0, 0, 0]);
}

#[test]
fn test_serialize_round_trip() -> Result<()> {
    let mut state = 31337;
    let col = random_map_column(&mut state, 60);
    let mut back = new_map_column();
    for i in 0..col.size() {
        let buf = serialize_row(&col, i);
        let rest = back.deserialize_and_append(&buf)?;
        assert!(rest.is_empty());
    }
    assert_eq!(rows_of(&back), rows_of(&col));
    assert_eq!(back.offsets().get_data(), col.offsets().get_data());
    back.check_or_die();
    Ok(())
}

#[test]
fn test_deserialize_returns_remainder() -> Result<()> {
    let col = abc_column();
    let mut buf = serialize_row(&col, 2);
    buf.extend_from_slice(&[9, 9]);
    let mut back = new_map_column();
    let rest = back.deserialize_and_append(&buf)?;
    assert_eq!(rest, &[9, 9]);
    assert_eq!(back.get(0), map_datum(&[(3, "c")]));
    Ok(())
}

#[test]
fn test_serialize_batch_round_trip() -> Result<()> {
    let col = abc_column();
    let max = col.max_one_element_serialize_size();
    let mut dst = vec![0_u8; 3 * max as usize];
    let mut slice_sizes = vec![0_u32; 3];
    col.serialize_batch(&mut dst, &mut slice_sizes, 3, max);
    assert_eq!(slice_sizes, vec![26, 4, 15]);

    let mut srcs: Vec<&[u8]> = (0..3).map(|i| &dst[i * max as usize..]).collect();
    let mut back = new_map_column();
    back.deserialize_and_append_batch(&mut srcs, 3)?;
    assert_eq!(rows_of(&back), rows_of(&col));
    for (i, rest) in srcs.iter().enumerate() {
        assert_eq!(rest.len(), dst.len() - i * max as usize - slice_sizes[i] as usize);
    }
    Ok(())
}

#[test]
fn test_deserialize_truncated_leaves_column_intact() {
    let col = abc_column();
    let buf = serialize_row(&col, 0);
    let mut back = abc_column();

    // Cut inside the first value, after its key has been decoded.
    let e = back.deserialize_and_append(&buf[..12]).unwrap_err();
    assert!(e.message().contains("truncated"));
    assert_eq!(back.size(), 3);
    assert_eq!(back.keys().size(), 3);
    assert_eq!(back.values().size(), 3);
    back.check_or_die();

    let e = back.deserialize_and_append(&buf[..2]).unwrap_err();
    assert!(e.message().contains("needed 4 bytes, 2 remaining"));
    assert_eq!(rows_of(&back), rows_of(&col));
}

#[test]
fn test_nested_round_trip() -> Result<()> {
    let mut col = MapColumn::with_children(Box::new(Int32Column::new()), Box::new(new_map_column()));
    let mut row = DatumMap::new();
    row.insert(DatumKey::from(1), map_datum(&[(2, "two"), (3, "three")]));
    row.insert(DatumKey::from(4), Datum::Null);
    row.insert(DatumKey::from(5), map_datum(&[]));
    col.append_datum(&Datum::Map(row));
    col.append_datum(&Datum::Null);

    let mut back = MapColumn::with_children(Box::new(Int32Column::new()), Box::new(new_map_column()));
    for i in 0..col.size() {
        back.deserialize_and_append(&serialize_row(&col, i))?;
    }
    assert_eq!(rows_of(&back), rows_of(&col));
    back.check_or_die();
    Ok(())
}

#[test]
fn test_datum_msgpack_round_trip() -> Result<()> {
    let mut row = DatumMap::new();
    row.insert(DatumKey::from("k"), Datum::Float64(2.5));
    row.insert(DatumKey::Float32(OrderedFloat(1.5)), Datum::Null);
    row.insert(DatumKey::from(7), map_datum(&[(1, "a")]));
    let datum = Datum::Map(row);
    let bytes = rmp_serde::to_vec(&datum)?;
    let back: Datum = rmp_serde::from_slice(&bytes)?;
    assert_eq!(back, datum);
    Ok(())
}
