use crate::{err, CapacityExceeded, Error, Truncated};
use test_log::test;

#[test]
fn test_error() {
    let e = err("test error");
    assert_eq!(e.message(), "test error");
    assert_eq!(format!("{}", e), "test error");
}

#[test]
fn test_capacity_exceeded_names_column_and_limit() {
    let e = Error::from(CapacityExceeded {
        column: "MapColumn",
        limit: 4294967295,
        len: 4294967296,
    });
    let msg = e.to_string();
    assert!(msg.contains("MapColumn"));
    assert!(msg.contains("4294967295"));
}

#[test]
fn test_truncated_propagates_with_question_mark() {
    fn decode(buf: &[u8]) -> crate::Result<u32> {
        if buf.len() < 4 {
            Err(Truncated {
                column: "MapColumn",
                needed: 4,
                remaining: buf.len(),
            })?;
        }
        Ok(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
    }
    assert_eq!(decode(&[1, 0, 0, 0]).map_err(|e| e.to_string()), Ok(1));
    let e = decode(&[1, 0]).unwrap_err();
    assert!(e.message().contains("needed 4 bytes, 2 remaining"));
}
