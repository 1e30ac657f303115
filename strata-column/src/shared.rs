use crate::column::Column;
use std::sync::Arc;

/// A column that may be referenced from several places at once, such as a
/// chunk handed to more than one operator.
pub type SharedColumn = Arc<dyn Column>;

/// Copy-on-write access: returns the column itself if `col` is the only
/// reference, otherwise first replaces `col` with a private deep copy.
pub fn make_exclusive(col: &mut SharedColumn) -> &mut dyn Column {
    if Arc::get_mut(col).is_none() {
        *col = Arc::from(col.clone_column());
    }
    match Arc::get_mut(col) {
        Some(c) => c,
        None => unreachable!("freshly cloned column is uniquely owned"),
    }
}
