mod error;

#[cfg(test)]
mod test;

pub use error::{err, CapacityExceeded, Error, Result, SizeMismatch, Truncated};
