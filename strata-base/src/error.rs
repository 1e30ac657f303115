// We want a few things here:
// 1. A way to create a new error with a backtrace
// 2. A way to centralize setting a breakpoint to trap any error in the system fairly soon
//    after it's created (or at least when it's propagated from a library we use back to us)
// 3. Same but for logging / emitting error messages into the tracing/logging system
// 4. Typed payloads for the handful of data-path failures callers are expected to handle

use backtrace_error::DynBacktraceError;
use std::borrow::Cow;
use tracing::error;

pub struct Error {
    message: String,
    #[allow(dead_code)]
    inner: DynBacktraceError,
}
pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Error").field(&self.message).finish()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

struct SimpleErr(Cow<'static, str>);
impl std::fmt::Debug for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SimpleErr {}

/// A column grew past the number of rows (or bytes) its representation can
/// address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityExceeded {
    pub column: &'static str,
    pub limit: usize,
    pub len: usize,
}
impl std::fmt::Display for CapacityExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Size of {} exceed the limit {} (len {})",
            self.column, self.limit, self.len
        )
    }
}
impl std::error::Error for CapacityExceeded {}

/// A serialized row ended before the column could decode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncated {
    pub column: &'static str,
    pub needed: usize,
    pub remaining: usize,
}
impl std::fmt::Display for Truncated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "truncated {} row: needed {} bytes, {} remaining",
            self.column, self.needed, self.remaining
        )
    }
}
impl std::error::Error for Truncated {}

/// A bulk operation was handed a source and an index list of different lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeMismatch {
    pub column: &'static str,
    pub expected: usize,
    pub actual: usize,
}
impl std::fmt::Display for SizeMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} size mismatch: expected {}, got {}",
            self.column, self.expected, self.actual
        )
    }
}
impl std::error::Error for SizeMismatch {}

impl<E: std::error::Error + Send + Sync + 'static> From<E> for Error {
    fn from(err: E) -> Error {
        Error::new(err)
    }
}

impl Error {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
        error!(target: "strata", "{:?}", err);
        let message = err.to_string();
        let inner = DynBacktraceError::from(err);
        Error { message, inner }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub fn err(msg: impl Into<Cow<'static, str>>) -> Error {
    let err = SimpleErr(msg.into());
    Error::new(err)
}
