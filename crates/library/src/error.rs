//! Library Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. The [`extract`](crate::extract) and
//! [`ingest`](crate::ingest) modules carry their own, more specific, kinds.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The archive byte source could not be opened.
    #[display("could not open archive source")]
    Source,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Source)
    }
}
