//! Error types for the [`extract`](super) module.

use derive_more::{Display, Error};

/// An extraction error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction.
pub type Result<T> = std::result::Result<T, Error>;

/// Why extraction stopped early.
///
/// Every variant ends the entry stream.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The compressed envelope or the tar framing is malformed: corrupt
    /// header, checksum mismatch, or the archive ends in the middle of an
    /// entry. Retrying the same bytes gives the same result.
    #[display("malformed archive")]
    Format,
    /// The byte source failed or disconnected mid-read.
    #[display("archive byte source failed")]
    Stream,
    /// Cancellation was requested.
    #[display("extraction cancelled")]
    Cancelled,
    /// The extraction worker panicked.
    #[display("extraction worker failed")]
    Worker,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Stream)
    }
}
