//! Error types for the [`ingest`](super) module.
//!
//! Uses [`exn`] for automatic location tracking and error tree construction.
//! Errors from the extractor and the store are kept as children of the
//! ingestion error that classifies them.

use crate::extract::error::{Error as ExtractError, ErrorKind as ExtractErrorKind};
use bookcase_store::Error as StoreError;
use derive_more::{Display, Error};

/// An ingestion error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for ingestion.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a run did not complete.
///
/// Everything here except [`Cancelled`](Self::Cancelled) ends a run as
/// [`Failed`](super::RunState::Failed). Duplicate records are not errors at
/// this level; they are counted in the summary.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The archive is malformed.
    #[display("malformed archive")]
    Format,
    /// The archive byte source failed mid-read.
    #[display("archive stream failed")]
    Stream,
    /// Cancellation was requested and acknowledged.
    #[display("ingestion cancelled")]
    Cancelled,
    /// The library store rejected a write for a reason other than a
    /// duplicate id.
    #[display("library store failed")]
    Store,
    /// The archive ended without a catalog member, and none was supplied.
    #[display("no catalog found in archive")]
    MissingCatalog,
    /// The extraction worker died.
    #[display("extraction worker failed")]
    Worker,
    /// [`Pipeline::run`](super::Pipeline::run) was called a second time.
    #[display("pipeline has already run")]
    AlreadyRun,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Stream | Self::Store)
    }

    /// Classify an extraction error, keeping it as a child in the error tree.
    #[track_caller]
    pub fn extract(err: ExtractError) -> Error {
        let kind = match *err {
            ExtractErrorKind::Format => Self::Format,
            ExtractErrorKind::Stream => Self::Stream,
            ExtractErrorKind::Cancelled => Self::Cancelled,
            ExtractErrorKind::Worker => Self::Worker,
        };
        err.raise(kind)
    }

    #[track_caller]
    pub fn store(err: StoreError) -> Error {
        err.raise(Self::Store)
    }
}
