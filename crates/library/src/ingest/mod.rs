//! Catalog-driven ingestion.
//!
//! A [`Pipeline`] drives one run: it pulls entries from
//! [`extract`](crate::extract::extract), parses the catalog when it arrives,
//! resolves every content entry's etext number against it and writes the
//! matching [`BookRecord`](bookcase_store::BookRecord)s to the store, while
//! reporting through a shared [`ProgressCoordinator`](crate::progress::ProgressCoordinator).
//!
//! A run always ends in a terminal [`RunState`], and its [`IngestSummary`]
//! accounts for every content entry as committed, duplicate or unmatched.

pub mod error;
mod pipeline;
mod state;
mod summary;

pub use self::pipeline::{Pipeline, PipelineOptions, RunOutcome};
pub use self::state::RunState;
pub use self::summary::{IngestRecord, IngestSummary};
