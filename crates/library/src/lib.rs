//! Streaming ingestion of catalogued book archives.
//!
//! - [`source`]: where the compressed bytes come from.
//! - [`extract`]: tarball decoding into a bounded stream of entries.
//! - [`progress`]: per-stage progress and the overall percentage.
//! - [`ingest`]: the pipeline tying the above to a
//!   [`LibraryStore`](bookcase_store::LibraryStore).

pub mod error;
pub mod extract;
pub mod ingest;
pub mod progress;
pub mod source;
#[cfg(test)]
mod testing;

pub use crate::ingest::{Pipeline, PipelineOptions, RunOutcome, RunState};
pub use crate::source::ByteSource;
