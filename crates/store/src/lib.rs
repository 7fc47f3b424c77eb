//! Persistent storage for book records.
//!
//! The [`LibraryStore`] trait is the contract the ingestion pipeline writes
//! through. Two implementations are provided:
//! - [`MemoryStore`] keeps everything in a `Vec` (tests, dry runs), and
//! - [`SqliteStore`] persists into a SQLite database managed by [`Database`].
//!
//! Every record is keyed by its [`BookRecord::id`]. Adding a record whose id
//! is already present is rejected with [`ErrorKind::Duplicate`]; stored
//! records are never overwritten.

mod db;
pub mod error;
mod memory;
mod models;
mod sqlite;

pub use crate::db::Database;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::memory::MemoryStore;
pub use crate::models::BookRecord;
pub use crate::sqlite::SqliteStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Number of results returned by a search when the caller doesn't say.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;

/// Metadata key under which the last completed ingestion is recorded.
pub const LAST_INGEST_KEY: &str = "last_ingest";

/// Shared, type-erased store handle.
pub type StoreHandle = Arc<dyn LibraryStore>;

/// Storage contract for book records.
///
/// # Examples
///
/// ```
/// use bookcase_store::{BookRecord, LibraryStore, MemoryStore, DEFAULT_SEARCH_LIMIT};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::default();
/// store.add(&BookRecord::new("gutenberg", 345, "Dracula", "Bram Stoker")).await?;
///
/// let found = store.search("stoker", DEFAULT_SEARCH_LIMIT).await?;
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].id, "gutenberg-345");
///
/// // Ids are unique: the second insert is rejected.
/// let err = store.add(&BookRecord::new("gutenberg", 345, "Other", "Someone")).await.unwrap_err();
/// assert!(err.is_duplicate());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Human-readable name, for logging.
    fn name(&self) -> &str;

    /// Persist a record. Fails with [`ErrorKind::Duplicate`] if a record with
    /// the same id already exists; the stored record is left untouched.
    async fn add(&self, record: &BookRecord) -> Result<()>;

    async fn count(&self) -> Result<u64>;

    /// Case-insensitive substring match on title OR author.
    ///
    /// Records are scanned linearly in insertion order and the scan stops
    /// once `limit` matches are found. No ranking.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<BookRecord>>;

    /// Remove every record. Metadata is kept.
    async fn clear(&self) -> Result<()>;

    async fn set_metadata(&self, key: &str, value: &str) -> Result<()>;

    async fn get_metadata(&self, key: &str) -> Result<Option<String>>;
}
