//! In-memory store.

use crate::LibraryStore;
use crate::error::{ErrorKind, Result};
use crate::models::BookRecord;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    // Insertion order is the search order.
    records: Vec<BookRecord>,
    ids: HashSet<String>,
    metadata: HashMap<String, String>,
}

/// Store that keeps every record in memory, behind a [`RwLock`] so all trait
/// methods can operate on `&self`.
///
/// # Examples
///
/// ```
/// use bookcase_store::{BookRecord, LibraryStore, MemoryStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::with_records([
///     BookRecord::new("gutenberg", 345, "Dracula", "Bram Stoker"),
///     BookRecord::new("gutenberg", 2701, "Moby Dick", "Herman Melville"),
/// ]);
/// assert_eq!(store.count().await?, 2);
/// # Ok(())
/// # }
/// ```
pub struct MemoryStore {
    name: String,
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create a store pre-populated with records.
    ///
    /// Panics on duplicate ids. Test setup that is wrong should not pass.
    pub fn with_records(records: impl IntoIterator<Item = BookRecord>) -> Self {
        let mut inner = Inner::default();
        for record in records {
            if !inner.ids.insert(record.id.clone()) {
                panic!("MemoryStore::with_records: duplicate id {}", record.id);
            }
            inner.records.push(record);
        }
        Self {
            name: "memory".to_string(),
            inner: RwLock::new(inner),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_records([])
    }
}

#[async_trait]
impl LibraryStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add(&self, record: &BookRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.ids.insert(record.id.clone()) {
            exn::bail!(ErrorKind::Duplicate(record.id.clone()));
        }
        inner.records.push(record.clone());
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.inner.read().await.records.len() as u64)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<BookRecord>> {
        let query = query.to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner.records.iter().filter(|record| record.matches(&query)).take(limit).cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.records.clear();
        inner.ids.clear();
        Ok(())
    }

    async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.inner.write().await.metadata.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.read().await.metadata.get(key).cloned())
    }
}
