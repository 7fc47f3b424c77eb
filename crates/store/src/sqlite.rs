//! SQLite-backed store.

use crate::LibraryStore;
use crate::db::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{BookRecord, BookRow};
use async_trait::async_trait;
use exn::ResultExt;
use futures::TryStreamExt;
use sqlx::SqlitePool;
use tracing::instrument;

/// [`LibraryStore`] persisting records into the `books` table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}

impl From<&Database> for SqliteStore {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}

#[async_trait]
impl LibraryStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn add(&self, record: &BookRecord) -> Result<()> {
        let etext_number = i64::try_from(record.etext_number).or_raise(|| ErrorKind::InvalidData("etext number"))?;
        let result = sqlx::query(include_str!("../queries/insert_book.sql"))
            .bind(&record.id)
            .bind(etext_number)
            .bind(&record.title)
            .bind(&record.author)
            .bind(&record.source)
            .execute(&self.pool)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                exn::bail!(ErrorKind::Duplicate(record.id.clone()))
            },
            Err(e) => Err(e).or_raise(|| ErrorKind::Database),
        }
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_books.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("row count"))
    }

    /// Rows are streamed through a cursor in rowid order and matched in Rust,
    /// so SQLite's ASCII-only `LIKE` folding never comes into play.
    #[instrument(skip(self), fields(scanned, matched))]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<BookRecord>> {
        let query = query.to_lowercase();
        let mut found = Vec::new();
        let mut scanned = 0_u64;
        if limit > 0 {
            let mut rows = sqlx::query_as::<_, BookRow>(include_str!("../queries/scan_books.sql")).fetch(&self.pool);
            while let Some(row) = rows.try_next().await.or_raise(|| ErrorKind::Database)? {
                scanned += 1;
                let record = BookRecord::try_from(row)?;
                if record.matches(&query) {
                    found.push(record);
                    if found.len() >= limit {
                        break;
                    }
                }
            }
        }
        tracing::Span::current().record("scanned", scanned);
        tracing::Span::current().record("matched", found.len());
        Ok(found)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let result = sqlx::query(include_str!("../queries/clear_books.sql"))
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::info!(removed = result.rows_affected(), "cleared library");
        Ok(())
    }

    async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(include_str!("../queries/upsert_metadata.sql"))
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar(include_str!("../queries/get_metadata.sql"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }
}
