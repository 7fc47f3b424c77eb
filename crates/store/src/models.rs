use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A normalized book, as persisted in the library.
///
/// The [`id`](Self::id) is derived from the source tag and the etext number,
/// and is unique across the whole store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookRecord {
    /// `"<source>-<etext_number>"`, e.g. `"gutenberg-345"`.
    pub id: String,
    pub etext_number: u64,
    pub title: String,
    pub author: String,
    /// Where the record came from (the catalog's origin name).
    pub source: String,
}

impl BookRecord {
    pub fn new(
        source: impl Into<String>,
        etext_number: u64,
        title: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        let source = source.into();
        Self {
            id: Self::make_id(&source, etext_number),
            etext_number,
            title: title.into(),
            author: author.into(),
            source,
        }
    }

    /// The id a record from `source` with `etext_number` will be stored under.
    pub fn make_id(source: &str, etext_number: u64) -> String {
        format!("{source}-{etext_number}")
    }

    /// Case-insensitive substring match against the title OR the author.
    ///
    /// `lowercase_query` must already be lowercased; searching calls this for
    /// every stored record, so the query is lowercased once up front.
    pub(crate) fn matches(&self, lowercase_query: &str) -> bool {
        self.title.to_lowercase().contains(lowercase_query) || self.author.to_lowercase().contains(lowercase_query)
    }
}

impl Display for BookRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{}] {}, by {}", self.id, self.title, self.author)
    }
}

/// Row representation of the `books` table.
///
/// SQLite integers are signed, so the etext number is converted on the way
/// in and out.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BookRow {
    pub id: String,
    pub etext_number: i64,
    pub title: String,
    pub author: String,
    pub source: String,
}

impl TryFrom<BookRow> for BookRecord {
    type Error = Error;
    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            etext_number: u64::try_from(row.etext_number).or_raise(|| ErrorKind::InvalidData("etext number"))?,
            title: row.title,
            author: row.author,
            source: row.source,
        })
    }
}
