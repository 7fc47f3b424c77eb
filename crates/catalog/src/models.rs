use crate::consts::UNKNOWN_AUTHOR;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A single entry of a catalog document.
///
/// Derived purely from text, and only lives long enough to be turned into a
/// stored book record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CatalogRecord {
    /// Numeric identifier of the work, unique within one catalog document.
    pub etext_number: u64,
    pub title: String,
    /// Falls back to [`UNKNOWN_AUTHOR`] when the entry doesn't name anyone.
    pub author: String,
}

impl CatalogRecord {
    pub fn new<A: Into<String>>(etext_number: u64, title: impl Into<String>, author: Option<A>) -> Self {
        let author = author.map(Into::into).filter(|a: &String| !a.trim().is_empty());
        Self {
            etext_number,
            title: title.into(),
            author: author.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        }
    }
}

impl Display for CatalogRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "#{} {}, by {}", self.etext_number, self.title, self.author)
    }
}
