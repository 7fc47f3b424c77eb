use crate::models::CatalogRecord;
use crate::parser::parse_catalog;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::instrument;

/// Catalog records indexed by etext number, ready for matching against
/// archive contents.
///
/// If a document lists the same etext number more than once, the record seen
/// last wins and the earlier ones are counted as [shadowed](Self::shadowed).
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: HashMap<u64, CatalogRecord>,
    shadowed: usize,
}

impl Catalog {
    /// Parse and index the full text of a catalog document.
    #[instrument(skip(text), fields(text_size = text.len(), records, shadowed))]
    pub fn from_text(text: &str) -> Self {
        let catalog: Self = parse_catalog(text).collect();
        tracing::Span::current().record("records", catalog.len());
        tracing::Span::current().record("shadowed", catalog.shadowed);
        catalog
    }

    /// Catalog documents are plain text, but not guaranteed to be valid
    /// UTF-8; invalid sequences are replaced with U+FFFD.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_text(&String::from_utf8_lossy(bytes))
    }

    pub fn insert(&mut self, record: CatalogRecord) {
        match self.records.entry(record.etext_number) {
            Entry::Occupied(mut existing) => {
                tracing::debug!(etext_number = record.etext_number, "catalog lists etext number more than once");
                existing.insert(record);
                self.shadowed += 1;
            },
            Entry::Vacant(slot) => {
                slot.insert(record);
            },
        }
    }

    pub fn get(&self, etext_number: u64) -> Option<&CatalogRecord> {
        self.records.get(&etext_number)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records replaced by a later record with the same etext number.
    pub fn shadowed(&self) -> usize {
        self.shadowed
    }
}

impl FromIterator<CatalogRecord> for Catalog {
    fn from_iter<I: IntoIterator<Item = CatalogRecord>>(iter: I) -> Self {
        let mut catalog = Self::default();
        for record in iter {
            catalog.insert(record);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_seen_wins() {
        let text = "TITLE and AUTHOR\nOld Title, by Someone   345\nDracula, by Bram Stoker   345\nMoby Dick   2701\n";
        let catalog = Catalog::from_text(text);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.shadowed(), 1);
        assert_eq!(catalog.get(345).unwrap().title, "Dracula");
        assert_eq!(catalog.get(2701).unwrap().title, "Moby Dick");
        assert!(catalog.get(11).is_none());
    }

    #[test]
    fn test_from_invalid_utf8() {
        let mut bytes = b"TITLE and AUTHOR\nCaf".to_vec();
        bytes.push(0xFF);
        bytes.extend_from_slice(b", by Someone   12\n");
        let catalog = Catalog::from_bytes(&bytes);
        assert_eq!(catalog.get(12).unwrap().title, "Caf\u{FFFD}");
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::from_text("no header here");
        assert!(catalog.is_empty());
        assert_eq!(catalog.len(), 0);
    }
}
