use super::state::RunState;
use serde::{Deserialize, Serialize};

/// Counters for one ingestion run. Every entry and every catalogued work
/// ends up in exactly one of them, so nothing is dropped unaccounted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Regular files extracted from the archive.
    pub entries: u64,
    /// Extracted entries recognised as content (`pg345.txt`, ...).
    pub content_entries: u64,
    /// Records newly written to the store.
    pub committed: u64,
    /// Records the store already had.
    pub duplicates: u64,
    /// Content entries whose etext number isn't in the catalog.
    pub unmatched: u64,
    /// Records in the catalog (after collapsing repeated etext numbers).
    pub catalog_records: u64,
    /// Compressed bytes pulled from the source.
    pub bytes_consumed: u64,
    pub elapsed_ms: u64,
}

impl IngestSummary {
    /// Content entries that have been dealt with one way or another.
    pub fn resolved(&self) -> u64 {
        self.committed + self.duplicates + self.unmatched
    }
}

/// What the pipeline records in the store's metadata after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestRecord {
    pub source: String,
    pub state: RunState,
    /// RFC 3339.
    pub finished_at: String,
    pub summary: IngestSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_shape() {
        let record = IngestRecord {
            source: "gutenberg".to_string(),
            state: RunState::Completed,
            finished_at: "2026-10-17T12:00:00Z".to_string(),
            summary: IngestSummary { committed: 4, duplicates: 1, unmatched: 1, ..Default::default() },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["state"], "completed");
        assert_eq!(json["summary"]["committed"], 4);
        let back: IngestRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.summary.resolved(), 6);
    }
}
