//! Index rebuild reporting

use serde::{Deserialize, Serialize};

/// A catalog record that was not indexed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// Position of the record in the submitted catalog
    pub position: usize,
    /// Product id, when the record had one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub reason: String,
}

/// Result of the post-upsert sanity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// Top result scored at or above the sanity floor
    Passed { product_id: String, score: f64 },
    /// Top result scored below the sanity floor
    BelowFloor {
        product_id: String,
        score: f64,
        floor: f64,
    },
    /// The store returned nothing
    NoResults,
    /// The verification query itself failed
    Failed { reason: String },
    /// Nothing was written this run, so nothing new to verify
    Skipped,
}

impl VerificationOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, VerificationOutcome::Passed { .. })
    }
}

/// Summary returned from an index rebuild
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    /// Valid records now present in the store (written or already current)
    pub indexed_count: usize,
    /// Subset of `indexed_count` whose stored content was already current
    pub unchanged_count: usize,
    pub skipped_records: Vec<SkippedRecord>,
    pub verification: VerificationOutcome,
}
