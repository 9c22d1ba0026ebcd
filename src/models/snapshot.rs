//! Daily snapshot and change-feed data structures.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which kind of entity a change record refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Title,
    Agency,
}

/// A single day-over-day count movement. Zero-delta entities are never
/// recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeRecord {
    /// Entity identifier (title number as a string, or agency slug)
    pub entity: String,

    /// Entity kind
    pub entity_type: EntityKind,

    /// Signed word-count delta against the previous snapshot
    pub word_difference: i64,
}

/// One calendar day's aggregate metrics plus the changes from the prior
/// snapshot. At most one snapshot exists per day; rows are append-only and
/// immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricalSnapshot {
    /// Calendar day (unique key)
    pub date: NaiveDate,

    /// Sum of all per-title counts for the day
    pub total_word_count: u64,

    /// Word count per title, keyed by title number
    pub title_counts: BTreeMap<String, u64>,

    /// Word count per agency, keyed by slug
    pub agency_counts: BTreeMap<String, u64>,

    /// Non-zero movements against the immediately preceding snapshot
    pub changes: Vec<ChangeRecord>,
}

impl HistoricalSnapshot {
    /// Build a snapshot for `date`. The total is always derived from the
    /// title counts, so the sum invariant holds by construction.
    pub fn new(
        date: NaiveDate,
        title_counts: BTreeMap<String, u64>,
        agency_counts: BTreeMap<String, u64>,
        changes: Vec<ChangeRecord>,
    ) -> Self {
        let total_word_count = title_counts.values().sum();
        Self {
            date,
            total_word_count,
            title_counts,
            agency_counts,
            changes,
        }
    }

    /// Check the stored total against the title counts.
    pub fn is_consistent(&self) -> bool {
        self.total_word_count == self.title_counts.values().sum::<u64>()
    }

    /// Look up a title count by id, defaulting to zero.
    pub fn title_count(&self, id: &str) -> u64 {
        self.title_counts.get(id).copied().unwrap_or(0)
    }

    /// Look up an agency count by slug, defaulting to zero.
    pub fn agency_count(&self, slug: &str) -> u64 {
        self.agency_counts.get(slug).copied().unwrap_or(0)
    }
}
