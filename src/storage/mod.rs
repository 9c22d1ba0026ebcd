//! Storage abstractions for sync results.
//!
//! The engine treats persistence as an abstract document store with upsert
//! semantics over three collections:
//!
//! - `titles`: one row per title number, refreshed every pass
//! - `agencies`: one row per agency slug, refreshed every pass
//! - `snapshots`: one immutable row per calendar day, append-only

pub mod local;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{Agency, HistoricalSnapshot, Title};

// Re-export for convenience
pub use local::LocalStore;

/// Trait for metric storage backends.
///
/// Upserts are keyed by natural key (title number, agency slug) and must
/// be independently idempotent: a row whose content is unchanged is left
/// untouched, timestamp included. Snapshot inserts are all-or-nothing and
/// refuse duplicate days.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Load all title rows.
    async fn find_all_titles(&self) -> Result<Vec<Title>>;

    /// Insert or update one title row, keyed by number.
    async fn upsert_title(&self, title: &Title) -> Result<()>;

    /// Load all agency rows.
    async fn find_all_agencies(&self) -> Result<Vec<Agency>>;

    /// Insert or update one agency row, keyed by slug.
    async fn upsert_agency(&self, agency: &Agency) -> Result<()>;

    /// Load the snapshot for one calendar day, if any.
    async fn find_snapshot(&self, date: NaiveDate) -> Result<Option<HistoricalSnapshot>>;

    /// Load the most recent snapshot, if any.
    async fn latest_snapshot(&self) -> Result<Option<HistoricalSnapshot>>;

    /// Load up to `limit` snapshots, newest first.
    async fn recent_snapshots(&self, limit: usize) -> Result<Vec<HistoricalSnapshot>>;

    /// Insert a new snapshot. Fails if one already exists for its day.
    async fn insert_snapshot(&self, snapshot: &HistoricalSnapshot) -> Result<()>;
}
