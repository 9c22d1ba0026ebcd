//! Local filesystem storage implementation.
//!
//! Collections live as JSON documents under a root directory:
//!
//! ```text
//! {root}/
//! ├── titles.json           # all title rows
//! ├── agencies.json         # all agency rows
//! └── snapshots/            # immutable daily snapshots
//!     ├── 2026-08-06.json
//!     └── 2026-08-07.json
//! ```
//!
//! All writes go through a temp-file-and-rename so a crash mid-write never
//! leaves a partial document behind; in particular a partial snapshot is
//! never observable.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Agency, HistoricalSnapshot, Title};
use crate::storage::MetricsStore;

const TITLES_KEY: &str = "titles.json";
const AGENCIES_KEY: &str = "agencies.json";
const SNAPSHOT_DIR: &str = "snapshots";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    fn snapshot_key(date: NaiveDate) -> String {
        format!("{SNAPSHOT_DIR}/{date}.json")
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// List every snapshot day present, unordered.
    async fn snapshot_dates(&self) -> Result<Vec<NaiveDate>> {
        let dir = self.path(SNAPSHOT_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut dates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(stem) = name.strip_suffix(".json") {
                if let Ok(date) = stem.parse::<NaiveDate>() {
                    dates.push(date);
                }
            }
        }
        Ok(dates)
    }
}

#[async_trait]
impl MetricsStore for LocalStore {
    async fn find_all_titles(&self) -> Result<Vec<Title>> {
        Ok(self.read_json(TITLES_KEY).await?.unwrap_or_default())
    }

    async fn upsert_title(&self, title: &Title) -> Result<()> {
        let mut titles = self.find_all_titles().await?;
        match titles.iter_mut().find(|t| t.number == title.number) {
            Some(existing) if existing.content_eq(title) => return Ok(()),
            Some(existing) => *existing = title.clone(),
            None => titles.push(title.clone()),
        }
        titles.sort_by_key(|t| t.number);
        self.write_json(TITLES_KEY, &titles).await
    }

    async fn find_all_agencies(&self) -> Result<Vec<Agency>> {
        Ok(self.read_json(AGENCIES_KEY).await?.unwrap_or_default())
    }

    async fn upsert_agency(&self, agency: &Agency) -> Result<()> {
        let mut agencies = self.find_all_agencies().await?;
        match agencies.iter_mut().find(|a| a.slug == agency.slug) {
            Some(existing) if existing.content_eq(agency) => return Ok(()),
            Some(existing) => *existing = agency.clone(),
            None => agencies.push(agency.clone()),
        }
        agencies.sort_by(|a, b| a.slug.cmp(&b.slug));
        self.write_json(AGENCIES_KEY, &agencies).await
    }

    async fn find_snapshot(&self, date: NaiveDate) -> Result<Option<HistoricalSnapshot>> {
        self.read_json(&Self::snapshot_key(date)).await
    }

    async fn latest_snapshot(&self) -> Result<Option<HistoricalSnapshot>> {
        let dates = self.snapshot_dates().await?;
        match dates.into_iter().max() {
            Some(date) => self.find_snapshot(date).await,
            None => Ok(None),
        }
    }

    async fn recent_snapshots(&self, limit: usize) -> Result<Vec<HistoricalSnapshot>> {
        let mut dates = self.snapshot_dates().await?;
        dates.sort_unstable_by(|a, b| b.cmp(a));

        let mut snapshots = Vec::new();
        for date in dates.into_iter().take(limit) {
            if let Some(snapshot) = self.find_snapshot(date).await? {
                snapshots.push(snapshot);
            }
        }
        Ok(snapshots)
    }

    async fn insert_snapshot(&self, snapshot: &HistoricalSnapshot) -> Result<()> {
        let key = Self::snapshot_key(snapshot.date);
        if tokio::fs::try_exists(self.path(&key)).await? {
            return Err(AppError::persistence(format!(
                "snapshot for {} already exists",
                snapshot.date
            )));
        }
        self.write_json(&key, snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn make_title(number: u32, word_count: u64) -> Title {
        Title {
            number,
            name: format!("Title {number}"),
            word_count,
            last_updated: Utc::now(),
        }
    }

    fn make_snapshot(date: NaiveDate, total: u64) -> HistoricalSnapshot {
        HistoricalSnapshot::new(
            date,
            BTreeMap::from([("1".to_string(), total)]),
            BTreeMap::new(),
            Vec::new(),
        )
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    #[tokio::test]
    async fn test_empty_store_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        assert!(store.find_all_titles().await.unwrap().is_empty());
        assert!(store.find_all_agencies().await.unwrap().is_empty());
        assert!(store.latest_snapshot().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_title_inserts_then_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        store.upsert_title(&make_title(1, 100)).await.unwrap();
        store.upsert_title(&make_title(2, 200)).await.unwrap();
        store.upsert_title(&make_title(1, 150)).await.unwrap();

        let titles = store.find_all_titles().await.unwrap();
        assert_eq!(titles.len(), 2);
        assert_eq!(titles[0].word_count, 150);
    }

    #[tokio::test]
    async fn test_unchanged_upsert_preserves_stored_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        let original = make_title(1, 100);
        store.upsert_title(&original).await.unwrap();

        let mut refreshed = original.clone();
        refreshed.last_updated = refreshed.last_updated + chrono::Duration::hours(2);
        store.upsert_title(&refreshed).await.unwrap();

        let stored = store.find_all_titles().await.unwrap();
        assert_eq!(stored[0].last_updated, original.last_updated);
    }

    #[tokio::test]
    async fn test_snapshot_insert_refuses_duplicate_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        store.insert_snapshot(&make_snapshot(day(7), 100)).await.unwrap();
        let duplicate = store.insert_snapshot(&make_snapshot(day(7), 999)).await;
        assert!(matches!(duplicate, Err(AppError::Persistence(_))));

        // The original is untouched.
        let stored = store.find_snapshot(day(7)).await.unwrap().unwrap();
        assert_eq!(stored.total_word_count, 100);
    }

    #[tokio::test]
    async fn test_latest_and_recent_snapshots_order_by_date() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        for d in [5, 7, 6] {
            store
                .insert_snapshot(&make_snapshot(day(d), u64::from(d)))
                .await
                .unwrap();
        }

        let latest = store.latest_snapshot().await.unwrap().unwrap();
        assert_eq!(latest.date, day(7));

        let recent = store.recent_snapshots(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].date, day(7));
        assert_eq!(recent[1].date, day(6));
    }

    #[tokio::test]
    async fn test_snapshot_round_trips_ordered_counts() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        let snapshot = HistoricalSnapshot::new(
            day(7),
            BTreeMap::from([("1".to_string(), 10), ("2".to_string(), 30)]),
            BTreeMap::from([("fcc".to_string(), 4)]),
            Vec::new(),
        );
        store.insert_snapshot(&snapshot).await.unwrap();

        let stored = store.find_snapshot(day(7)).await.unwrap().unwrap();
        assert_eq!(stored, snapshot);
        assert!(stored.is_consistent());
    }
}
