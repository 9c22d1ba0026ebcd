// src/pipeline/sync.rs

//! Sync orchestration.
//!
//! One pass pulls the title and agency catalogs, streams every title's
//! full text through the word counter under bounded concurrency, rolls the
//! counts up per agency, diffs against the latest snapshot, and persists
//! the result. A catastrophic catalog failure diverts the pass to the
//! synthetic fallback dataset so downstream consumers always have
//! well-formed data.
//!
//! Passes are serialized: the run lock guarantees the day-guard check and
//! the snapshot insert never interleave between two concurrent invocations.
//! Per-entity work inside a pass is parallel, with every failure captured
//! at the task boundary and converted into a zero-count degraded result.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::StreamExt;
use futures::stream;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{
    Agency, CfrReference, Config, HistoricalSnapshot, RemoteAgency, Title, TitleSummary,
};
use crate::pipeline::diff::calculate_changes;
use crate::pipeline::fallback;
use crate::services::wordcount::word_count_streaming;
use crate::services::{AggregateOutcome, AggregationEngine, RemoteDataClient};
use crate::storage::MetricsStore;

/// Summary of one sync pass.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub titles_processed: usize,
    pub title_failures: usize,
    pub agencies_processed: usize,
    pub agencies_skipped: usize,
    pub snapshot_written: bool,
    pub change_count: usize,
    pub used_fallback: bool,
}

/// Pipeline phases, logged as the pass advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncPhase {
    FetchingCatalogs,
    ProcessingEntities,
    Diffing,
    Persisting,
    Fallback,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::FetchingCatalogs => "fetching-catalogs",
            SyncPhase::ProcessingEntities => "processing-entities",
            SyncPhase::Diffing => "diffing",
            SyncPhase::Persisting => "persisting",
            SyncPhase::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

fn enter(phase: SyncPhase) {
    log::info!("sync phase: {phase}");
}

/// Drives full synchronization passes.
pub struct SyncEngine {
    client: RemoteDataClient,
    config: Arc<Config>,
    aggregation: AggregationEngine,
    run_lock: Mutex<()>,
}

impl SyncEngine {
    /// Create a sync engine from configuration.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = RemoteDataClient::new(&config.client)?;
        let aggregation =
            AggregationEngine::new(config.sync.parent_weight, config.sync.child_weight);
        Ok(Self {
            client,
            config,
            aggregation,
            run_lock: Mutex::new(()),
        })
    }

    /// Run one idempotent sync pass.
    ///
    /// Both the periodic scheduler and the cold-start hook call this; the
    /// day-guard and keyed upserts make repeat invocations safe. Passes
    /// never overlap.
    pub async fn run_sync_pass(&self, store: &dyn MetricsStore) -> Result<SyncReport> {
        let _guard = self.run_lock.lock().await;
        let started_at = Utc::now();
        let today = started_at.date_naive();

        enter(SyncPhase::FetchingCatalogs);
        let live = match self.fetch_catalogs().await {
            Ok((summaries, agencies, skipped)) => {
                self.run_live_pass(store, today, started_at, summaries, agencies, skipped)
                    .await
            }
            Err(error) => Err(error),
        };

        // Any catastrophic failure diverts to the fallback path; per-entity
        // failures never reach here.
        let report = match live {
            Ok(report) => report,
            Err(error) => {
                log::error!("sync pass failed ({error}); diverting to fallback");
                self.run_fallback_pass(store, today, started_at).await?
            }
        };

        log_summary(&report);
        Ok(report)
    }

    /// Fetch both catalogs, flattening the agency forest.
    ///
    /// An empty catalog is as unusable as an unreachable one; either case
    /// escalates so the pass can divert to the fallback path.
    async fn fetch_catalogs(&self) -> Result<(Vec<TitleSummary>, Vec<Agency>, usize)> {
        let summaries = self.client.fetch_title_catalog().await?;
        if summaries.is_empty() {
            return Err(AppError::upstream("title catalog is empty"));
        }

        let remote_agencies = self.client.fetch_agency_catalog().await?;
        let (agencies, skipped) = flatten_agencies(&remote_agencies);
        if agencies.is_empty() {
            return Err(AppError::upstream("agency catalog is empty"));
        }

        log::info!(
            "catalogs fetched: {} titles, {} agencies ({} records skipped)",
            summaries.len(),
            agencies.len(),
            skipped
        );
        Ok((summaries, agencies, skipped))
    }

    async fn run_live_pass(
        &self,
        store: &dyn MetricsStore,
        today: NaiveDate,
        started_at: DateTime<Utc>,
        summaries: Vec<TitleSummary>,
        agencies: Vec<Agency>,
        agencies_skipped: usize,
    ) -> Result<SyncReport> {
        enter(SyncPhase::ProcessingEntities);
        let (titles, title_failures) = self.process_titles(summaries, today).await;

        let outcome = self.aggregation.aggregate(&titles, &agencies);
        let agencies = apply_rollups(agencies, &outcome);

        enter(SyncPhase::Diffing);
        let snapshot = self.build_snapshot(store, today, &outcome).await?;
        let change_count = snapshot.as_ref().map_or(0, |s| s.changes.len());

        enter(SyncPhase::Persisting);
        let snapshot_written = persist(store, &titles, &agencies, snapshot.as_ref()).await;

        Ok(SyncReport {
            started_at,
            finished_at: Utc::now(),
            titles_processed: titles.len(),
            title_failures,
            agencies_processed: agencies.len(),
            agencies_skipped,
            snapshot_written,
            change_count,
            used_fallback: false,
        })
    }

    async fn run_fallback_pass(
        &self,
        store: &dyn MetricsStore,
        today: NaiveDate,
        started_at: DateTime<Utc>,
    ) -> Result<SyncReport> {
        enter(SyncPhase::Fallback);
        log::warn!("upstream unusable; generating synthetic dataset for {today}");
        let dataset = fallback::generate(
            today,
            self.config.sync.fallback_history_days,
            &self.aggregation,
        );

        enter(SyncPhase::Persisting);
        let mut snapshot_written = false;
        let mut change_count = 0;
        for snapshot in &dataset.snapshots {
            match store.find_snapshot(snapshot.date).await? {
                Some(_) => continue,
                None => {
                    if let Err(error) = store.insert_snapshot(snapshot).await {
                        log::error!("failed to insert snapshot {}: {error}", snapshot.date);
                    } else if snapshot.date == today {
                        snapshot_written = true;
                        change_count = snapshot.changes.len();
                    }
                }
            }
        }
        persist(store, &dataset.titles, &dataset.agencies, None).await;

        Ok(SyncReport {
            started_at,
            finished_at: Utc::now(),
            titles_processed: dataset.titles.len(),
            title_failures: 0,
            agencies_processed: dataset.agencies.len(),
            agencies_skipped: 0,
            snapshot_written,
            change_count,
            used_fallback: true,
        })
    }

    /// Count words for every title under bounded concurrency.
    ///
    /// One title's failure is captured at the task boundary, logged, and
    /// recorded as a zero count; siblings are never blocked or cancelled.
    async fn process_titles(
        &self,
        summaries: Vec<TitleSummary>,
        today: NaiveDate,
    ) -> (Vec<Title>, usize) {
        let concurrency = self.config.sync.max_concurrent.max(1);
        let now = Utc::now();

        let mut results = stream::iter(summaries.into_iter().map(|summary| {
            let client = self.client.clone();
            async move {
                let result = count_title_words(&client, &summary, today).await;
                (summary, result)
            }
        }))
        .buffer_unordered(concurrency);

        let mut titles = Vec::new();
        let mut failures = 0;
        while let Some((summary, result)) = results.next().await {
            let word_count = match result {
                Ok(count) => count,
                Err(error) => {
                    failures += 1;
                    log::warn!(
                        "title {} processing failed ({error}); recording zero count",
                        summary.number
                    );
                    0
                }
            };
            titles.push(Title {
                number: summary.number,
                name: summary.name,
                word_count,
                last_updated: now,
            });
        }

        // Completion order is nondeterministic; downstream output is not.
        titles.sort_by_key(|title| title.number);
        (titles, failures)
    }

    /// Build today's snapshot unless one already exists (day-guard).
    async fn build_snapshot(
        &self,
        store: &dyn MetricsStore,
        today: NaiveDate,
        outcome: &AggregateOutcome,
    ) -> Result<Option<HistoricalSnapshot>> {
        if store.find_snapshot(today).await?.is_some() {
            log::info!("snapshot for {today} already exists; skipping diff");
            return Ok(None);
        }

        let previous = store.latest_snapshot().await?;
        let changes = calculate_changes(outcome, previous.as_ref());
        Ok(Some(HistoricalSnapshot::new(
            today,
            outcome.title_counts.clone(),
            outcome.agency_counts(),
            changes,
        )))
    }
}

/// Count one title's words by streaming its full text.
async fn count_title_words(
    client: &RemoteDataClient,
    summary: &TitleSummary,
    fallback_date: NaiveDate,
) -> Result<u64> {
    if summary.reserved {
        return Ok(0);
    }
    let as_of = match summary.latest_issue_date.as_deref() {
        Some(raw) => raw.parse::<NaiveDate>().map_err(|e| {
            AppError::malformed(
                format!("title-{}", summary.number),
                format!("bad issue date {raw:?}: {e}"),
            )
        })?,
        None => fallback_date,
    };
    let body = client.title_content_stream(summary.number, as_of).await;
    Ok(word_count_streaming(body).await)
}

/// Flatten the nested agency catalog into rows, parents before children.
///
/// Records without a slug cannot be keyed and are skipped with their
/// subtree; references without a title number are dropped.
fn flatten_agencies(remote: &[RemoteAgency]) -> (Vec<Agency>, usize) {
    let now = Utc::now();
    let mut agencies = Vec::new();
    let mut skipped = 0;
    for record in remote {
        flatten_into(record, None, &mut agencies, &mut skipped, now);
    }
    (agencies, skipped)
}

fn flatten_into(
    record: &RemoteAgency,
    parent: Option<&str>,
    out: &mut Vec<Agency>,
    skipped: &mut usize,
    now: DateTime<Utc>,
) {
    let Some(slug) = record.slug.as_deref().filter(|s| !s.trim().is_empty()) else {
        log::warn!("skipping agency record {:?} with no slug", record.name);
        *skipped += 1;
        return;
    };

    let cfr_references = record
        .cfr_references
        .iter()
        .filter_map(|reference| {
            reference.title.map(|title| CfrReference {
                title,
                chapter: reference.chapter.clone(),
            })
        })
        .collect();

    out.push(Agency {
        slug: slug.to_string(),
        name: record.name.clone(),
        short_name: record
            .short_name
            .clone()
            .unwrap_or_else(|| record.name.clone()),
        word_count: 0,
        regulation_count: 0,
        cfr_references,
        parent_slug: parent.map(str::to_string),
        last_updated: now,
    });

    for child in &record.children {
        flatten_into(child, Some(slug), out, skipped, now);
    }
}

/// Copy derived metrics onto the agency rows before persisting.
fn apply_rollups(agencies: Vec<Agency>, outcome: &AggregateOutcome) -> Vec<Agency> {
    agencies
        .into_iter()
        .map(|mut agency| {
            if let Some(rollup) = outcome.agency_rollups.get(&agency.slug) {
                agency.word_count = rollup.word_count;
                agency.regulation_count = rollup.regulation_count;
            }
            agency
        })
        .collect()
}

/// Upsert rows and optionally insert the day's snapshot.
///
/// A failed upsert aborts only the affected record. Returns whether the
/// snapshot was written.
async fn persist(
    store: &dyn MetricsStore,
    titles: &[Title],
    agencies: &[Agency],
    snapshot: Option<&HistoricalSnapshot>,
) -> bool {
    for title in titles {
        if let Err(error) = store.upsert_title(title).await {
            log::error!("failed to upsert title {}: {error}", title.number);
        }
    }
    for agency in agencies {
        if let Err(error) = store.upsert_agency(agency).await {
            log::error!("failed to upsert agency {}: {error}", agency.slug);
        }
    }

    match snapshot {
        Some(snapshot) => match store.insert_snapshot(snapshot).await {
            Ok(()) => true,
            Err(error) => {
                log::error!("failed to insert snapshot {}: {error}", snapshot.date);
                false
            }
        },
        None => false,
    }
}

fn log_summary(report: &SyncReport) {
    let elapsed = report.finished_at - report.started_at;
    log::info!(
        "sync pass complete in {}ms: {} titles ({} degraded), {} agencies ({} skipped), \
         snapshot_written={}, changes={}, fallback={}",
        elapsed.num_milliseconds(),
        report.titles_processed,
        report.title_failures,
        report.agencies_processed,
        report.agencies_skipped,
        report.snapshot_written,
        report.change_count,
        report.used_fallback,
    );
}
