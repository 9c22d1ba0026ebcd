//! Synthetic dataset generation for the fallback path.
//!
//! When the upstream catalogs are unusable the sync pass still has to hand
//! downstream consumers well-formed data. The generator produces a plausible
//! title corpus, a small agency forest, and a smooth historical series with
//! day-over-day jitter. Every snapshot is built through the real aggregation
//! and diff stages, so the schema invariants hold by construction.
//!
//! Generation is seeded from the calendar day: retrying a fallback pass on
//! the same day reproduces the same dataset, which keeps the day-guard and
//! keyed upserts idempotent.

use chrono::{Datelike, NaiveDate, Utc};

use crate::models::{Agency, CfrReference, HistoricalSnapshot, Title};
use crate::pipeline::diff::calculate_changes;
use crate::services::AggregationEngine;

const TITLE_COUNT: u32 = 50;
const AGENCY_COUNT: u64 = 10;

/// An internally consistent stand-in for the real corpus.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    /// Title rows as of the newest day
    pub titles: Vec<Title>,

    /// Agency rows as of the newest day, rollups applied
    pub agencies: Vec<Agency>,

    /// Daily snapshots, oldest first, ending on the seed day
    pub snapshots: Vec<HistoricalSnapshot>,
}

/// xorshift64* generator. Deterministic and dependency-free, which is the
/// point: the same seed day must reproduce the same dataset.
#[derive(Debug, Clone)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        // Avoid the degenerate all-zero state.
        let state = if seed == 0 { 0x9e37_79b9_7f4a_7c15 } else { seed };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }

    fn in_range(&mut self, lower: u64, upper: u64) -> u64 {
        lower + self.next_u64() % (upper - lower).max(1)
    }
}

/// Generate a synthetic dataset ending on `today`.
///
/// `history_days` controls the length of the historical series (at least
/// one day, the seed day itself).
pub fn generate(
    today: NaiveDate,
    history_days: u32,
    engine: &AggregationEngine,
) -> SyntheticDataset {
    let days = history_days.max(1);
    let mut rng = XorShift64::new(today.num_days_from_ce() as u64);

    // Stable per-title baselines for the whole series.
    let baselines: Vec<u64> = (0..TITLE_COUNT)
        .map(|_| rng.in_range(40_000, 200_000))
        .collect();

    let agencies = generate_agencies(&mut rng);

    let mut snapshots: Vec<HistoricalSnapshot> = Vec::with_capacity(days as usize);
    let mut newest_titles: Vec<Title> = Vec::new();

    for day_index in 0..days {
        let age = u64::from(days - 1 - day_index);
        let date = today - chrono::Duration::days(i64::from(days - 1 - day_index));
        let now = Utc::now();

        let titles: Vec<Title> = baselines
            .iter()
            .enumerate()
            .map(|(i, &base)| {
                // Slow upward trend with a small daily wobble.
                let trend = base / 2000 * (u64::from(days - 1) - age);
                let wobble_span = (base / 200).max(1);
                let wobble = rng.in_range(0, wobble_span * 2) as i64 - wobble_span as i64;
                let word_count = (base + trend) as i64 + wobble;

                Title {
                    number: i as u32 + 1,
                    name: format!("Title {}", i + 1),
                    word_count: word_count.max(1) as u64,
                    last_updated: now,
                }
            })
            .collect();

        let outcome = engine.aggregate(&titles, &agencies);
        let changes = calculate_changes(&outcome, snapshots.last());
        snapshots.push(HistoricalSnapshot::new(
            date,
            outcome.title_counts.clone(),
            outcome.agency_counts(),
            changes,
        ));
        newest_titles = titles;
    }

    // Apply the newest day's rollups to the agency rows.
    let final_outcome = engine.aggregate(&newest_titles, &agencies);
    let agencies = agencies
        .into_iter()
        .map(|mut agency| {
            if let Some(rollup) = final_outcome.agency_rollups.get(&agency.slug) {
                agency.word_count = rollup.word_count;
                agency.regulation_count = rollup.regulation_count;
            }
            agency
        })
        .collect();

    SyntheticDataset {
        titles: newest_titles,
        agencies,
        snapshots,
    }
}

fn generate_agencies(rng: &mut XorShift64) -> Vec<Agency> {
    let now = Utc::now();
    let mut agencies = Vec::new();

    for i in 0..AGENCY_COUNT {
        let slug = format!("agency-{i:02}");
        agencies.push(Agency {
            slug: slug.clone(),
            name: format!("Agency {i:02}"),
            short_name: format!("AG{i:02}"),
            word_count: 0,
            regulation_count: 0,
            cfr_references: generate_references(rng),
            parent_slug: None,
            last_updated: now,
        });

        // Every third agency owns a child with its own references.
        if i % 3 == 0 {
            agencies.push(Agency {
                slug: format!("{slug}-bureau"),
                name: format!("Agency {i:02} Bureau"),
                short_name: format!("AG{i:02}B"),
                word_count: 0,
                regulation_count: 0,
                cfr_references: generate_references(rng),
                parent_slug: Some(slug),
                last_updated: now,
            });
        }
    }

    agencies
}

fn generate_references(rng: &mut XorShift64) -> Vec<CfrReference> {
    let count = rng.in_range(1, 4);
    (0..count)
        .map(|_| CfrReference {
            title: rng.in_range(1, u64::from(TITLE_COUNT) + 1) as u32,
            chapter: Some(format!("{}", rng.in_range(1, 9))),
        })
        .collect()
}
