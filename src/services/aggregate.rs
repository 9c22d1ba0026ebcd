// src/services/aggregate.rs

//! Reference-weighted roll-up of per-title counts into per-agency totals.
//!
//! Each CFR reference allocates a fixed fraction of the referenced title's
//! word count to the owning agency: the full parent weight for top-level
//! agencies, a smaller weight for child agencies whose claim overlaps the
//! parent's. Parent and child totals are tracked as separate entries;
//! netting children out of parents is a display-layer concern.

use std::collections::{BTreeMap, HashMap};

use crate::models::{Agency, Title};

/// Derived metrics for one agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AgencyRollup {
    pub word_count: u64,
    pub regulation_count: u64,
}

/// Result of one aggregation run. Ordered maps keep iteration, and thus
/// downstream diffing and serialization, deterministic.
#[derive(Debug, Clone, Default)]
pub struct AggregateOutcome {
    /// Word count per title, keyed by title number
    pub title_counts: BTreeMap<String, u64>,

    /// Derived metrics per agency, keyed by slug
    pub agency_rollups: BTreeMap<String, AgencyRollup>,
}

impl AggregateOutcome {
    /// Per-agency word counts in snapshot form.
    pub fn agency_counts(&self) -> BTreeMap<String, u64> {
        self.agency_rollups
            .iter()
            .map(|(slug, rollup)| (slug.clone(), rollup.word_count))
            .collect()
    }

    /// Corpus-wide word count.
    pub fn total_word_count(&self) -> u64 {
        self.title_counts.values().sum()
    }
}

/// Converts per-title word counts into per-title and per-agency aggregates.
#[derive(Debug, Clone)]
pub struct AggregationEngine {
    parent_weight: f64,
    child_weight: f64,
}

impl AggregationEngine {
    pub fn new(parent_weight: f64, child_weight: f64) -> Self {
        Self {
            parent_weight,
            child_weight,
        }
    }

    /// Aggregate title counts and allocate them across the agency forest.
    ///
    /// Agencies missing their slug are skipped and logged. A reference to
    /// an unknown title contributes zero words but still counts as a
    /// regulation. Identical inputs always produce identical outputs.
    pub fn aggregate(&self, titles: &[Title], agencies: &[Agency]) -> AggregateOutcome {
        let title_index: HashMap<u32, u64> = titles
            .iter()
            .map(|title| (title.number, title.word_count))
            .collect();

        let title_counts = titles
            .iter()
            .map(|title| (title.number.to_string(), title.word_count))
            .collect();

        let mut agency_rollups = BTreeMap::new();
        for agency in agencies {
            if agency.slug.trim().is_empty() {
                log::warn!("skipping agency {:?} with no slug", agency.name);
                continue;
            }
            let rollup = self.rollup(agency, &title_index);
            agency_rollups.insert(agency.slug.clone(), rollup);
        }

        AggregateOutcome {
            title_counts,
            agency_rollups,
        }
    }

    /// Allocate one agency's share of the corpus.
    pub fn rollup(&self, agency: &Agency, title_index: &HashMap<u32, u64>) -> AgencyRollup {
        let weight = if agency.is_top_level() {
            self.parent_weight
        } else {
            self.child_weight
        };

        let mut allocated = 0.0_f64;
        let mut regulation_count = 0u64;
        for reference in &agency.cfr_references {
            let title_words = title_index.get(&reference.title).copied().unwrap_or(0);
            allocated += weight * title_words as f64;
            regulation_count += 1;
        }

        AgencyRollup {
            // One rounding point per agency keeps repeated runs bit-identical.
            word_count: allocated.round() as u64,
            regulation_count,
        }
    }
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new(0.10, 0.05)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CfrReference;
    use chrono::Utc;

    fn make_title(number: u32, word_count: u64) -> Title {
        Title {
            number,
            name: format!("Title {number}"),
            word_count,
            last_updated: Utc::now(),
        }
    }

    fn make_agency(slug: &str, parent: Option<&str>, refs: &[u32]) -> Agency {
        Agency {
            slug: slug.to_string(),
            name: slug.to_string(),
            short_name: slug.to_uppercase(),
            word_count: 0,
            regulation_count: 0,
            cfr_references: refs
                .iter()
                .map(|&title| CfrReference {
                    title,
                    chapter: Some("I".into()),
                })
                .collect(),
            parent_slug: parent.map(str::to_string),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_parent_weight_allocation() {
        let engine = AggregationEngine::default();
        let titles = vec![make_title(1, 1000)];
        let agencies = vec![make_agency("labor-department", None, &[1])];

        let outcome = engine.aggregate(&titles, &agencies);
        let rollup = outcome.agency_rollups["labor-department"];
        assert_eq!(rollup.word_count, 100);
        assert_eq!(rollup.regulation_count, 1);
    }

    #[test]
    fn test_child_weight_allocation() {
        let engine = AggregationEngine::default();
        let titles = vec![make_title(1, 1000)];
        let agencies = vec![
            make_agency("labor-department", None, &[1]),
            make_agency("osha", Some("labor-department"), &[1]),
        ];

        let outcome = engine.aggregate(&titles, &agencies);
        assert_eq!(outcome.agency_rollups["labor-department"].word_count, 100);
        assert_eq!(outcome.agency_rollups["osha"].word_count, 50);
    }

    #[test]
    fn test_missing_title_contributes_zero_but_counts() {
        let engine = AggregationEngine::default();
        let titles = vec![make_title(1, 1000)];
        let agencies = vec![make_agency("transport-department", None, &[1, 99])];

        let outcome = engine.aggregate(&titles, &agencies);
        let rollup = outcome.agency_rollups["transport-department"];
        assert_eq!(rollup.word_count, 100);
        assert_eq!(rollup.regulation_count, 2);
    }

    #[test]
    fn test_slugless_agency_is_skipped() {
        let engine = AggregationEngine::default();
        let titles = vec![make_title(1, 1000)];
        let agencies = vec![
            make_agency("", None, &[1]),
            make_agency("valid-agency", None, &[1]),
        ];

        let outcome = engine.aggregate(&titles, &agencies);
        assert_eq!(outcome.agency_rollups.len(), 1);
        assert!(outcome.agency_rollups.contains_key("valid-agency"));
    }

    #[test]
    fn test_total_word_count() {
        let engine = AggregationEngine::default();
        let titles = vec![make_title(1, 100), make_title(2, 250)];
        let outcome = engine.aggregate(&titles, &[]);
        assert_eq!(outcome.total_word_count(), 350);
        assert_eq!(outcome.title_counts["1"], 100);
        assert_eq!(outcome.title_counts["2"], 250);
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let engine = AggregationEngine::default();
        let titles: Vec<Title> = (1..=40).map(|n| make_title(n, n as u64 * 137)).collect();
        let agencies: Vec<Agency> = (0..12)
            .map(|i| {
                make_agency(
                    &format!("agency-{i}"),
                    None,
                    &[(i % 40) + 1, ((i * 7) % 40) + 1],
                )
            })
            .collect();

        let first = engine.aggregate(&titles, &agencies);
        let second = engine.aggregate(&titles, &agencies);
        assert_eq!(first.title_counts, second.title_counts);
        assert_eq!(first.agency_rollups, second.agency_rollups);
    }
}
