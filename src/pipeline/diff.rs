//! Day-over-day change detection.
//!
//! Compares the current aggregate counts against the most recent prior
//! snapshot and emits one record per entity whose count moved. Entities
//! present only in the previous snapshot are ignored: upstream absence is
//! indistinguishable from a partial fetch, so it is treated as a gap, not
//! a removal.

use std::collections::BTreeMap;

use crate::models::{ChangeRecord, EntityKind, HistoricalSnapshot};
use crate::services::AggregateOutcome;

/// Calculator for day-over-day count movements.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Compute the change list for `current` against `previous`.
    ///
    /// The first run ever has nothing to compare against and yields an
    /// empty list. Output order is titles before agencies, each in key
    /// order; records carry no inherent priority.
    pub fn calculate(
        &self,
        current: &AggregateOutcome,
        previous: Option<&HistoricalSnapshot>,
    ) -> Vec<ChangeRecord> {
        let Some(previous) = previous else {
            return Vec::new();
        };

        let agency_counts = current.agency_counts();
        let mut changes = Vec::new();
        collect_deltas(
            &mut changes,
            &current.title_counts,
            &previous.title_counts,
            EntityKind::Title,
        );
        collect_deltas(
            &mut changes,
            &agency_counts,
            &previous.agency_counts,
            EntityKind::Agency,
        );
        changes
    }
}

fn collect_deltas(
    changes: &mut Vec<ChangeRecord>,
    current: &BTreeMap<String, u64>,
    previous: &BTreeMap<String, u64>,
    entity_type: EntityKind,
) {
    for (entity, &count) in current {
        let before = previous.get(entity).copied().unwrap_or(0);
        let delta = count as i64 - before as i64;
        if delta != 0 {
            changes.push(ChangeRecord {
                entity: entity.clone(),
                entity_type,
                word_difference: delta,
            });
        }
    }
}

/// Convenience function to calculate the change list.
pub fn calculate_changes(
    current: &AggregateOutcome,
    previous: Option<&HistoricalSnapshot>,
) -> Vec<ChangeRecord> {
    ChangeDetector::new().calculate(current, previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::AgencyRollup;
    use chrono::NaiveDate;

    fn outcome(titles: &[(&str, u64)], agencies: &[(&str, u64)]) -> AggregateOutcome {
        AggregateOutcome {
            title_counts: titles
                .iter()
                .map(|(id, count)| (id.to_string(), *count))
                .collect(),
            agency_rollups: agencies
                .iter()
                .map(|(slug, count)| {
                    (
                        slug.to_string(),
                        AgencyRollup {
                            word_count: *count,
                            regulation_count: 1,
                        },
                    )
                })
                .collect(),
        }
    }

    fn snapshot(titles: &[(&str, u64)], agencies: &[(&str, u64)]) -> HistoricalSnapshot {
        HistoricalSnapshot::new(
            NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
            titles
                .iter()
                .map(|(id, count)| (id.to_string(), *count))
                .collect(),
            agencies
                .iter()
                .map(|(slug, count)| (slug.to_string(), *count))
                .collect(),
            Vec::new(),
        )
    }

    #[test]
    fn test_first_run_yields_no_changes() {
        let current = outcome(&[("1", 100)], &[("fcc", 10)]);
        assert!(calculate_changes(&current, None).is_empty());
    }

    #[test]
    fn test_single_title_growth() {
        let previous = snapshot(&[("1", 100)], &[]);
        let current = outcome(&[("1", 130)], &[]);

        let changes = calculate_changes(&current, Some(&previous));
        assert_eq!(
            changes,
            vec![ChangeRecord {
                entity: "1".into(),
                entity_type: EntityKind::Title,
                word_difference: 30,
            }]
        );
    }

    #[test]
    fn test_unchanged_entities_produce_no_record() {
        let previous = snapshot(&[("1", 100), ("2", 50)], &[("fcc", 10)]);
        let current = outcome(&[("1", 100), ("2", 50)], &[("fcc", 10)]);
        assert!(calculate_changes(&current, Some(&previous)).is_empty());
    }

    #[test]
    fn test_shrinkage_is_negative() {
        let previous = snapshot(&[("1", 100)], &[]);
        let current = outcome(&[("1", 70)], &[]);

        let changes = calculate_changes(&current, Some(&previous));
        assert_eq!(changes[0].word_difference, -30);
    }

    #[test]
    fn test_new_entity_counts_from_zero() {
        let previous = snapshot(&[("1", 100)], &[]);
        let current = outcome(&[("1", 100), ("2", 40)], &[]);

        let changes = calculate_changes(&current, Some(&previous));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].entity, "2");
        assert_eq!(changes[0].word_difference, 40);
    }

    #[test]
    fn test_disappeared_entities_are_ignored() {
        let previous = snapshot(&[("1", 100), ("2", 40)], &[("gone-agency", 5)]);
        let current = outcome(&[("1", 100)], &[]);
        assert!(calculate_changes(&current, Some(&previous)).is_empty());
    }

    #[test]
    fn test_titles_ordered_before_agencies() {
        let previous = snapshot(&[("1", 100)], &[("fcc", 10)]);
        let current = outcome(&[("1", 130)], &[("fcc", 25)]);

        let changes = calculate_changes(&current, Some(&previous));
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].entity_type, EntityKind::Title);
        assert_eq!(changes[1].entity_type, EntityKind::Agency);
        assert_eq!(changes[1].word_difference, 15);
    }
}
