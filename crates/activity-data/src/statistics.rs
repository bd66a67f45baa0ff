//! Per-entity descriptive statistics derived from bucket counts.
//!
//! Definitions, all reproducible:
//!
//! * **peak**: the bucket with the highest count; ties go to the earliest
//!   bucket. Absent when the entity has no events.
//! * **trough**: the bucket with the lowest *positive* count; empty buckets
//!   are ignored and ties go to the earliest bucket.
//! * **day-parts**: morning `[6,12)`, afternoon `[12,18)`, evening `[18,22)`,
//!   night otherwise; percentages are relative to the entity's own resolved
//!   total.
//! * **coverage**: `resolved / (resolved + unresolved)`, `0.0` when both are
//!   zero.

use std::collections::HashMap;

use activity_core::formatting::{percentage, ratio, round_to};
use activity_core::models::UnresolvedFragment;
use activity_core::time_utils::{BucketKey, DayPart};
use serde::Serialize;

use crate::aggregator::{BucketSeries, EntityBucketCounts};
use crate::joiner::ReferenceTable;

// ── Public types ──────────────────────────────────────────────────────────────

/// A bucket singled out as most or least active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketExtreme {
    pub bucket: BucketKey,
    pub count: u64,
    /// `"HH:MM-HH:MM"`
    pub range_label: String,
    /// `"h:MM AM-h:MM AM"`
    pub range_label_12h: String,
}

impl BucketExtreme {
    fn new(bucket: BucketKey, count: u64) -> Self {
        Self {
            bucket,
            count,
            range_label: bucket.range_label(),
            range_label_12h: bucket.range_label_12h(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayPartCounts {
    pub morning: u64,
    pub afternoon: u64,
    pub evening: u64,
    pub night: u64,
}

impl DayPartCounts {
    pub fn get(&self, part: DayPart) -> u64 {
        match part {
            DayPart::Morning => self.morning,
            DayPart::Afternoon => self.afternoon,
            DayPart::Evening => self.evening,
            DayPart::Night => self.night,
        }
    }

    fn add(&mut self, part: DayPart, n: u64) {
        match part {
            DayPart::Morning => self.morning += n,
            DayPart::Afternoon => self.afternoon += n,
            DayPart::Evening => self.evening += n,
            DayPart::Night => self.night += n,
        }
    }

    pub fn total(&self) -> u64 {
        self.morning + self.afternoon + self.evening + self.night
    }
}

/// Day-part shares in percent, one decimal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DayPartPercentages {
    pub morning: f64,
    pub afternoon: f64,
    pub evening: f64,
    pub night: f64,
}

impl DayPartPercentages {
    pub fn get(&self, part: DayPart) -> f64 {
        match part {
            DayPart::Morning => self.morning,
            DayPart::Afternoon => self.afternoon,
            DayPart::Evening => self.evening,
            DayPart::Night => self.night,
        }
    }
}

/// Summary of one entity's activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStatistics {
    pub entity_key: String,
    pub total_resolved: u64,
    pub total_unresolved: u64,
    pub peak: Option<BucketExtreme>,
    pub trough: Option<BucketExtreme>,
    pub day_part_counts: DayPartCounts,
    pub day_part_percentages: DayPartPercentages,
    /// Buckets with at least one event.
    pub active_buckets: usize,
    /// `total_resolved / active_buckets`, two decimals.
    pub average_per_active_bucket: f64,
    /// `resolved / (resolved + unresolved)` in `[0, 1]`.
    pub coverage_ratio: f64,
    /// Share of the entity's fragments that did not resolve, one decimal.
    pub unresolved_percentage: f64,
}

impl EntityStatistics {
    pub fn peak_bucket(&self) -> Option<BucketKey> {
        self.peak.as_ref().map(|p| p.bucket)
    }

    pub fn trough_bucket(&self) -> Option<BucketKey> {
        self.trough.as_ref().map(|t| t.bucket)
    }

    /// Resolved plus unresolved fragments.
    pub fn total_fragments(&self) -> u64 {
        self.total_resolved + self.total_unresolved
    }
}

/// Statistics for every reported entity, plus fragments no entity owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsReport {
    pub entities: Vec<EntityStatistics>,
    /// Unresolved fragments whose parent key is absent from the reference
    /// table.
    pub unattributed: u64,
}

impl StatisticsReport {
    pub fn entity(&self, entity_key: &str) -> Option<&EntityStatistics> {
        self.entities.iter().find(|s| s.entity_key == entity_key)
    }
}

// ── StatisticsReporter ────────────────────────────────────────────────────────

/// Read-only summariser over aggregated counts.
pub struct StatisticsReporter;

impl StatisticsReporter {
    /// Summarise every entity in `counts`, in its order.
    ///
    /// Each unresolved fragment is charged to its own `entity_key` when set,
    /// otherwise to the entity its parent key maps to in `table`. Fragments
    /// with neither only raise `unattributed`.
    pub fn summarize(
        counts: &EntityBucketCounts,
        unresolved: &[UnresolvedFragment],
        table: &ReferenceTable,
    ) -> StatisticsReport {
        let mut per_entity: HashMap<&str, u64> = HashMap::new();
        let mut unattributed = 0u64;

        for fragment in unresolved {
            let owner = fragment
                .entity_key
                .as_deref()
                .or_else(|| table.entity_for(&fragment.parent_key));
            match owner {
                Some(entity) => *per_entity.entry(entity).or_default() += 1,
                None => unattributed += 1,
            }
        }

        let zero = [0u64; activity_core::BUCKET_COUNT];
        let entities = counts
            .entities()
            .map(|entity| {
                let series = counts.counts(entity).unwrap_or(&zero);
                let unresolved_count = per_entity.get(entity).copied().unwrap_or(0);
                Self::summarize_entity(entity, series, unresolved_count)
            })
            .collect();

        StatisticsReport {
            entities,
            unattributed,
        }
    }

    /// Statistics for a single entity's series.
    pub fn summarize_entity(
        entity_key: &str,
        series: &BucketSeries,
        total_unresolved: u64,
    ) -> EntityStatistics {
        let total_resolved: u64 = series.iter().sum();
        let active_buckets = series.iter().filter(|&&c| c > 0).count();

        let mut day_part_counts = DayPartCounts::default();
        for bucket in BucketKey::all() {
            day_part_counts.add(bucket.day_part(), series[bucket.index()]);
        }

        let share = |part: DayPart| {
            percentage(
                day_part_counts.get(part) as f64,
                total_resolved as f64,
                1,
            )
        };
        let day_part_percentages = DayPartPercentages {
            morning: share(DayPart::Morning),
            afternoon: share(DayPart::Afternoon),
            evening: share(DayPart::Evening),
            night: share(DayPart::Night),
        };

        let total_fragments = total_resolved + total_unresolved;

        EntityStatistics {
            entity_key: entity_key.to_string(),
            total_resolved,
            total_unresolved,
            peak: peak_bucket(series),
            trough: trough_bucket(series),
            day_part_counts,
            day_part_percentages,
            active_buckets,
            average_per_active_bucket: round_to(ratio(total_resolved, active_buckets as u64), 2),
            coverage_ratio: ratio(total_resolved, total_fragments),
            unresolved_percentage: percentage(
                total_unresolved as f64,
                total_fragments as f64,
                1,
            ),
        }
    }
}

/// Highest count, earliest bucket on ties. `None` when every bucket is zero.
pub fn peak_bucket(series: &BucketSeries) -> Option<BucketExtreme> {
    let mut best: Option<(BucketKey, u64)> = None;
    for (bucket, &count) in BucketKey::all().zip(series.iter()) {
        if count == 0 {
            continue;
        }
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((bucket, count)),
        }
    }
    best.map(|(bucket, count)| BucketExtreme::new(bucket, count))
}

/// Lowest positive count, earliest bucket on ties. `None` when every bucket
/// is zero.
pub fn trough_bucket(series: &BucketSeries) -> Option<BucketExtreme> {
    let mut best: Option<(BucketKey, u64)> = None;
    for (bucket, &count) in BucketKey::all().zip(series.iter()) {
        if count == 0 {
            continue;
        }
        match best {
            Some((_, best_count)) if count >= best_count => {}
            _ => best = Some((bucket, count)),
        }
    }
    best.map(|(bucket, count)| BucketExtreme::new(bucket, count))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use activity_core::models::{ReferenceRow, UnresolvedReason};
    use activity_core::BUCKET_COUNT;

    fn series(points: &[(usize, u64)]) -> BucketSeries {
        let mut s = [0u64; BUCKET_COUNT];
        for &(i, c) in points {
            s[i] = c;
        }
        s
    }

    fn unresolved(parent: &str) -> UnresolvedFragment {
        UnresolvedFragment {
            parent_key: parent.to_string(),
            entity_key: None,
            text: "no date".to_string(),
            reason: UnresolvedReason::NoTimestampFound,
        }
    }

    // ── peak / trough ────────────────────────────────────────────────────────

    #[test]
    fn test_peak_tie_goes_to_earliest_bucket() {
        let s = series(&[(5, 3), (40, 3), (60, 1)]);
        let peak = peak_bucket(&s).unwrap();
        assert_eq!(peak.bucket.index(), 5);
        assert_eq!(peak.count, 3);
    }

    #[test]
    fn test_trough_ignores_zero_buckets() {
        let s = series(&[(10, 4), (20, 2), (30, 2), (50, 7)]);
        let trough = trough_bucket(&s).unwrap();
        assert_eq!(trough.bucket.index(), 20);
        assert_eq!(trough.count, 2);
    }

    #[test]
    fn test_peak_and_trough_absent_for_empty_series() {
        let s = series(&[]);
        assert!(peak_bucket(&s).is_none());
        assert!(trough_bucket(&s).is_none());
    }

    #[test]
    fn test_single_active_bucket_is_both_peak_and_trough() {
        let s = series(&[(95, 1)]);
        assert_eq!(peak_bucket(&s).unwrap().bucket.index(), 95);
        assert_eq!(trough_bucket(&s).unwrap().bucket.index(), 95);
    }

    #[test]
    fn test_extreme_labels() {
        let s = series(&[(12, 9)]);
        let peak = peak_bucket(&s).unwrap();
        assert_eq!(peak.range_label, "03:00-03:14");
        assert_eq!(peak.range_label_12h, "3:00 AM-3:14 AM");
    }

    // ── summarize_entity ─────────────────────────────────────────────────────

    #[test]
    fn test_day_part_counts_and_percentages() {
        // 05:45 night, 06:00 morning x2, 12:00 afternoon, 21:45 evening,
        // 22:00 night, 23:45 night
        let s = series(&[(23, 1), (24, 2), (48, 1), (87, 1), (88, 1), (95, 1)]);
        let stats = StatisticsReporter::summarize_entity("A", &s, 0);

        assert_eq!(stats.total_resolved, 7);
        assert_eq!(stats.day_part_counts.morning, 2);
        assert_eq!(stats.day_part_counts.afternoon, 1);
        assert_eq!(stats.day_part_counts.evening, 1);
        assert_eq!(stats.day_part_counts.night, 3);
        assert_eq!(stats.day_part_counts.total(), stats.total_resolved);
        assert!((stats.day_part_percentages.morning - 28.6).abs() < 1e-9);
        assert!((stats.day_part_percentages.night - 42.9).abs() < 1e-9);
    }

    #[test]
    fn test_average_per_active_bucket() {
        let s = series(&[(1, 1), (2, 2)]);
        let stats = StatisticsReporter::summarize_entity("A", &s, 0);
        assert_eq!(stats.active_buckets, 2);
        assert!((stats.average_per_active_bucket - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_coverage_ratio() {
        let s = series(&[(0, 3)]);
        let stats = StatisticsReporter::summarize_entity("A", &s, 1);
        assert!((stats.coverage_ratio - 0.75).abs() < 1e-9);
        assert!((stats.unresolved_percentage - 25.0).abs() < 1e-9);
        assert_eq!(stats.total_fragments(), 4);
    }

    #[test]
    fn test_zero_denominator_is_zero_not_nan() {
        let stats = StatisticsReporter::summarize_entity("A", &series(&[]), 0);
        assert_eq!(stats.coverage_ratio, 0.0);
        assert_eq!(stats.unresolved_percentage, 0.0);
        assert_eq!(stats.average_per_active_bucket, 0.0);
        assert_eq!(stats.day_part_percentages, DayPartPercentages::default());
        assert!(stats.peak.is_none());
    }

    #[test]
    fn test_only_unresolved_has_zero_coverage() {
        let stats = StatisticsReporter::summarize_entity("A", &series(&[]), 4);
        assert_eq!(stats.coverage_ratio, 0.0);
        assert!((stats.unresolved_percentage - 100.0).abs() < 1e-9);
    }

    // ── summarize ────────────────────────────────────────────────────────────

    #[test]
    fn test_summarize_attributes_unresolved_through_table() {
        use crate::aggregator::BucketAggregator;

        let table = ReferenceTable::new(vec![
            ReferenceRow::new("1", "Flipkart", ""),
            ReferenceRow::new("2", "Myntra", ""),
        ]);
        let counts = BucketAggregator::with_entities(table.entities().iter().cloned()).finish();
        let report = StatisticsReporter::summarize(
            &counts,
            &[unresolved("1"), unresolved("1.0"), unresolved("2"), unresolved("77")],
            &table,
        );

        assert_eq!(report.entity("Flipkart").unwrap().total_unresolved, 2);
        assert_eq!(report.entity("Myntra").unwrap().total_unresolved, 1);
        assert_eq!(report.unattributed, 1);
        let order: Vec<&str> = report.entities.iter().map(|s| s.entity_key.as_str()).collect();
        assert_eq!(order, vec!["Flipkart", "Myntra"]);
    }

    #[test]
    fn test_summarize_prefers_fragment_entity_over_table() {
        use crate::aggregator::BucketAggregator;

        let table = ReferenceTable::new(vec![
            ReferenceRow::new("1", "A", ""),
            ReferenceRow::new("1", "B", ""),
        ]);
        let counts = BucketAggregator::with_entities(table.entities().iter().cloned()).finish();
        let owned = UnresolvedFragment {
            entity_key: Some("B".to_string()),
            ..unresolved("1")
        };
        let report = StatisticsReporter::summarize(&counts, &[owned, unresolved("1")], &table);

        assert_eq!(report.entity("A").unwrap().total_unresolved, 1);
        assert_eq!(report.entity("B").unwrap().total_unresolved, 1);
        assert_eq!(report.unattributed, 0);
    }
}
