//! Time-of-day aggregation into 96 fifteen-minute buckets per entity.

use std::collections::HashMap;

use activity_core::models::TimestampedEvent;
use activity_core::time_utils::{BucketKey, BUCKET_COUNT};
use serde::Serialize;

/// Fixed, zero-initialised counters for one entity, index-aligned to
/// [`BucketKey`].
pub type BucketSeries = [u64; BUCKET_COUNT];

// ── BucketRow ─────────────────────────────────────────────────────────────────

/// One row of the exported bucket table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketRow {
    pub entity_key: String,
    pub bucket: BucketKey,
    /// Bucket start as `"HH:MM"`.
    pub time_label: String,
    pub count: u64,
}

// ── EntityBucketCounts ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct EntitySeries {
    entity_key: String,
    counts: BucketSeries,
    /// Indexes into `EntityBucketCounts::events`.
    event_ids: Vec<usize>,
}

impl EntitySeries {
    fn new(entity_key: String) -> Self {
        Self {
            entity_key,
            counts: [0; BUCKET_COUNT],
            event_ids: Vec::new(),
        }
    }
}

/// Per-entity bucket counters produced by [`BucketAggregator`].
///
/// Read-only once built. Every entity present has all 96 buckets, zero
/// where nothing happened.
#[derive(Debug, Clone, Default)]
pub struct EntityBucketCounts {
    series: Vec<EntitySeries>,
    index: HashMap<String, usize>,
    events: Vec<TimestampedEvent>,
}

impl EntityBucketCounts {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Number of entities with a series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Entity keys in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.entity_key.as_str())
    }

    pub fn counts(&self, entity_key: &str) -> Option<&BucketSeries> {
        self.index.get(entity_key).map(|&i| &self.series[i].counts)
    }

    /// Count at one bucket, `0` for unknown entities.
    pub fn count(&self, entity_key: &str, bucket: BucketKey) -> u64 {
        self.counts(entity_key)
            .map(|c| c[bucket.index()])
            .unwrap_or(0)
    }

    /// Sum of all buckets for `entity_key`.
    pub fn total(&self, entity_key: &str) -> u64 {
        self.counts(entity_key)
            .map(|c| c.iter().sum())
            .unwrap_or(0)
    }

    /// Total number of events across every entity.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// The full bucket table: 96 rows per entity, entities in order.
    pub fn rows(&self) -> Vec<BucketRow> {
        self.series
            .iter()
            .flat_map(|s| Self::series_rows(s))
            .collect()
    }

    /// The 96 rows for a single entity, or an empty list if unknown.
    pub fn rows_for(&self, entity_key: &str) -> Vec<BucketRow> {
        self.index
            .get(entity_key)
            .map(|&i| Self::series_rows(&self.series[i]).collect())
            .unwrap_or_default()
    }

    fn series_rows(series: &EntitySeries) -> impl Iterator<Item = BucketRow> + '_ {
        BucketKey::all().map(move |bucket| BucketRow {
            entity_key: series.entity_key.clone(),
            bucket,
            time_label: bucket.start_label(),
            count: series.counts[bucket.index()],
        })
    }

    /// Events of `entity_key` that fell into `bucket`, oldest first.
    /// Events with equal timestamps keep their arrival order.
    pub fn events_in_bucket(&self, entity_key: &str, bucket: BucketKey) -> Vec<&TimestampedEvent> {
        let Some(&i) = self.index.get(entity_key) else {
            return Vec::new();
        };
        let mut found: Vec<&TimestampedEvent> = self.series[i]
            .event_ids
            .iter()
            .map(|&id| &self.events[id])
            .filter(|e| BucketKey::from_timestamp(&e.timestamp) == bucket)
            .collect();
        found.sort_by_key(|e| e.timestamp);
        found
    }

    /// Element-wise sum of the series of `entity_keys`. Unknown keys add
    /// nothing.
    pub fn combined<S: AsRef<str>>(&self, entity_keys: &[S]) -> BucketSeries {
        let mut total = [0u64; BUCKET_COUNT];
        for key in entity_keys {
            if let Some(counts) = self.counts(key.as_ref()) {
                for (slot, c) in total.iter_mut().zip(counts.iter()) {
                    *slot += c;
                }
            }
        }
        total
    }
}

// ── BucketAggregator ──────────────────────────────────────────────────────────

/// Accumulates [`TimestampedEvent`]s into [`EntityBucketCounts`].
///
/// Owns the counters exclusively until [`BucketAggregator::finish`].
#[derive(Debug, Default)]
pub struct BucketAggregator {
    counts: EntityBucketCounts,
}

impl BucketAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register zero-filled series so that output order follows
    /// `entities` rather than event arrival.
    pub fn with_entities<I, S>(entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut agg = Self::new();
        for entity in entities {
            agg.series_index(entity.into());
        }
        agg
    }

    fn series_index(&mut self, entity_key: String) -> usize {
        if let Some(&i) = self.counts.index.get(&entity_key) {
            return i;
        }
        let i = self.counts.series.len();
        self.counts.index.insert(entity_key.clone(), i);
        self.counts.series.push(EntitySeries::new(entity_key));
        i
    }

    /// Count one event in its entity's bucket.
    pub fn add(&mut self, event: TimestampedEvent) {
        let bucket = BucketKey::from_timestamp(&event.timestamp);
        let i = self.series_index(event.entity_key.clone());
        let event_id = self.counts.events.len();

        let series = &mut self.counts.series[i];
        series.counts[bucket.index()] += 1;
        series.event_ids.push(event_id);

        self.counts.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = TimestampedEvent>) {
        for event in events {
            self.add(event);
        }
    }

    /// Hand the finished counters to readers.
    pub fn finish(self) -> EntityBucketCounts {
        self.counts
    }

    /// Aggregate `events` in one call.
    pub fn accumulate(events: impl IntoIterator<Item = TimestampedEvent>) -> EntityBucketCounts {
        let mut agg = Self::new();
        agg.extend(events);
        agg.finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, h, m, 0).unwrap()
    }

    fn event(entity: &str, at: DateTime<Utc>) -> TimestampedEvent {
        TimestampedEvent {
            parent_key: "p".to_string(),
            entity_key: entity.to_string(),
            timestamp: at,
            source_offset_secs: 0,
            source_text: format!("{entity} at {at}"),
        }
    }

    fn bucket(i: usize) -> BucketKey {
        BucketKey::new(i).unwrap()
    }

    // ── accumulate ───────────────────────────────────────────────────────────

    #[test]
    fn test_accumulate_counts_by_bucket() {
        let counts = BucketAggregator::accumulate(vec![
            event("A", ts(3, 0)),
            event("A", ts(3, 14)),
            event("A", ts(3, 15)),
            event("B", ts(23, 59)),
        ]);

        assert_eq!(counts.count("A", bucket(12)), 2);
        assert_eq!(counts.count("A", bucket(13)), 1);
        assert_eq!(counts.count("B", bucket(95)), 1);
        assert_eq!(counts.total("A"), 3);
        assert_eq!(counts.event_count(), 4);
    }

    #[test]
    fn test_every_entity_has_96_zero_filled_rows() {
        let counts = BucketAggregator::accumulate(vec![event("A", ts(9, 30))]);
        let rows = counts.rows_for("A");

        assert_eq!(rows.len(), BUCKET_COUNT);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.bucket.index(), i);
        }
        assert_eq!(rows.iter().map(|r| r.count).sum::<u64>(), counts.total("A"));
        assert_eq!(rows[38].count, 1);
        assert_eq!(rows[38].time_label, "09:30");
        assert_eq!(rows[0].count, 0);
    }

    #[test]
    fn test_rows_follow_registration_order() {
        let mut agg = BucketAggregator::with_entities(["Z", "A"]);
        agg.add(event("A", ts(0, 0)));
        agg.add(event("Q", ts(0, 0)));
        let counts = agg.finish();

        let order: Vec<&str> = counts.entities().collect();
        assert_eq!(order, vec!["Z", "A", "Q"]);

        let rows = counts.rows();
        assert_eq!(rows.len(), 3 * BUCKET_COUNT);
        assert_eq!(rows[0].entity_key, "Z");
        assert_eq!(rows[BUCKET_COUNT].entity_key, "A");
    }

    #[test]
    fn test_preregistered_entity_without_events_is_all_zero() {
        let counts = BucketAggregator::with_entities(["Idle"]).finish();
        assert_eq!(counts.counts("Idle"), Some(&[0u64; BUCKET_COUNT]));
        assert_eq!(counts.rows_for("Idle").len(), BUCKET_COUNT);
    }

    #[test]
    fn test_unknown_entity_reads_as_zero() {
        let counts = BucketAggregator::accumulate(Vec::new());
        assert!(counts.is_empty());
        assert_eq!(counts.total("nobody"), 0);
        assert!(counts.rows_for("nobody").is_empty());
    }

    #[test]
    fn test_accumulate_is_order_independent() {
        let a = vec![
            event("A", ts(1, 0)),
            event("B", ts(2, 0)),
            event("A", ts(1, 5)),
        ];
        let mut b = a.clone();
        b.reverse();

        let mut ca = BucketAggregator::with_entities(["A", "B"]);
        let mut cb = BucketAggregator::with_entities(["A", "B"]);
        ca.extend(a);
        cb.extend(b);
        assert_eq!(ca.finish().rows(), cb.finish().rows());
    }

    // ── events_in_bucket ─────────────────────────────────────────────────────

    #[test]
    fn test_events_in_bucket_sorted_ascending() {
        let counts = BucketAggregator::accumulate(vec![
            event("A", ts(3, 12)),
            event("A", ts(3, 1)),
            event("A", ts(3, 30)),
            event("B", ts(3, 5)),
            event("A", Utc.with_ymd_and_hms(2022, 6, 1, 3, 7, 0).unwrap()),
        ]);

        let found = counts.events_in_bucket("A", bucket(12));
        let times: Vec<DateTime<Utc>> = found.iter().map(|e| e.timestamp).collect();
        assert_eq!(
            times,
            vec![
                Utc.with_ymd_and_hms(2022, 6, 1, 3, 7, 0).unwrap(),
                ts(3, 1),
                ts(3, 12),
            ]
        );
    }

    #[test]
    fn test_events_in_bucket_unknown_entity() {
        let counts = BucketAggregator::accumulate(vec![event("A", ts(3, 0))]);
        assert!(counts.events_in_bucket("B", bucket(12)).is_empty());
    }

    // ── combined ─────────────────────────────────────────────────────────────

    #[test]
    fn test_combined_sums_selected_entities() {
        let counts = BucketAggregator::accumulate(vec![
            event("A", ts(0, 0)),
            event("B", ts(0, 10)),
            event("C", ts(0, 10)),
        ]);
        let combined = counts.combined(&["A", "B", "missing"]);
        assert_eq!(combined[0], 2);
        assert_eq!(combined.iter().sum::<u64>(), 2);
    }
}
