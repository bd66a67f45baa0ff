//! Main bucketing pipeline.
//!
//! Orchestrates splitting, timestamp extraction, entity resolution,
//! aggregation and statistics, returning an [`EngineReport`] ready for the
//! reporting layer.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use activity_core::config::{AnalysisMode, EngineConfig};
use activity_core::error::{ActivityError, Result};
use activity_core::extractor::{ExtractFailure, TimestampExtractor};
use activity_core::formatting::truncate_chars;
use activity_core::models::{
    Fragment, RawRecord, TimestampedEvent, UnresolvedFragment, UnresolvedReason,
};
use activity_core::time_utils::BucketKey;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregator::{BucketAggregator, BucketRow, EntityBucketCounts};
use crate::joiner::{EntityJoiner, ReferenceTable};
use crate::reader::{load_composite_records, load_reference_rows};
use crate::splitter::RecordSplitter;
use crate::statistics::{StatisticsReport, StatisticsReporter};

/// Buckets per hour; the hourly view samples every fourth bucket.
const BUCKETS_PER_HOUR: usize = 4;

// ── Public types ──────────────────────────────────────────────────────────────

/// Counters describing one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub mode: AnalysisMode,
    /// Non-blank fragments that entered extraction.
    pub fragments_seen: u64,
    /// Fragments that became events, selected entities or not.
    pub fragments_resolved: u64,
    pub fragments_unresolved: u64,
    /// Resolved events owned by entities outside the selection.
    pub events_outside_selection: u64,
    /// Unresolved fragments whose parent key has no entity.
    pub unattributed: u64,
    pub entities_reported: usize,
    pub unresolved_by_reason: BTreeMap<UnresolvedReason, u64>,
}

/// Combined count at the first bucket of an hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyTick {
    pub bucket: BucketKey,
    /// `"HH:MM"`
    pub time_label: String,
    pub count: u64,
}

/// One event in a point-lookup listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketEntry {
    pub timestamp: DateTime<Utc>,
    pub parent_key: String,
    /// The parent row's message when one exists, otherwise the fragment text.
    pub text: String,
}

/// The complete output of [`run`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineReport {
    /// Reported entities, in reporting order.
    pub entities: Vec<String>,
    /// 96 rows per reported entity.
    pub buckets: Vec<BucketRow>,
    pub statistics: StatisticsReport,
    /// Per-bucket sum over the reported entities.
    pub combined: Vec<u64>,
    pub hourly_ticks: Vec<HourlyTick>,
    pub metadata: RunMetadata,
    pub unresolved: Vec<UnresolvedFragment>,
    #[serde(skip)]
    pub counts: EntityBucketCounts,
}

impl EngineReport {
    /// `true` when no fragment reached the extractor.
    pub fn is_empty(&self) -> bool {
        self.metadata.fragments_seen == 0
    }

    /// Events of `entity_key` in `bucket`, oldest first.
    pub fn events_in_bucket(&self, entity_key: &str, bucket: BucketKey) -> Vec<&TimestampedEvent> {
        self.counts.events_in_bucket(entity_key, bucket)
    }

    /// [`EngineReport::events_in_bucket`] with each event's display text
    /// taken from the reference table where possible.
    pub fn bucket_listing(
        &self,
        table: &ReferenceTable,
        entity_key: &str,
        bucket: BucketKey,
    ) -> Vec<BucketEntry> {
        self.events_in_bucket(entity_key, bucket)
            .into_iter()
            .map(|event| {
                let text = table
                    .row_for_entity(&event.parent_key, &event.entity_key)
                    .and_then(|row| row.message.clone())
                    .unwrap_or_else(|| event.source_text.clone());
                BucketEntry {
                    timestamp: event.timestamp,
                    parent_key: event.parent_key.clone(),
                    text,
                }
            })
            .collect()
    }
}

/// Reference table and report from an on-disk run.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub table: ReferenceTable,
    pub report: EngineReport,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the full pipeline over in-memory inputs.
///
/// 1. Collect fragments: one per reference row in posts mode, the split
///    composite fields in comments mode.
/// 2. Extract a timestamp from each fragment and resolve its entity.
/// 3. Aggregate events of the selected entities into 96 buckets.
/// 4. Summarise per entity and across entities.
///
/// Per-fragment failures never abort the run; they are returned in
/// [`EngineReport::unresolved`]. Only an unusable configuration is an error.
pub fn run(
    table: &ReferenceTable,
    records: &[RawRecord],
    config: &EngineConfig,
) -> Result<EngineReport> {
    config.validate()?;
    let extractor = TimestampExtractor::with_snippet_len(config.snippet_len);
    let mut collector = Collector::new(config.snippet_len);

    // ── Step 1-2: Extract and resolve ─────────────────────────────────────────
    match config.mode {
        AnalysisMode::Posts => {
            for row in table.rows() {
                let text = row.origin_timestamp.trim();
                if text.is_empty() {
                    debug!("Row {} has no origin timestamp, skipping", row.parent_key);
                    continue;
                }
                let fragment = Fragment {
                    parent_key: row.parent_key.clone(),
                    text: text.to_string(),
                };
                collector.seen += 1;
                match extractor.extract_detailed(&fragment.text) {
                    Ok(extracted) => collector.resolved(TimestampedEvent {
                        parent_key: fragment.parent_key,
                        entity_key: row.entity_key.clone(),
                        timestamp: extracted.timestamp,
                        source_offset_secs: extracted.offset.local_minus_utc(),
                        source_text: fragment.text,
                    }),
                    Err(failure) => {
                        collector.extract_failed(fragment, Some(row.entity_key.clone()), &failure)
                    }
                }
            }
        }
        AnalysisMode::Comments => {
            let splitter = RecordSplitter::new(config.separator.as_str())?;
            for record in records {
                for fragment in splitter.split(record) {
                    collector.seen += 1;
                    let extracted = match extractor.extract_detailed(&fragment.text) {
                        Ok(e) => e,
                        Err(failure) => {
                            collector.extract_failed(fragment, None, &failure);
                            continue;
                        }
                    };
                    match EntityJoiner::resolve(&fragment.parent_key, table) {
                        Ok(entity) => collector.resolved(TimestampedEvent {
                            parent_key: fragment.parent_key,
                            entity_key: entity.to_string(),
                            timestamp: extracted.timestamp,
                            source_offset_secs: extracted.offset.local_minus_utc(),
                            source_text: fragment.text,
                        }),
                        Err(failure) => {
                            warn!("Unresolved fragment: {}", failure);
                            collector.push_unresolved(fragment, None, failure.reason());
                        }
                    }
                }
            }
        }
    }

    debug!(
        "Pipeline: {} fragments seen, {} resolved, {} unresolved",
        collector.seen,
        collector.events.len(),
        collector.unresolved.len()
    );

    // ── Step 3: Aggregate ─────────────────────────────────────────────────────
    // An empty table has nothing to report, even for named targets.
    let entities = if table.is_empty() {
        Vec::new()
    } else {
        config.selection.resolve(table.entities())
    };
    let selected: HashSet<&str> = entities.iter().map(String::as_str).collect();

    let fragments_resolved = collector.events.len() as u64;
    let mut aggregator = BucketAggregator::with_entities(entities.iter().cloned());
    let mut events_outside_selection = 0u64;
    for event in collector.events {
        if selected.contains(event.entity_key.as_str()) {
            aggregator.add(event);
        } else {
            events_outside_selection += 1;
        }
    }
    let counts = aggregator.finish();

    // ── Step 4: Summarise ─────────────────────────────────────────────────────
    let statistics = StatisticsReporter::summarize(&counts, &collector.unresolved, table);
    let combined = counts.combined(&entities).to_vec();
    let hourly_ticks = hourly_ticks(&combined);

    let mut unresolved_by_reason: BTreeMap<UnresolvedReason, u64> =
        UnresolvedReason::ALL.iter().map(|&r| (r, 0)).collect();
    for fragment in &collector.unresolved {
        *unresolved_by_reason.entry(fragment.reason).or_default() += 1;
    }

    let metadata = RunMetadata {
        mode: config.mode,
        fragments_seen: collector.seen,
        fragments_resolved,
        fragments_unresolved: collector.unresolved.len() as u64,
        events_outside_selection,
        unattributed: statistics.unattributed,
        entities_reported: entities.len(),
        unresolved_by_reason,
    };

    Ok(EngineReport {
        buckets: counts.rows(),
        entities,
        statistics,
        combined,
        hourly_ticks,
        metadata,
        unresolved: collector.unresolved,
        counts,
    })
}

/// Load JSONL inputs from disk and [`run`] the pipeline.
///
/// `comments` is required in comments mode and ignored in posts mode. A
/// missing or empty input yields an empty report rather than an error.
pub fn analyze_paths(
    posts: &Path,
    comments: Option<&Path>,
    config: &EngineConfig,
) -> Result<Analysis> {
    let load_start = std::time::Instant::now();
    let table = ReferenceTable::new(load_reference_rows(posts));

    let records = match (config.mode, comments) {
        (AnalysisMode::Posts, _) => Vec::new(),
        (AnalysisMode::Comments, Some(path)) => load_composite_records(path),
        (AnalysisMode::Comments, None) => {
            return Err(ActivityError::Config(
                "comments mode needs a comments input".to_string(),
            ))
        }
    };
    debug!(
        "Loaded {} reference rows and {} composite records in {:.3}s",
        table.len(),
        records.len(),
        load_start.elapsed().as_secs_f64()
    );

    let report = run(&table, &records, config)?;
    Ok(Analysis { table, report })
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Accumulates events and failures while fragments stream through.
struct Collector {
    snippet_len: usize,
    seen: u64,
    events: Vec<TimestampedEvent>,
    unresolved: Vec<UnresolvedFragment>,
}

impl Collector {
    fn new(snippet_len: usize) -> Self {
        Self {
            snippet_len,
            seen: 0,
            events: Vec::new(),
            unresolved: Vec::new(),
        }
    }

    fn resolved(&mut self, event: TimestampedEvent) {
        self.events.push(event);
    }

    fn extract_failed(
        &mut self,
        fragment: Fragment,
        entity_key: Option<String>,
        failure: &ExtractFailure,
    ) {
        warn!("Unresolved fragment (parent {}): {}", fragment.parent_key, failure);
        self.push_unresolved(fragment, entity_key, failure.reason());
    }

    fn push_unresolved(
        &mut self,
        fragment: Fragment,
        entity_key: Option<String>,
        reason: UnresolvedReason,
    ) {
        debug!(
            "Fragment {:?} from parent {} unresolved: {}",
            truncate_chars(&fragment.text, self.snippet_len),
            fragment.parent_key,
            reason.as_str()
        );
        self.unresolved.push(UnresolvedFragment {
            parent_key: fragment.parent_key,
            entity_key,
            text: fragment.text,
            reason,
        });
    }
}

/// Combined counts at buckets 0, 4, …, 92.
fn hourly_ticks(combined: &[u64]) -> Vec<HourlyTick> {
    BucketKey::all()
        .step_by(BUCKETS_PER_HOUR)
        .map(|bucket| HourlyTick {
            bucket,
            time_label: bucket.start_label(),
            count: combined.get(bucket.index()).copied().unwrap_or(0),
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
