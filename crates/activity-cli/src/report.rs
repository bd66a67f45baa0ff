//! Text and JSON rendering of an [`EngineReport`].

use std::fmt::Write;

use activity_data::analysis::{BucketEntry, EngineReport};
use activity_data::core::config::AnalysisMode;
use activity_data::core::formatting::{format_count, format_number, truncate_with_ellipsis};
use activity_data::core::models::UnresolvedReason;
use activity_data::core::time_utils::{format_event_time, BucketKey, DayPart};
use activity_data::statistics::{BucketExtreme, EntityStatistics};
use serde::Serialize;

/// Characters of message text shown per listed event.
pub const LISTING_SNIPPET_LEN: usize = 100;

const RULE_WIDTH: usize = 60;

/// Events of one entity in one bucket, as requested with `--bucket`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketListing {
    pub entity: String,
    pub bucket: BucketKey,
    pub entries: Vec<BucketEntry>,
}

// ── JSON ───────────────────────────────────────────────────────────────────────

/// Pretty JSON of the whole report, with the listing under `bucketListing`
/// when one was requested.
pub fn render_json(report: &EngineReport, listing: Option<&BucketListing>) -> anyhow::Result<String> {
    let mut value = serde_json::to_value(report)?;
    if let (Some(listing), Some(map)) = (listing, value.as_object_mut()) {
        map.insert("bucketListing".to_string(), serde_json::to_value(listing)?);
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

// ── Text ───────────────────────────────────────────────────────────────────────

/// Full text report: one block per entity, the combined hourly view and the
/// run summary. An input without fragments renders an explicit notice.
pub fn render_text(report: &EngineReport) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    let mode = match report.metadata.mode {
        AnalysisMode::Posts => "posts",
        AnalysisMode::Comments => "comments",
    };
    let _ = writeln!(out, "Activity by 15-minute bucket ({} mode)", mode);
    let _ = writeln!(out, "{}", rule);

    if report.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "No data: the input contained no fragments to bucket.");
        if !report.entities.is_empty() {
            let _ = writeln!(
                out,
                "Entities with zero activity: {}",
                report.entities.join(", ")
            );
        }
        return out;
    }

    for stats in &report.statistics.entities {
        let _ = writeln!(out);
        render_entity(&mut out, report, stats);
    }

    let _ = writeln!(out);
    render_hourly(&mut out, report);
    let _ = writeln!(out);
    render_summary(&mut out, report);
    out
}

fn render_entity(out: &mut String, report: &EngineReport, stats: &EntityStatistics) {
    let _ = writeln!(out, "{}", stats.entity_key);
    let _ = writeln!(out, "{}", "-".repeat(stats.entity_key.chars().count().max(3)));
    let _ = writeln!(
        out,
        "  Resolved: {}  Unresolved: {} ({}%)  Coverage: {}%",
        format_count(stats.total_resolved),
        format_count(stats.total_unresolved),
        format_number(stats.unresolved_percentage, 1),
        format_number(stats.coverage_ratio * 100.0, 1),
    );

    if stats.total_resolved == 0 {
        let _ = writeln!(out, "  No timestamped activity.");
        return;
    }

    if let Some(peak) = &stats.peak {
        let _ = writeln!(out, "  Most active:  {}", extreme_line(peak));
    }
    if let Some(trough) = &stats.trough {
        let _ = writeln!(out, "  Least active: {}", extreme_line(trough));
    }
    let _ = writeln!(
        out,
        "  Active buckets: {} of 96, {} events per active bucket",
        stats.active_buckets,
        format_number(stats.average_per_active_bucket, 2),
    );

    let _ = writeln!(out, "  Day parts:");
    for part in DayPart::ALL {
        let _ = writeln!(
            out,
            "    {:<10} {:<12} {:>8}  {:>5}%",
            part.name(),
            part.window(),
            format_count(stats.day_part_counts.get(part)),
            format_number(stats.day_part_percentages.get(part), 1),
        );
    }

    let _ = writeln!(out, "  Buckets:");
    if let Some(series) = report.counts.counts(&stats.entity_key) {
        for bucket in BucketKey::all() {
            let count = series[bucket.index()];
            if count == 0 {
                continue;
            }
            let _ = writeln!(
                out,
                "    {}  {:<18} {:>8}",
                bucket.range_label(),
                bucket.range_label_12h(),
                format_count(count),
            );
        }
    }
}

fn extreme_line(extreme: &BucketExtreme) -> String {
    format!(
        "{} ({}), {} events",
        extreme.range_label,
        extreme.range_label_12h,
        format_count(extreme.count)
    )
}

fn render_hourly(out: &mut String, report: &EngineReport) {
    let _ = writeln!(out, "Combined activity (hourly ticks)");
    for tick in &report.hourly_ticks {
        let _ = writeln!(out, "  {}  {:>8}", tick.time_label, format_count(tick.count));
    }
}

fn render_summary(out: &mut String, report: &EngineReport) {
    let meta = &report.metadata;
    let _ = writeln!(out, "Run summary");
    let _ = writeln!(
        out,
        "  Fragments: {} seen, {} resolved, {} unresolved",
        format_count(meta.fragments_seen),
        format_count(meta.fragments_resolved),
        format_count(meta.fragments_unresolved),
    );
    for reason in UnresolvedReason::ALL {
        let n = meta.unresolved_by_reason.get(&reason).copied().unwrap_or(0);
        let _ = writeln!(out, "    {:<22} {:>8}", reason.as_str(), format_count(n));
    }
    if meta.events_outside_selection > 0 {
        let _ = writeln!(
            out,
            "  Events of unreported entities: {}",
            format_count(meta.events_outside_selection)
        );
    }
    let _ = writeln!(
        out,
        "  Unattributed fragments: {}",
        format_count(meta.unattributed)
    );
}

// ── Bucket listing ─────────────────────────────────────────────────────────────

/// Point-lookup listing of the events one entity produced in one bucket.
pub fn render_bucket_listing(listing: &BucketListing) -> String {
    let BucketListing {
        entity,
        bucket,
        entries,
    } = listing;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: {} events in {} ({})",
        entity,
        entries.len(),
        bucket.range_label(),
        bucket.range_label_12h(),
    );
    if entries.is_empty() {
        let _ = writeln!(out, "  No events in this bucket.");
        return out;
    }
    for (i, entry) in entries.iter().enumerate() {
        let text = entry.text.replace(&['\n', '\r'][..], " ");
        let _ = writeln!(
            out,
            "  {:>3}. {}  [{}]  {}",
            i + 1,
            format_event_time(&entry.timestamp),
            entry.parent_key,
            truncate_with_ellipsis(&text, LISTING_SNIPPET_LEN),
        );
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
