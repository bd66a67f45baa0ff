//! End-to-end runs of the bucketing pipeline over JSONL inputs.

use std::io::Write;
use std::path::{Path, PathBuf};

use activity_data::analysis::{analyze_paths, run};
use activity_data::core::config::{EngineConfig, EntitySelection};
use activity_data::core::models::{RawRecord, ReferenceRow, UnresolvedReason};
use activity_data::core::{BucketKey, BUCKET_COUNT};
use activity_data::joiner::ReferenceTable;
use chrono::{TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;

fn write_jsonl(dir: &Path, name: &str, lines: &[serde_json::Value]) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    path
}

fn bucket(i: usize) -> BucketKey {
    BucketKey::new(i).unwrap()
}

/// Posts for two pages plus a comment file mixing all three encodings,
/// malformed dates and an orphan parent.
fn fixture(dir: &Path) -> (PathBuf, PathBuf) {
    let posts = write_jsonl(
        dir,
        "posts.jsonl",
        &[
            json!({"pid": 42, "postedBy": "Flipkart", "createdTime": "2023-01-01T10:00:00+0000", "message": "Big Billion Days"}),
            json!({"pid": 43, "postedBy": "Myntra", "createdTime": "2023-01-01T10:20:00+0000"}),
            json!({"pid": 44, "postedBy": "Flipkart", "createdTime": "2023-01-02T10:05:00+0000"}),
        ],
    );
    let comments = write_jsonl(
        dir,
        "comments.jsonl",
        &[
            json!({"pid": "42", "commentsText": "love it 2023-01-01T03:05:00+0000?#+@same 2023 01 01T03:10:00+0000?#+@old 2023/01/02"}),
            json!({"pid": "43.0", "commentsText": "broken 2023-13-40T99:99:99+0000?#+@nothing to see"}),
            json!({"pid": 999, "commentsText": "orphan 2023-01-01T03:00:00+0000"}),
            json!({"pid": 44, "commentsText": "?#+@   ?#+@"}),
        ],
    );
    (posts, comments)
}

// ── comments mode ─────────────────────────────────────────────────────────────

#[test]
fn test_comments_pipeline_end_to_end() {
    let dir = TempDir::new().unwrap();
    let (posts, comments) = fixture(dir.path());

    let analysis = analyze_paths(&posts, Some(comments.as_path()), &EngineConfig::comments()).unwrap();
    let report = &analysis.report;

    assert_eq!(report.entities, vec!["Flipkart", "Myntra"]);

    // Three encodings of the same page's comments land where expected.
    assert_eq!(report.counts.count("Flipkart", bucket(12)), 2);
    assert_eq!(report.counts.count("Flipkart", bucket(0)), 1);

    let flipkart = report.statistics.entity("Flipkart").unwrap();
    assert_eq!(flipkart.total_resolved, 3);
    assert_eq!(flipkart.total_unresolved, 0);
    assert_eq!(flipkart.peak_bucket(), Some(bucket(12)));
    assert_eq!(flipkart.trough_bucket(), Some(bucket(0)));
    assert_eq!(flipkart.coverage_ratio, 1.0);

    let myntra = report.statistics.entity("Myntra").unwrap();
    assert_eq!(myntra.total_resolved, 0);
    assert_eq!(myntra.total_unresolved, 2);
    assert_eq!(myntra.coverage_ratio, 0.0);
    assert!(myntra.peak.is_none());

    assert_eq!(report.statistics.unattributed, 1);
    assert_eq!(report.metadata.fragments_seen, 6);
    let by_reason = &report.metadata.unresolved_by_reason;
    assert_eq!(by_reason[&UnresolvedReason::NoTimestampFound], 1);
    assert_eq!(by_reason[&UnresolvedReason::TimestampUnparsable], 1);
    assert_eq!(by_reason[&UnresolvedReason::NoEntityMatch], 1);
}

#[test]
fn test_every_entity_has_full_bucket_table() {
    let dir = TempDir::new().unwrap();
    let (posts, comments) = fixture(dir.path());
    let analysis = analyze_paths(&posts, Some(comments.as_path()), &EngineConfig::comments()).unwrap();
    let report = &analysis.report;

    for stats in &report.statistics.entities {
        let rows: Vec<_> = report
            .buckets
            .iter()
            .filter(|r| r.entity_key == stats.entity_key)
            .collect();
        assert_eq!(rows.len(), BUCKET_COUNT);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.bucket.index(), i);
        }
        let sum: u64 = rows.iter().map(|r| r.count).sum();
        assert_eq!(sum, stats.total_resolved);
    }
}

#[test]
fn test_runs_are_idempotent() {
    let dir = TempDir::new().unwrap();
    let (posts, comments) = fixture(dir.path());
    let config = EngineConfig::comments();

    let first = analyze_paths(&posts, Some(comments.as_path()), &config).unwrap();
    let second = analyze_paths(&posts, Some(comments.as_path()), &config).unwrap();

    assert_eq!(
        serde_json::to_string(&first.report).unwrap(),
        serde_json::to_string(&second.report).unwrap()
    );
}

// ── posts mode ────────────────────────────────────────────────────────────────

#[test]
fn test_posts_pipeline_with_bucket_listing() {
    let dir = TempDir::new().unwrap();
    let (posts, _) = fixture(dir.path());

    let analysis = analyze_paths(&posts, None, &EngineConfig::posts()).unwrap();
    let report = &analysis.report;

    // 10:00 and 10:05 share bucket 40; 10:20 is bucket 41.
    assert_eq!(report.counts.count("Flipkart", bucket(40)), 2);
    assert_eq!(report.counts.count("Myntra", bucket(41)), 1);
    assert_eq!(report.combined[40], 2);
    assert_eq!(report.hourly_ticks[10].count, 2);

    let listing = report.bucket_listing(&analysis.table, "Flipkart", bucket(40));
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].text, "Big Billion Days");
    assert_eq!(
        listing[1].timestamp,
        Utc.with_ymd_and_hms(2023, 1, 2, 10, 5, 0).unwrap()
    );
}

#[test]
fn test_selection_with_absent_target() {
    let dir = TempDir::new().unwrap();
    let (posts, _) = fixture(dir.path());
    let config = EngineConfig::posts()
        .with_selection(EntitySelection::targets(["Myntra", "Ajio"]));

    let analysis = analyze_paths(&posts, None, &config).unwrap();
    let report = &analysis.report;

    assert_eq!(report.entities, vec!["Myntra", "Ajio"]);
    assert_eq!(report.buckets.len(), 2 * BUCKET_COUNT);
    assert_eq!(report.statistics.entity("Ajio").unwrap().total_resolved, 0);
    assert_eq!(report.metadata.events_outside_selection, 2);
}

// ── in-memory inputs ──────────────────────────────────────────────────────────

#[test]
fn test_numeric_reference_key_joins_text_fragment_key() {
    let table = ReferenceTable::new(vec![ReferenceRow::new(
        activity_data::core::models::canonical_key_from_json(&json!(42)).unwrap(),
        "Flipkart",
        "",
    )]);
    let records = vec![RawRecord::new(
        "42",
        "a 2023-01-01T03:05:00+0000?#+@b 2023-01-01T03:06:00+0000",
    )];

    let report = run(&table, &records, &EngineConfig::comments()).unwrap();
    assert_eq!(report.counts.count("Flipkart", bucket(12)), 2);
    assert!(report.unresolved.is_empty());
}

#[test]
fn test_one_unparsable_entity_does_not_stop_the_others() {
    let table = ReferenceTable::new(vec![
        ReferenceRow::new("1", "Broken", "never"),
        ReferenceRow::new("2", "Fine", "2023-01-01T23:59:59+0000"),
    ]);

    let report = run(&table, &[], &EngineConfig::posts()).unwrap();
    assert_eq!(report.counts.count("Fine", bucket(95)), 1);
    assert_eq!(report.statistics.entity("Broken").unwrap().total_unresolved, 1);
}

#[test]
fn test_empty_inputs_report_nothing() {
    let dir = TempDir::new().unwrap();
    let posts = write_jsonl(dir.path(), "posts.jsonl", &[]);
    let comments = write_jsonl(dir.path(), "comments.jsonl", &[]);

    let analysis = analyze_paths(&posts, Some(comments.as_path()), &EngineConfig::comments()).unwrap();
    assert!(analysis.report.is_empty());
    assert!(analysis.report.entities.is_empty());
    assert_eq!(analysis.report.statistics.unattributed, 0);
}
