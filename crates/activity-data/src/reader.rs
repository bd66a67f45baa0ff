//! JSONL ingestion for reference rows and composite comment fields.
//!
//! Each input line is one JSON object:
//!
//! * reference rows: `{"pid": 42, "postedBy": "Flipkart", "createdTime": "...", "message": "..."}`
//! * composite rows: `{"pid": "42", "commentsText": "c1?#+@c2"}` (`"comments"` is
//!   accepted as an alternative field name)
//!
//! A path may be a single file or a directory searched recursively for
//! `.jsonl` files. Unreadable files and malformed lines are logged and
//! skipped; a missing path yields no rows.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use activity_core::models::{canonical_key_from_json, RawRecord, ReferenceRow};
use serde_json::Value;
use tracing::{debug, warn};

// ── Public API ────────────────────────────────────────────────────────────────

/// `path` itself when it is a file, otherwise every `.jsonl` file below it,
/// sorted by path.
pub fn find_jsonl_files(path: &Path) -> Vec<PathBuf> {
    if !path.exists() {
        warn!("Input path does not exist: {}", path.display());
        return Vec::new();
    }
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "jsonl")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load reference rows (one per top-level post).
pub fn load_reference_rows(path: &Path) -> Vec<ReferenceRow> {
    let rows: Vec<ReferenceRow> = read_json_lines(path)
        .iter()
        .filter_map(map_to_reference_row)
        .collect();
    debug!("Loaded {} reference rows from {}", rows.len(), path.display());
    rows
}

/// Load composite text fields (one per post with comments).
pub fn load_composite_records(path: &Path) -> Vec<RawRecord> {
    let records: Vec<RawRecord> = read_json_lines(path)
        .iter()
        .filter_map(map_to_raw_record)
        .collect();
    debug!(
        "Loaded {} composite records from {}",
        records.len(),
        path.display()
    );
    records
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Every parseable JSON line of every input file, in file then line order.
fn read_json_lines(path: &Path) -> Vec<Value> {
    let mut values = Vec::new();

    for file_path in find_jsonl_files(path) {
        let file = match std::fs::File::open(&file_path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Failed to read file {}: {}", file_path.display(), e);
                continue;
            }
        };

        let reader = std::io::BufReader::new(file);
        let mut skipped = 0u64;
        for line_result in reader.lines() {
            let Ok(line) = line_result else {
                skipped += 1;
                continue;
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(v) => values.push(v),
                Err(e) => {
                    debug!("Failed to parse JSON line in {}: {}", file_path.display(), e);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            warn!("Skipped {} malformed lines in {}", skipped, file_path.display());
        }
    }

    values
}

fn string_field<'a>(data: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| data.get(*k).and_then(|v| v.as_str()))
}

fn map_to_reference_row(data: &Value) -> Option<ReferenceRow> {
    let parent_key = data.get("pid").and_then(canonical_key_from_json)?;
    let Some(entity) = string_field(data, &["postedBy", "entity"]) else {
        debug!("Reference row {} has no postedBy, skipping", parent_key);
        return None;
    };

    let origin = string_field(data, &["createdTime", "created_time"]).unwrap_or_default();
    let mut row = ReferenceRow::new(parent_key, entity, origin);
    row.message = string_field(data, &["message"]).map(str::to_string);
    Some(row)
}

fn map_to_raw_record(data: &Value) -> Option<RawRecord> {
    let Some(parent_key) = data.get("pid").and_then(canonical_key_from_json) else {
        debug!("Composite record has no usable pid, skipping");
        return None;
    };
    let text = string_field(data, &["commentsText", "comments"])?;
    if text.trim().is_empty() {
        return None;
    }
    Some(RawRecord::new(parent_key, text))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
