//! Multi-strategy timestamp extraction from free-form fragment text.
//!
//! Upstream data mixes several encodings for the same logical instant, so
//! the extractor tries an ordered list of patterns, most specific first:
//!
//! 1. [`StrategyKind::StrictIso`]: `YYYY-MM-DDThh:mm:ss±hhhh`
//! 2. [`StrategyKind::SpacedIso`]: `YYYY MM DDThh:mm:ss±hhhh`
//! 3. [`StrategyKind::LooseDate`]: a year in 2010-2025 followed by month and
//!    day separated by `/`, `-` or whitespace; time defaults to midnight UTC.
//!
//! The first strategy whose pattern matches decides the outcome. A match that
//! fails calendar validation is reported as unparsable rather than handed to
//! a looser strategy.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::formatting::truncate_chars;
use crate::models::UnresolvedReason;

/// Default number of characters of the source text kept on a failure.
pub const DEFAULT_SNIPPET_LEN: usize = 50;

const STRICT_ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

// ── Public types ──────────────────────────────────────────────────────────────

/// Which pattern produced (or rejected) a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    StrictIso,
    SpacedIso,
    LooseDate,
}

/// A successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// The instant, normalised to UTC.
    pub timestamp: DateTime<Utc>,
    /// Offset written in the source text (UTC for loose dates).
    pub offset: FixedOffset,
    pub strategy: StrategyKind,
    /// The substring the winning pattern matched.
    pub matched: String,
}

/// Why a fragment did not yield a timestamp. Always carries a bounded prefix
/// of the source text for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractFailure {
    #[error("no timestamp found in \"{snippet}\"")]
    NoTimestampFound { snippet: String },

    #[error("{strategy:?} match \"{matched}\" is not a valid timestamp (in \"{snippet}\")")]
    TimestampUnparsable {
        strategy: StrategyKind,
        matched: String,
        snippet: String,
    },
}

impl ExtractFailure {
    pub fn reason(&self) -> UnresolvedReason {
        match self {
            ExtractFailure::NoTimestampFound { .. } => UnresolvedReason::NoTimestampFound,
            ExtractFailure::TimestampUnparsable { .. } => UnresolvedReason::TimestampUnparsable,
        }
    }

    pub fn snippet(&self) -> &str {
        match self {
            ExtractFailure::NoTimestampFound { snippet }
            | ExtractFailure::TimestampUnparsable { snippet, .. } => snippet,
        }
    }
}

// ── Strategies ────────────────────────────────────────────────────────────────

/// Outcome of a single strategy on a single text.
enum Attempt {
    NoMatch,
    Parsed(DateTime<FixedOffset>, String),
    Invalid(String),
}

struct PatternStrategy {
    kind: StrategyKind,
    pattern: Regex,
}

impl PatternStrategy {
    fn new(kind: StrategyKind, pattern: &str) -> Self {
        Self {
            kind,
            pattern: Regex::new(pattern).expect("regex is valid"),
        }
    }

    fn attempt(&self, text: &str) -> Attempt {
        let Some(caps) = self.pattern.captures(text) else {
            return Attempt::NoMatch;
        };
        let matched = caps[0].to_string();

        let parsed = match self.kind {
            StrategyKind::StrictIso => parse_strict_iso(&matched),
            StrategyKind::SpacedIso => parse_spaced_iso(&caps),
            StrategyKind::LooseDate => parse_loose_date(&caps),
        };

        match parsed {
            Some(dt) => Attempt::Parsed(dt, matched),
            None => Attempt::Invalid(matched),
        }
    }
}

fn parse_strict_iso(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(s, STRICT_ISO_FORMAT).ok()
}

/// Rewrite the whitespace-separated date into dashes, then reuse the strict
/// parser.
fn parse_spaced_iso(caps: &Captures<'_>) -> Option<DateTime<FixedOffset>> {
    let rewritten = format!("{}-{}-{}T{}", &caps[1], &caps[2], &caps[3], &caps[4]);
    parse_strict_iso(&rewritten)
}

fn parse_loose_date(caps: &Captures<'_>) -> Option<DateTime<FixedOffset>> {
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    let utc = FixedOffset::east_opt(0)?;
    utc.from_local_datetime(&naive).single()
}

// ── TimestampExtractor ────────────────────────────────────────────────────────

/// Ordered, stateless timestamp parser. Build once per run and reuse.
pub struct TimestampExtractor {
    strategies: Vec<PatternStrategy>,
    snippet_len: usize,
}

impl Default for TimestampExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TimestampExtractor {
    pub fn new() -> Self {
        Self::with_snippet_len(DEFAULT_SNIPPET_LEN)
    }

    /// Create an extractor whose failures keep `snippet_len` characters of
    /// the source text.
    pub fn with_snippet_len(snippet_len: usize) -> Self {
        let strategies = vec![
            PatternStrategy::new(
                StrategyKind::StrictIso,
                r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}[+-]\d{4}",
            ),
            PatternStrategy::new(
                StrategyKind::SpacedIso,
                r"(\d{4})\s+(\d{2})\s+(\d{2})T(\d{2}:\d{2}:\d{2}[+-]\d{4})",
            ),
            PatternStrategy::new(
                StrategyKind::LooseDate,
                r"(20(?:1\d|2[0-5]))\s*[/\-\s]\s*(\d{1,2})\s*[/\-\s]\s*(\d{1,2})",
            ),
        ];
        Self {
            strategies,
            snippet_len,
        }
    }

    /// Parse `text` into a UTC instant.
    pub fn extract(&self, text: &str) -> Result<DateTime<Utc>, ExtractFailure> {
        self.extract_detailed(text).map(|e| e.timestamp)
    }

    /// Parse `text`, also reporting the source offset and winning strategy.
    pub fn extract_detailed(&self, text: &str) -> Result<Extracted, ExtractFailure> {
        for strategy in &self.strategies {
            match strategy.attempt(text) {
                Attempt::NoMatch => continue,
                Attempt::Parsed(dt, matched) => {
                    return Ok(Extracted {
                        timestamp: dt.with_timezone(&Utc),
                        offset: *dt.offset(),
                        strategy: strategy.kind,
                        matched,
                    });
                }
                Attempt::Invalid(matched) => {
                    return Err(ExtractFailure::TimestampUnparsable {
                        strategy: strategy.kind,
                        matched,
                        snippet: truncate_chars(text, self.snippet_len),
                    });
                }
            }
        }

        Err(ExtractFailure::NoTimestampFound {
            snippet: truncate_chars(text, self.snippet_len),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
