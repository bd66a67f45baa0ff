use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One composite text field read from storage, e.g. the concatenated
/// comments blob attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Canonical key of the parent (top-level) record.
    pub parent_key: String,
    /// Text holding zero or more separator-delimited sub-records.
    pub raw_text: String,
}

impl RawRecord {
    pub fn new(parent_key: impl AsRef<str>, raw_text: impl Into<String>) -> Self {
        Self {
            parent_key: canonical_key(parent_key.as_ref()),
            raw_text: raw_text.into(),
        }
    }
}

/// A single sub-record recovered from a [`RawRecord`]. Its text is trimmed
/// and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub parent_key: String,
    pub text: String,
}

/// One row of the reference table: a top-level record and the entity that
/// authored it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRow {
    pub parent_key: String,
    pub entity_key: String,
    /// Raw timestamp text of the top-level record itself.
    pub origin_timestamp: String,
    /// Optional body text, used only for listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReferenceRow {
    pub fn new(
        parent_key: impl AsRef<str>,
        entity_key: impl Into<String>,
        origin_timestamp: impl Into<String>,
    ) -> Self {
        Self {
            parent_key: canonical_key(parent_key.as_ref()),
            entity_key: entity_key.into(),
            origin_timestamp: origin_timestamp.into(),
            message: None,
        }
    }

    /// Attach a message body to the row.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A fragment that yielded a timestamp and was attributed to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub parent_key: String,
    pub entity_key: String,
    /// Instant of the event, normalised to UTC.
    pub timestamp: DateTime<Utc>,
    /// Offset present in the source text, in seconds east of UTC.
    #[serde(default)]
    pub source_offset_secs: i32,
    pub source_text: String,
}

/// Why a fragment could not become a [`TimestampedEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// No timestamp-like substring was found.
    NoTimestampFound,
    /// A substring matched a pattern but failed calendar/numeric validation.
    TimestampUnparsable,
    /// The parent key is absent from the reference table.
    NoEntityMatch,
}

impl UnresolvedReason {
    pub const ALL: [UnresolvedReason; 3] = [
        UnresolvedReason::NoTimestampFound,
        UnresolvedReason::TimestampUnparsable,
        UnresolvedReason::NoEntityMatch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UnresolvedReason::NoTimestampFound => "no_timestamp_found",
            UnresolvedReason::TimestampUnparsable => "timestamp_unparsable",
            UnresolvedReason::NoEntityMatch => "no_entity_match",
        }
    }
}

/// A fragment that failed somewhere in the pipeline. Kept for coverage
/// statistics; never silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedFragment {
    pub parent_key: String,
    /// Owning entity when it is already known, e.g. the row a post-mode
    /// fragment came from. `None` leaves attribution to the parent key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_key: Option<String>,
    pub text: String,
    pub reason: UnresolvedReason,
}

// ── Key canonicalisation ──────────────────────────────────────────────────────

/// Canonical string form of a parent key.
///
/// Keys arrive both as text and as numbers (`42`, `"42"`, `42.0`, `" 42 "`).
/// Surrounding whitespace and a leading `+` are removed, and an
/// integer-valued decimal (`"42.0"`, `"42.000"`) loses its zero fraction.
/// Anything else is returned trimmed and otherwise untouched.
///
/// ```
/// use activity_core::models::canonical_key;
///
/// assert_eq!(canonical_key("42"), "42");
/// assert_eq!(canonical_key(" 42.0 "), "42");
/// assert_eq!(canonical_key("+7"), "7");
/// assert_eq!(canonical_key("123_456"), "123_456");
/// ```
pub fn canonical_key(raw: &str) -> String {
    let trimmed = raw.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let digits = int_part.strip_prefix('-').unwrap_or(int_part);
    let is_integer = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
    if !is_integer {
        return trimmed.to_string();
    }

    match frac_part {
        None => int_part.to_string(),
        Some(f) if !f.is_empty() && f.bytes().all(|b| b == b'0') => int_part.to_string(),
        Some(_) => trimmed.to_string(),
    }
}

/// Canonical key from a JSON value (string or number).
///
/// Returns `None` for `null`, booleans, arrays and objects.
pub fn canonical_key_from_json(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(canonical_key(s)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|f| canonical_key(&f.to_string()))
            }
        }
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── canonical_key ────────────────────────────────────────────────────────

    #[test]
    fn test_canonical_key_numeric_forms_agree() {
        assert_eq!(canonical_key("42"), canonical_key("42.0"));
        assert_eq!(canonical_key("42"), canonical_key(" 42 "));
        assert_eq!(canonical_key("42"), canonical_key("+42"));
    }

    #[test]
    fn test_canonical_key_keeps_real_fraction() {
        assert_eq!(canonical_key("42.5"), "42.5");
    }

    #[test]
    fn test_canonical_key_keeps_leading_zeros() {
        assert_eq!(canonical_key("007"), "007");
    }

    #[test]
    fn test_canonical_key_negative() {
        assert_eq!(canonical_key("-3.00"), "-3");
    }

    #[test]
    fn test_canonical_key_text_untouched() {
        assert_eq!(canonical_key("  post_9 "), "post_9");
        assert_eq!(canonical_key("1.2.3"), "1.2.3");
        assert_eq!(canonical_key("42."), "42.");
    }

    #[test]
    fn test_canonical_key_from_json_number_and_string() {
        let num = serde_json::json!(42);
        let float = serde_json::json!(42.0);
        let text = serde_json::json!("42");
        assert_eq!(canonical_key_from_json(&num).as_deref(), Some("42"));
        assert_eq!(canonical_key_from_json(&float).as_deref(), Some("42"));
        assert_eq!(canonical_key_from_json(&text).as_deref(), Some("42"));
    }

    #[test]
    fn test_canonical_key_from_json_rejects_null() {
        assert!(canonical_key_from_json(&Value::Null).is_none());
        assert!(canonical_key_from_json(&serde_json::json!(true)).is_none());
    }

    // ── constructors ─────────────────────────────────────────────────────────

    #[test]
    fn test_raw_record_canonicalises_key() {
        let raw = RawRecord::new(" 42.0", "text");
        assert_eq!(raw.parent_key, "42");
    }

    #[test]
    fn test_reference_row_with_message() {
        let row = ReferenceRow::new("1", "Acme", "2023-01-01T00:00:00+0000").with_message("hi");
        assert_eq!(row.message.as_deref(), Some("hi"));
        assert_eq!(row.entity_key, "Acme");
    }

    #[test]
    fn test_unresolved_reason_serializes_snake_case() {
        let json = serde_json::to_string(&UnresolvedReason::NoEntityMatch).unwrap();
        assert_eq!(json, "\"no_entity_match\"");
        assert_eq!(UnresolvedReason::NoEntityMatch.as_str(), "no_entity_match");
    }
}
