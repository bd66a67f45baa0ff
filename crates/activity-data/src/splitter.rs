//! Splitting composite text fields into individual fragments.

use activity_core::error::{ActivityError, Result};
use activity_core::models::{Fragment, RawRecord};

// ── Fragments ─────────────────────────────────────────────────────────────────

/// Lazy iterator over the non-blank sub-records of one [`RawRecord`].
///
/// Blank pieces (empty after trimming) are not sub-records and are skipped
/// without being reported anywhere.
pub struct Fragments<'a> {
    parent_key: &'a str,
    parts: std::str::Split<'a, &'a str>,
}

impl<'a> Iterator for Fragments<'a> {
    type Item = Fragment;

    fn next(&mut self) -> Option<Fragment> {
        for part in self.parts.by_ref() {
            let text = part.trim();
            if text.is_empty() {
                continue;
            }
            return Some(Fragment {
                parent_key: self.parent_key.to_string(),
                text: text.to_string(),
            });
        }
        None
    }
}

impl std::iter::FusedIterator for Fragments<'_> {}

// ── RecordSplitter ────────────────────────────────────────────────────────────

/// Splits composite fields on a fixed literal separator.
#[derive(Debug, Clone)]
pub struct RecordSplitter {
    separator: String,
}

impl RecordSplitter {
    /// Create a splitter. An empty separator is rejected.
    pub fn new(separator: impl Into<String>) -> Result<Self> {
        let separator = separator.into();
        if separator.is_empty() {
            return Err(ActivityError::InvalidSeparator(separator));
        }
        Ok(Self { separator })
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Fragments of `raw`, sharing its parent key.
    pub fn split<'a>(&'a self, raw: &'a RawRecord) -> Fragments<'a> {
        Fragments {
            parent_key: &raw.parent_key,
            parts: raw.raw_text.split(self.separator.as_str()),
        }
    }
}

/// One-shot form of [`RecordSplitter::split`].
pub fn split<'a>(raw: &'a RawRecord, separator: &'a str) -> Result<Fragments<'a>> {
    if separator.is_empty() {
        return Err(ActivityError::InvalidSeparator(separator.to_string()));
    }
    Ok(Fragments {
        parent_key: &raw.parent_key,
        parts: raw.raw_text.split(separator),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(fragments: Fragments<'_>) -> Vec<String> {
        fragments.map(|f| f.text).collect()
    }

    #[test]
    fn test_split_on_multi_char_separator() {
        let raw = RawRecord::new(
            "42",
            "nice 2023-01-01T03:05:00+0000?#+@bad deal 2023/01/02",
        );
        let splitter = RecordSplitter::new("?#+@").unwrap();
        let got: Vec<Fragment> = splitter.split(&raw).collect();

        assert_eq!(got.len(), 2);
        assert!(got.iter().all(|f| f.parent_key == "42"));
        assert_eq!(got[0].text, "nice 2023-01-01T03:05:00+0000");
        assert_eq!(got[1].text, "bad deal 2023/01/02");
    }

    #[test]
    fn test_split_drops_blank_fragments() {
        let raw = RawRecord::new("1", "?#+@  ?#+@a?#+@\n\t?#+@b?#+@");
        let splitter = RecordSplitter::new("?#+@").unwrap();
        assert_eq!(texts(splitter.split(&raw)), vec!["a", "b"]);
    }

    #[test]
    fn test_split_without_separator_yields_whole_text() {
        let raw = RawRecord::new("1", "  only one  ");
        assert_eq!(texts(split(&raw, "?#+@").unwrap()), vec!["only one"]);
    }

    #[test]
    fn test_split_empty_text_yields_nothing() {
        let raw = RawRecord::new("1", "");
        assert_eq!(split(&raw, "?#+@").unwrap().count(), 0);
    }

    #[test]
    fn test_split_is_lazy_and_single_pass() {
        let raw = RawRecord::new("1", "a|b|c");
        let mut it = split(&raw, "|").unwrap();
        assert_eq!(it.next().map(|f| f.text), Some("a".to_string()));
        assert_eq!(it.by_ref().count(), 2);
        assert!(it.next().is_none());
    }

    #[test]
    fn test_split_rejects_empty_separator() {
        let raw = RawRecord::new("1", "abc");
        assert!(matches!(
            split(&raw, ""),
            Err(ActivityError::InvalidSeparator(_))
        ));
        assert!(RecordSplitter::new("").is_err());
    }
}
