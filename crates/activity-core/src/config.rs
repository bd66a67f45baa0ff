//! Library-level engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ActivityError, Result};
use crate::extractor::DEFAULT_SNIPPET_LEN;

/// Separator token joining sub-records inside a composite text field.
pub const DEFAULT_SEPARATOR: &str = "?#+@";

/// Which records feed the aggregator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// One event per reference row, timed by its own origin timestamp.
    #[default]
    Posts,
    /// Events recovered from composite fields, attributed through the join.
    Comments,
}

impl std::str::FromStr for AnalysisMode {
    type Err = ActivityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "posts" => Ok(AnalysisMode::Posts),
            "comments" => Ok(AnalysisMode::Comments),
            other => Err(ActivityError::Config(format!(
                "unknown analysis mode \"{}\" (expected posts or comments)",
                other
            ))),
        }
    }
}

// ── EntitySelection ───────────────────────────────────────────────────────────

/// Which entities appear in the per-entity output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySelection {
    /// Entities requested by name. Empty means "all".
    #[serde(default)]
    pub targets: Vec<String>,
    /// Case-insensitive substrings used when none of `targets` exist.
    #[serde(default)]
    pub fallback_keywords: Vec<String>,
}

impl EntitySelection {
    /// Select every entity.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            fallback_keywords: Vec::new(),
        }
    }

    pub fn with_fallback_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve against the entities present in the data, given in
    /// first-seen order.
    ///
    /// 1. No targets → all `available`.
    /// 2. Any target present → the targets in the order given, including
    ///    absent ones (reported with zero counts).
    /// 3. Otherwise, `available` entities whose lowercase name contains a
    ///    fallback keyword, if there are any.
    /// 4. Otherwise the targets as given.
    pub fn resolve(&self, available: &[String]) -> Vec<String> {
        if self.targets.is_empty() {
            return available.to_vec();
        }

        if self.targets.iter().any(|t| available.contains(t)) {
            return self.targets.clone();
        }

        let keywords: Vec<String> = self
            .fallback_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        let similar: Vec<String> = available
            .iter()
            .filter(|name| {
                let lower = name.to_lowercase();
                keywords.iter().any(|k| lower.contains(k.as_str()))
            })
            .cloned()
            .collect();

        if similar.is_empty() {
            self.targets.clone()
        } else {
            similar
        }
    }
}

// ── EngineConfig ──────────────────────────────────────────────────────────────

/// Everything the engine needs besides its input records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub mode: AnalysisMode,
    pub separator: String,
    /// Characters of source text kept on unresolved fragments' diagnostics.
    pub snippet_len: usize,
    pub selection: EntitySelection,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::Posts,
            separator: DEFAULT_SEPARATOR.to_string(),
            snippet_len: DEFAULT_SNIPPET_LEN,
            selection: EntitySelection::all(),
        }
    }
}

impl EngineConfig {
    pub fn posts() -> Self {
        Self::default()
    }

    pub fn comments() -> Self {
        Self {
            mode: AnalysisMode::Comments,
            ..Self::default()
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_selection(mut self, selection: EntitySelection) -> Self {
        self.selection = selection;
        self
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.separator.is_empty() {
            return Err(ActivityError::InvalidSeparator(self.separator.clone()));
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
