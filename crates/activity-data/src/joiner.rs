//! Reference table and parent-key → entity resolution.

use std::collections::HashMap;

use activity_core::models::{canonical_key, ReferenceRow, UnresolvedReason};
use thiserror::Error;
use tracing::debug;

// ── ReferenceTable ────────────────────────────────────────────────────────────

/// Top-level records indexed by canonical parent key.
///
/// Entities are remembered in first-seen row order, which is the order every
/// report uses. When a parent key repeats, the first row wins.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    rows: Vec<ReferenceRow>,
    by_key: HashMap<String, usize>,
    entities: Vec<String>,
}

impl ReferenceTable {
    pub fn new(rows: impl IntoIterator<Item = ReferenceRow>) -> Self {
        let mut table = Self::default();
        for row in rows {
            table.push(row);
        }
        table
    }

    fn push(&mut self, mut row: ReferenceRow) {
        row.parent_key = canonical_key(&row.parent_key);

        if !self.entities.contains(&row.entity_key) {
            self.entities.push(row.entity_key.clone());
        }

        if self.by_key.contains_key(&row.parent_key) {
            debug!(
                "ReferenceTable: duplicate parent key {}, keeping first row",
                row.parent_key
            );
        } else {
            self.by_key.insert(row.parent_key.clone(), self.rows.len());
        }
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// All rows in input order, duplicates included.
    pub fn rows(&self) -> &[ReferenceRow] {
        &self.rows
    }

    /// Distinct entity keys in first-seen order.
    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    /// Row registered for `parent_key` (canonicalised before lookup).
    pub fn row(&self, parent_key: &str) -> Option<&ReferenceRow> {
        self.by_key
            .get(&canonical_key(parent_key))
            .map(|&idx| &self.rows[idx])
    }

    /// Row for `parent_key` owned by `entity_key`. Differs from
    /// [`ReferenceTable::row`] only when a repeated key spans entities.
    pub fn row_for_entity(&self, parent_key: &str, entity_key: &str) -> Option<&ReferenceRow> {
        let key = canonical_key(parent_key);
        match self.by_key.get(&key).map(|&idx| &self.rows[idx]) {
            Some(row) if row.entity_key == entity_key => Some(row),
            Some(_) => self
                .rows
                .iter()
                .find(|r| r.parent_key == key && r.entity_key == entity_key),
            None => None,
        }
    }

    pub fn entity_for(&self, parent_key: &str) -> Option<&str> {
        self.row(parent_key).map(|r| r.entity_key.as_str())
    }
}

// ── JoinFailure ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinFailure {
    #[error("no entity matches parent key \"{parent_key}\"")]
    NoEntityMatch { parent_key: String },
}

impl JoinFailure {
    pub fn reason(&self) -> UnresolvedReason {
        match self {
            JoinFailure::NoEntityMatch { .. } => UnresolvedReason::NoEntityMatch,
        }
    }
}

// ── EntityJoiner ──────────────────────────────────────────────────────────────

/// Exact-match join of a fragment's parent key against the reference table.
pub struct EntityJoiner;

impl EntityJoiner {
    /// Entity owning `parent_key`. Numeric and textual spellings of the same
    /// key (`42`, `"42"`, `"42.0"`) resolve identically.
    pub fn resolve<'t>(
        parent_key: &str,
        table: &'t ReferenceTable,
    ) -> Result<&'t str, JoinFailure> {
        table
            .entity_for(parent_key)
            .ok_or_else(|| JoinFailure::NoEntityMatch {
                parent_key: canonical_key(parent_key),
            })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
