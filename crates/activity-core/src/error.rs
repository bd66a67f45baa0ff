use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the activity bucketing crates.
///
/// Per-fragment parse and join failures are not represented here: they are
/// ordinary values ([`crate::models::UnresolvedFragment`]) folded into the
/// coverage statistics instead of aborting the run.
#[derive(Error, Debug)]
pub enum ActivityError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The separator used to split composite fields is unusable.
    #[error("Invalid separator: {0:?}")]
    InvalidSeparator(String),

    /// A bucket index outside `0..96` was requested.
    #[error("Invalid bucket index: {0} (expected 0-95)")]
    InvalidBucket(usize),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the activity crates.
pub type Result<T> = std::result::Result<T, ActivityError>;
