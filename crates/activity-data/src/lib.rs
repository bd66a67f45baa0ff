//! Bucketing engine for entity activity.
//!
//! Splits composite text fields into fragments, extracts timestamps,
//! resolves owning entities, aggregates events into 96 fifteen-minute
//! buckets and derives per-entity statistics. JSONL ingestion and the
//! end-to-end pipeline live here as well.

pub mod aggregator;
pub mod analysis;
pub mod joiner;
pub mod reader;
pub mod splitter;
pub mod statistics;

pub use activity_core as core;
