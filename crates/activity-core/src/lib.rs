//! Foundation types for the activity bucketing engine.
//!
//! Holds the data model, the error taxonomy, the multi-strategy
//! [`extractor::TimestampExtractor`], the 96-bucket time-of-day math and
//! the configuration layers shared by the engine and the binary.

pub mod config;
pub mod error;
pub mod extractor;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{ActivityError, Result};
pub use time_utils::{BucketKey, DayPart, BUCKET_COUNT};
