use std::fmt;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ActivityError, Result};

/// Number of fixed time-of-day buckets in a 24-hour cycle.
pub const BUCKET_COUNT: usize = 96;

/// Width of a single bucket in minutes.
pub const BUCKET_MINUTES: u32 = 15;

// ── BucketKey ─────────────────────────────────────────────────────────────────

/// One of the 96 fifteen-minute slots of a day, `hour * 4 + minute / 15`.
///
/// The inner index is always in `0..96`; every constructor enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct BucketKey(u8);

impl BucketKey {
    /// Bucket for a validated index, or [`ActivityError::InvalidBucket`].
    pub fn new(index: usize) -> Result<Self> {
        if index < BUCKET_COUNT {
            Ok(Self(index as u8))
        } else {
            Err(ActivityError::InvalidBucket(index))
        }
    }

    /// Bucket containing the wall-clock time `hour:minute`.
    ///
    /// Returns `None` when `hour > 23` or `minute > 59`.
    pub fn from_hour_minute(hour: u32, minute: u32) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self((hour * 4 + minute / BUCKET_MINUTES) as u8))
    }

    /// Bucket containing the UTC time-of-day of `ts`.
    pub fn from_timestamp(ts: &DateTime<Utc>) -> Self {
        // chrono guarantees hour in 0..24 and minute in 0..60.
        Self((ts.hour() * 4 + ts.minute() / BUCKET_MINUTES) as u8)
    }

    /// Iterate over all 96 buckets in ascending order.
    pub fn all() -> impl Iterator<Item = BucketKey> {
        (0..BUCKET_COUNT as u8).map(BucketKey)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn hour(self) -> u32 {
        u32::from(self.0) / 4
    }

    pub fn start_minute(self) -> u32 {
        (u32::from(self.0) % 4) * BUCKET_MINUTES
    }

    /// Last minute covered by the bucket. Never crosses into the next hour:
    /// the latest value is `59` for a bucket starting at `:45`.
    pub fn end_minute(self) -> u32 {
        self.start_minute() + BUCKET_MINUTES - 1
    }

    /// Day-part the bucket belongs to, derived from its hour.
    pub fn day_part(self) -> DayPart {
        DayPart::from_hour(self.hour())
    }

    /// Start of the bucket as `"HH:MM"`.
    ///
    /// ```
    /// use activity_core::time_utils::BucketKey;
    ///
    /// assert_eq!(BucketKey::new(0).unwrap().start_label(), "00:00");
    /// assert_eq!(BucketKey::new(13).unwrap().start_label(), "03:15");
    /// assert_eq!(BucketKey::new(95).unwrap().start_label(), "23:45");
    /// ```
    pub fn start_label(self) -> String {
        format!("{:02}:{:02}", self.hour(), self.start_minute())
    }

    /// End of the bucket as `"HH:MM"` (start plus 14 minutes).
    pub fn end_label(self) -> String {
        format!("{:02}:{:02}", self.hour(), self.end_minute())
    }

    /// Inclusive 24-hour range, e.g. `"03:00-03:14"`.
    ///
    /// ```
    /// use activity_core::time_utils::BucketKey;
    ///
    /// assert_eq!(BucketKey::new(12).unwrap().range_label(), "03:00-03:14");
    /// assert_eq!(BucketKey::new(95).unwrap().range_label(), "23:45-23:59");
    /// ```
    pub fn range_label(self) -> String {
        format!("{}-{}", self.start_label(), self.end_label())
    }

    /// Inclusive 12-hour range, e.g. `"3:00 AM-3:14 AM"`.
    pub fn range_label_12h(self) -> String {
        format!(
            "{}-{}",
            format_clock_12h(self.hour(), self.start_minute()),
            format_clock_12h(self.hour(), self.end_minute())
        )
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.start_label())
    }
}

impl TryFrom<usize> for BucketKey {
    type Error = ActivityError;

    fn try_from(index: usize) -> Result<Self> {
        Self::new(index)
    }
}

impl From<BucketKey> for usize {
    fn from(key: BucketKey) -> usize {
        key.index()
    }
}

// ── DayPart ───────────────────────────────────────────────────────────────────

/// Coarse partition of the day by hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPart {
    /// 06:00-11:59
    Morning,
    /// 12:00-17:59
    Afternoon,
    /// 18:00-21:59
    Evening,
    /// 22:00-05:59
    Night,
}

impl DayPart {
    /// All day-parts in reporting order.
    pub const ALL: [DayPart; 4] = [
        DayPart::Morning,
        DayPart::Afternoon,
        DayPart::Evening,
        DayPart::Night,
    ];

    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => DayPart::Morning,
            12..=17 => DayPart::Afternoon,
            18..=21 => DayPart::Evening,
            _ => DayPart::Night,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DayPart::Morning => "Morning",
            DayPart::Afternoon => "Afternoon",
            DayPart::Evening => "Evening",
            DayPart::Night => "Night",
        }
    }

    /// Human-readable hour window, e.g. `"6:00-11:59"`.
    pub fn window(self) -> &'static str {
        match self {
            DayPart::Morning => "6:00-11:59",
            DayPart::Afternoon => "12:00-17:59",
            DayPart::Evening => "18:00-21:59",
            DayPart::Night => "22:00-5:59",
        }
    }
}

// ── Clock formatting ──────────────────────────────────────────────────────────

/// Format a wall-clock time on a 12-hour dial, e.g. `"12:05 AM"`, `"3:45 PM"`.
///
/// ```
/// use activity_core::time_utils::format_clock_12h;
///
/// assert_eq!(format_clock_12h(0, 5), "12:05 AM");
/// assert_eq!(format_clock_12h(12, 0), "12:00 PM");
/// assert_eq!(format_clock_12h(15, 45), "3:45 PM");
/// ```
pub fn format_clock_12h(hour: u32, minute: u32) -> String {
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let dial = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{:02} {}", dial, minute, suffix)
}

/// Format an event timestamp for listings: `"%Y-%m-%d %H:%M:%S"` in UTC.
pub fn format_event_time(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
