//! Week-window calculus for the metrics rollup.
//!
//! Aggregation windows are half-open `[start, end)` ranges exactly seven
//! days long, anchored to a boundary weekday at midnight in a fixed-offset
//! reference zone (the plant's local time). Every instant crosses this API
//! as `DateTime<Utc>`; conversion to the reference zone happens only inside
//! the boundary math, so timezone-naive values cannot leak in.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Default reference zone offset: UTC+8 (plant local time, no DST).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 8;

/// Default week boundary: Sunday 00:00 in the reference zone.
pub const DEFAULT_BOUNDARY: Weekday = Weekday::Sun;

/// A half-open aggregation window `[start, end)` at 7-day granularity.
///
/// Windows are derived, never persisted as their own entity; they key the
/// aggregate tables via their start/end instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WeekWindow {
    /// True if `t` falls inside this window (start inclusive, end exclusive).
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    /// Window start as epoch milliseconds (the warehouse key encoding).
    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    /// Window end as epoch milliseconds.
    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }

    /// Rebuild a window from warehouse epoch-millisecond keys.
    pub fn from_millis(start_ms: i64, end_ms: i64) -> Option<Self> {
        let start = DateTime::from_timestamp_millis(start_ms)?;
        let end = DateTime::from_timestamp_millis(end_ms)?;
        Some(Self { start, end })
    }
}

impl fmt::Display for WeekWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {})", self.start.format("%Y-%m-%d %H:%M"), self.end.format("%Y-%m-%d %H:%M"))
    }
}

/// Fixed-offset reference zone plus the configured boundary weekday.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceZone {
    offset: FixedOffset,
    boundary: Weekday,
}

impl Default for ReferenceZone {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600)
                .expect("default offset is valid"),
            boundary: DEFAULT_BOUNDARY,
        }
    }
}

impl ReferenceZone {
    /// Creates a reference zone from a whole-hour UTC offset and a boundary
    /// weekday.
    pub fn new(utc_offset_hours: i32, boundary: Weekday) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600).ok_or_else(|| {
            Error::config(format!("invalid UTC offset: {} hours", utc_offset_hours))
        })?;
        Ok(Self { offset, boundary })
    }

    pub fn boundary(&self) -> Weekday {
        self.boundary
    }

    /// Returns the most recent boundary-weekday midnight (reference zone) at
    /// or before `t`.
    ///
    /// Idempotent: `week_start(week_start(t)) == week_start(t)`.
    pub fn week_start(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let local = t.with_timezone(&self.offset);
        let days_past = (local.weekday().num_days_from_sunday() + 7
            - self.boundary.num_days_from_sunday())
            % 7;
        let boundary_date = local.date_naive() - Duration::days(days_past as i64);
        let boundary_local = boundary_date.and_time(NaiveTime::MIN);
        // Fixed offsets have no DST, so local -> UTC is plain arithmetic.
        let utc_naive = boundary_local - Duration::seconds(self.offset.local_minus_utc() as i64);
        DateTime::from_naive_utc_and_offset(utc_naive, Utc)
    }

    /// The window containing `t`.
    pub fn window_of(&self, t: DateTime<Utc>) -> WeekWindow {
        let start = self.week_start(t);
        WeekWindow {
            start,
            end: start + Duration::days(7),
        }
    }

    /// Enumerates every consecutive 7-day window from `week_start(earliest)`
    /// up to but not including the first window whose start is >= `latest`.
    ///
    /// With `latest` = now, the final yielded window is the in-progress
    /// current week.
    pub fn week_ranges(&self, earliest: DateTime<Utc>, latest: DateTime<Utc>) -> WeekRanges {
        WeekRanges {
            next_start: self.week_start(earliest),
            latest,
        }
    }
}

/// Iterator over consecutive week windows, see [`ReferenceZone::week_ranges`].
#[derive(Debug, Clone)]
pub struct WeekRanges {
    next_start: DateTime<Utc>,
    latest: DateTime<Utc>,
}

impl Iterator for WeekRanges {
    type Item = WeekWindow;

    fn next(&mut self) -> Option<WeekWindow> {
        if self.next_start >= self.latest {
            return None;
        }
        let start = self.next_start;
        let end = start + Duration::days(7);
        self.next_start = end;
        Some(WeekWindow { start, end })
    }
}
