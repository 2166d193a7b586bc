//! Time helpers for a sync run.
//!
//! A run looks at "today onwards": feed events are compared against the start
//! of the current day (not the wall clock, so events already in progress today
//! survive), and the remote calendar is listed over a [`SyncWindow`] that
//! starts at the same instant. "Today" is the calendar's today: callers pass
//! `now` in the calendar timezone.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Returns midnight of the day containing `now`, in `now`'s own timezone.
///
/// When midnight does not exist locally (a DST gap at 00:00), the instant
/// itself is returned.
pub fn start_of_day<Z: TimeZone>(now: &DateTime<Z>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    now.timezone()
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc))
}

/// The window of the remote calendar a run looks at.
///
/// Represents `[from, to)`, or `[from, ∞)` when `to` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWindow {
    /// Start of the window (inclusive).
    pub from: DateTime<Utc>,
    /// End of the window (exclusive), unbounded when absent.
    pub to: Option<DateTime<Utc>>,
}

impl SyncWindow {
    /// Creates an unbounded window starting at `from`.
    pub fn starting(from: DateTime<Utc>) -> Self {
        Self { from, to: None }
    }

    /// Creates a window from `day_start` up to `horizon_days` after `now`.
    ///
    /// The upper bound is the same one the feed horizon applies, so every
    /// event kept from the feed is also listed. A horizon of `0` means no
    /// upper bound.
    pub fn for_horizon<Z: TimeZone>(
        day_start: DateTime<Utc>,
        now: &DateTime<Z>,
        horizon_days: u32,
    ) -> Self {
        let to = (horizon_days > 0)
            .then(|| now.with_timezone(&Utc) + Duration::days(i64::from(horizon_days)));
        Self {
            from: day_start,
            to,
        }
    }

    /// Returns true if the window has an upper bound.
    pub fn is_bounded(&self) -> bool {
        self.to.is_some()
    }

    /// Returns true if `instant` falls inside the window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.from && self.to.is_none_or(|to| instant < to)
    }
}

/// Reads a value carrying the bare UTC marker as wall-clock time in `zone`.
///
/// Values in any other zone are converted instead. A wall-clock time skipped
/// by a DST transition falls back to conversion.
pub fn reinterpret_utc_marker(dt: &DateTime<Tz>, zone: Tz) -> DateTime<Tz> {
    if dt.timezone() != Tz::UTC {
        return dt.with_timezone(&zone);
    }
    zone.from_local_datetime(&dt.naive_local())
        .earliest()
        .unwrap_or_else(|| dt.with_timezone(&zone))
}
