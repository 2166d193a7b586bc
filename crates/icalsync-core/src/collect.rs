//! Feed filtering and indexing.
//!
//! [`collect_feed`] turns the parsed feed into the keyed collection the
//! reconciler consumes: past events and events beyond the horizon are
//! dropped, the keep hook gets a say, and survivors are indexed by identity.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::event::FeedEvent;
use crate::time::{reinterpret_utc_marker, start_of_day};

/// Site-specific filtering and annotation of feed events.
///
/// Both methods default to pass-through.
pub trait FeedHooks: Send + Sync {
    /// Returns false to drop the event from the sync.
    fn keep(&self, _event: &FeedEvent) -> bool {
        true
    }

    /// Rewrites an event before it is normalized.
    fn annotate(&self, event: FeedEvent) -> FeedEvent {
        event
    }
}

/// Hooks that keep everything and change nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl FeedHooks for NoHooks {}

/// Time-based filter applied to feed events.
///
/// Values carrying the bare UTC marker are read the way the normalizer will
/// write them: as wall-clock time in `floating_zone` when one is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedFilter {
    /// The current instant.
    pub now: DateTime<Utc>,
    /// Midnight of the current day in the zone `now` was given in.
    pub day_start: DateTime<Utc>,
    /// The current date in that zone.
    pub today: NaiveDate,
    /// Days ahead to mirror, `0` for no limit.
    pub horizon_days: u32,
    /// Zone UTC-marked values are reinterpreted in, `None` to take them as
    /// real UTC instants.
    pub floating_zone: Option<Tz>,
}

impl FeedFilter {
    /// Builds a filter from the current instant, given in the calendar's
    /// timezone so "today" is the calendar's today.
    pub fn at<Z: TimeZone>(now: &DateTime<Z>, horizon_days: u32) -> Self {
        Self {
            now: now.with_timezone(&Utc),
            day_start: start_of_day(now),
            today: now.date_naive(),
            horizon_days,
            floating_zone: None,
        }
    }

    /// Builder: reinterpret UTC-marked values in `zone`.
    pub fn with_floating_zone(mut self, zone: Tz) -> Self {
        self.floating_zone = Some(zone);
        self
    }

    fn start_instant(&self, event: &FeedEvent) -> DateTime<Utc> {
        match self.floating_zone {
            Some(zone) => reinterpret_utc_marker(&event.start, zone).with_timezone(&Utc),
            None => event.start.with_timezone(&Utc),
        }
    }

    /// Returns true if the event belongs to today or later.
    ///
    /// Timed events must start strictly after the start of today. All-day
    /// events are mirrored by date, so any dated today or later is kept.
    pub fn is_upcoming(&self, event: &FeedEvent) -> bool {
        if event.is_all_day() {
            event.start.date_naive() >= self.today
        } else {
            self.start_instant(event) > self.day_start
        }
    }

    /// Returns true if the event starts too far ahead to mirror.
    pub fn is_beyond_horizon(&self, event: &FeedEvent) -> bool {
        self.horizon_days > 0
            && (self.start_instant(event) - self.now).num_days() >= i64::from(self.horizon_days)
    }
}

/// Filters the feed and indexes survivors by identity.
///
/// When two events share an identity the later one in feed order wins.
pub fn collect_feed(
    events: impl IntoIterator<Item = FeedEvent>,
    filter: &FeedFilter,
    prefix: &str,
    hooks: &dyn FeedHooks,
) -> HashMap<String, FeedEvent> {
    let mut collected = HashMap::new();

    for event in events {
        if !filter.is_upcoming(&event) {
            continue;
        }
        if filter.is_beyond_horizon(&event) {
            info!(
                uid = %event.uid,
                start = %event.start,
                "Skipping event \"{}\" beyond sync horizon",
                event.display_name()
            );
            continue;
        }
        if !hooks.keep(&event) {
            debug!(uid = %event.uid, "Event \"{}\" filtered out", event.display_name());
            continue;
        }

        let identity = event.identity(prefix);
        if collected.insert(identity.clone(), event).is_some() {
            debug!(%identity, "Duplicate feed identity, keeping the later event");
        }
    }

    debug!(count = collected.len(), "Collected feed events");
    collected
}
