//! FeedEvent to TargetEvent conversion.
//!
//! The normalization process:
//! 1. Derives the target identity from the UID and the event span
//! 2. Encodes start and end, either as dates (all-day) or as zoned datetimes
//! 3. Appends the import marker to the description

use std::sync::Arc;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::collect::{FeedHooks, NoHooks};
use crate::event::FeedEvent;
use crate::target::{EventDateTime, TargetEvent};
use crate::time::reinterpret_utc_marker;

/// Suffix appended to every mirrored description.
pub const DEFAULT_IMPORT_MARKER: &str = "(Imported from icalsync)";

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Options controlling normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Reinterpret bare-UTC wall-clock values in the target timezone.
    pub replace_utc: bool,
    /// Text appended to descriptions.
    pub import_marker: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            replace_utc: true,
            import_marker: DEFAULT_IMPORT_MARKER.to_string(),
        }
    }
}

/// Converts a [`FeedEvent`] to its target representation.
///
/// The result carries no status; callers that restore a cancelled event set
/// it themselves.
pub fn normalize_event(
    event: &FeedEvent,
    target_tz: Tz,
    prefix: &str,
    options: &NormalizeOptions,
) -> TargetEvent {
    let (start, end) = if event.is_all_day() {
        (
            encode_date(&event.start),
            event.end.as_ref().map(encode_date),
        )
    } else {
        (
            encode_datetime(&event.start, target_tz, options.replace_utc),
            event
                .end
                .as_ref()
                .map(|end| encode_datetime(end, target_tz, options.replace_utc)),
        )
    };

    TargetEvent {
        id: event.identity(prefix),
        summary: event.name.clone(),
        description: Some(annotate_description(
            event.description.as_deref(),
            &options.import_marker,
        )),
        location: event.location.clone(),
        start: Some(start),
        end,
        ..Default::default()
    }
}

/// Encodes an instant as a zoned datetime in `target_tz`.
fn encode_datetime(dt: &DateTime<Tz>, target_tz: Tz, replace_utc: bool) -> EventDateTime {
    let local = if replace_utc {
        reinterpret_utc_marker(dt, target_tz)
    } else {
        dt.with_timezone(&target_tz)
    };
    EventDateTime::timed(local.format(DATETIME_FORMAT).to_string(), target_tz.name())
}

/// Encodes the wall-clock date of an instant, in its own timezone.
fn encode_date(dt: &DateTime<Tz>) -> EventDateTime {
    EventDateTime::date(dt.date_naive().format(DATE_FORMAT).to_string())
}

fn annotate_description(description: Option<&str>, marker: &str) -> String {
    match description {
        Some(text) if !text.is_empty() => format!("{text} {marker}"),
        _ => marker.to_string(),
    }
}

/// Normalizer bound to one target calendar.
///
/// Runs the annotation hook before normalizing, so the records it produces
/// are the ones change detection compares against.
#[derive(Clone)]
pub struct Normalizer {
    timezone: Tz,
    prefix: String,
    options: NormalizeOptions,
    hooks: Arc<dyn FeedHooks>,
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("timezone", &self.timezone)
            .field("prefix", &self.prefix)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Normalizer {
    /// Creates a normalizer with default options and no hooks.
    pub fn new(timezone: Tz, prefix: impl Into<String>) -> Self {
        Self {
            timezone,
            prefix: prefix.into(),
            options: NormalizeOptions::default(),
            hooks: Arc::new(NoHooks),
        }
    }

    /// Builder method to set the options.
    pub fn with_options(mut self, options: NormalizeOptions) -> Self {
        self.options = options;
        self
    }

    /// Builder method to set the hooks.
    pub fn with_hooks(mut self, hooks: Arc<dyn FeedHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// The target timezone.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// The namespace prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Annotates and normalizes `event`.
    ///
    /// The identity always comes from the event as collected, whatever the
    /// hook rewrites.
    pub fn normalize(&self, event: &FeedEvent) -> TargetEvent {
        let id = event.identity(&self.prefix);
        let annotated = self.hooks.annotate(event.clone());
        let mut target = normalize_event(&annotated, self.timezone, &self.prefix, &self.options);
        target.id = id;
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use chrono_tz::America::{Los_Angeles, New_York};

    fn utc_marker(h: u32) -> DateTime<Tz> {
        Tz::UTC.with_ymd_and_hms(2020, 3, 4, h, 15, 30).unwrap()
    }

    #[test]
    fn replace_utc_keeps_wall_clock() {
        let encoded = encode_datetime(&utc_marker(10), Los_Angeles, true);
        assert_eq!(encoded.date_time.as_deref(), Some("2020-03-04T10:15:30-08:00"));
        assert_eq!(encoded.time_zone.as_deref(), Some("America/Los_Angeles"));
    }

    #[test]
    fn without_replace_utc_converts_instant() {
        let encoded = encode_datetime(&utc_marker(10), Los_Angeles, false);
        assert_eq!(encoded.date_time.as_deref(), Some("2020-03-04T02:15:30-08:00"));
    }

    #[test]
    fn explicit_zone_is_always_converted() {
        let ny = New_York.with_ymd_and_hms(2020, 3, 4, 10, 15, 30).unwrap();
        for replace in [true, false] {
            let encoded = encode_datetime(&ny, Los_Angeles, replace);
            assert_eq!(encoded.date_time.as_deref(), Some("2020-03-04T07:15:30-08:00"));
        }
    }

    #[test]
    fn timed_event() {
        let event = FeedEvent::new("42", utc_marker(4))
            .with_end(utc_marker(10))
            .with_name("Test 2")
            .with_description("Notes")
            .with_location("Room 1");

        let target = normalize_event(&event, Los_Angeles, "bob", &NormalizeOptions::default());
        assert_eq!(target.id, "bob4215832953301583316930");
        assert_eq!(target.summary.as_deref(), Some("Test 2"));
        assert_eq!(
            target.description.as_deref(),
            Some("Notes (Imported from icalsync)")
        );
        assert_eq!(target.location.as_deref(), Some("Room 1"));
        assert_eq!(
            target.start,
            Some(EventDateTime::timed(
                "2020-03-04T04:15:30-08:00",
                "America/Los_Angeles"
            ))
        );
        assert_eq!(
            target.end,
            Some(EventDateTime::timed(
                "2020-03-04T10:15:30-08:00",
                "America/Los_Angeles"
            ))
        );
        assert!(target.status.is_none());
    }

    #[test]
    fn all_day_event_uses_dates() {
        let midnight = Tz::UTC.with_ymd_and_hms(2020, 3, 4, 0, 0, 0).unwrap();
        let event = FeedEvent::new("holiday", midnight).with_end(midnight + Duration::days(1));

        let target = normalize_event(&event, Los_Angeles, "", &NormalizeOptions::default());
        assert_eq!(target.start, Some(EventDateTime::date("2020-03-04")));
        assert_eq!(target.end, Some(EventDateTime::date("2020-03-05")));
    }

    #[test]
    fn multi_day_event_is_flattened_to_dates() {
        let start = Tz::UTC.with_ymd_and_hms(2020, 3, 4, 9, 0, 0).unwrap();
        let event = FeedEvent::new("trip", start).with_end(start + Duration::days(3));

        let target = normalize_event(&event, Los_Angeles, "", &NormalizeOptions::default());
        assert_eq!(target.start, Some(EventDateTime::date("2020-03-04")));
        assert_eq!(target.end, Some(EventDateTime::date("2020-03-07")));
    }

    #[test]
    fn missing_end_is_omitted() {
        let event = FeedEvent::new("42", utc_marker(4));
        let target = normalize_event(&event, Tz::UTC, "", &NormalizeOptions::default());
        assert!(target.start.is_some());
        assert!(target.end.is_none());
        assert_eq!(target.id, "4215832953301583295330");
    }

    #[test]
    fn empty_description_yields_marker_only() {
        assert_eq!(annotate_description(None, "[m]"), "[m]");
        assert_eq!(annotate_description(Some(""), "[m]"), "[m]");
        assert_eq!(annotate_description(Some("x"), "[m]"), "x [m]");
    }

    struct Shout;

    impl FeedHooks for Shout {
        fn annotate(&self, mut event: FeedEvent) -> FeedEvent {
            event.name = event.name.map(|n| n.to_uppercase());
            event.uid = "rewritten".to_string();
            event
        }
    }

    #[test]
    fn normalizer_annotates_before_normalizing() {
        let event = FeedEvent::new("42", utc_marker(4))
            .with_end(utc_marker(10))
            .with_name("standup");

        let normalizer = Normalizer::new(Los_Angeles, "bob").with_hooks(Arc::new(Shout));
        let target = normalizer.normalize(&event);

        assert_eq!(target.summary.as_deref(), Some("STANDUP"));
        assert_eq!(target.id, event.identity("bob"));
    }
}
