//! Target (remote calendar) event representation.
//!
//! [`TargetEvent`] mirrors the Google Calendar API v3 event resource. Only the
//! fields the feed drives are modelled explicitly; everything else the
//! service returns is kept in [`TargetEvent::extra`] and written back
//! untouched on update, so service-internal metadata survives a sync.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status of an event the service has soft-deleted.
pub const CANCELLED_STATUS: &str = "cancelled";

/// Status of a live event.
pub const CONFIRMED_STATUS: &str = "confirmed";

/// Start or end encoding of a target event.
///
/// All-day events set `date`; timed events set `date_time` and `time_zone`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    /// Date-only value (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// RFC 3339 datetime with offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,

    /// IANA timezone name the datetime is expressed in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    /// Creates a date-only encoding.
    pub fn date(date: impl Into<String>) -> Self {
        Self {
            date: Some(date.into()),
            date_time: None,
            time_zone: None,
        }
    }

    /// Creates a zoned datetime encoding.
    pub fn timed(date_time: impl Into<String>, time_zone: impl Into<String>) -> Self {
        Self {
            date: None,
            date_time: Some(date_time.into()),
            time_zone: Some(time_zone.into()),
        }
    }

    /// Returns true if this is a date-only encoding.
    pub fn is_all_day(&self) -> bool {
        self.date.is_some() && self.date_time.is_none()
    }

    /// Compares two encodings the way the service treats them.
    ///
    /// Datetimes are equal when they denote the same instant, so `Z` and
    /// `+00:00` spellings of one value do not count as a change.
    pub fn same_as(&self, other: &Self) -> bool {
        if self.date != other.date || self.time_zone != other.time_zone {
            return false;
        }
        match (&self.date_time, &other.date_time) {
            (Some(a), Some(b)) => match (
                DateTime::parse_from_rfc3339(a),
                DateTime::parse_from_rfc3339(b),
            ) {
                (Ok(a), Ok(b)) => a == b,
                _ => a == b,
            },
            (a, b) => a == b,
        }
    }
}

/// An event resource of the remote calendar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetEvent {
    /// Event identity (primary key).
    #[serde(default)]
    pub id: String,

    /// Event title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Event description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Event location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Start encoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,

    /// End encoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,

    /// Event status (`confirmed`, `tentative`, `cancelled`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Every other field of the resource, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TargetEvent {
    /// Creates an empty event with the given identity.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set start and end.
    pub fn with_span(mut self, start: EventDateTime, end: Option<EventDateTime>) -> Self {
        self.start = Some(start);
        self.end = end;
        self
    }

    /// Builder method to set the status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Returns true if the service has soft-deleted this event.
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some(CANCELLED_STATUS)
    }

    /// Human-readable title, falling back to a placeholder.
    pub fn display_name(&self) -> &str {
        self.summary.as_deref().unwrap_or("<unnamed event>")
    }

    /// Returns true if every field mirrored from the feed matches `wanted`.
    ///
    /// `wanted` is a freshly normalized record, description annotation
    /// included. The end is only compared when `wanted` carries one.
    pub fn mirrors(&self, wanted: &TargetEvent) -> bool {
        self.summary == wanted.summary
            && self.description == wanted.description
            && self.location == wanted.location
            && encodings_match(self.start.as_ref(), wanted.start.as_ref())
            && (wanted.end.is_none()
                || encodings_match(self.end.as_ref(), wanted.end.as_ref()))
    }

    /// Copies the mirrored fields of `wanted` onto this record.
    ///
    /// The identity and every unmodelled field stay as they are; the end is
    /// left alone when `wanted` has none.
    pub fn merge_from(&mut self, wanted: &TargetEvent) {
        self.summary = wanted.summary.clone();
        self.description = wanted.description.clone();
        self.location = wanted.location.clone();
        self.start = wanted.start.clone();
        if wanted.end.is_some() {
            self.end = wanted.end.clone();
        }
        if let Some(ref status) = wanted.status {
            self.status = Some(status.clone());
        }
    }
}

fn encodings_match(a: Option<&EventDateTime>, b: Option<&EventDateTime>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.same_as(b),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(dt: &str) -> EventDateTime {
        EventDateTime::timed(dt, "America/Los_Angeles")
    }

    fn sample() -> TargetEvent {
        TargetEvent::new("abc123")
            .with_summary("Test 2")
            .with_description("Notes (Imported from icalsync)")
            .with_location("Room 1")
            .with_span(
                timed("2020-03-04T04:15:30-08:00"),
                Some(timed("2020-03-04T10:15:30-08:00")),
            )
    }

    #[test]
    fn parse_api_event_keeps_unknown_fields() {
        let json = r#"{
            "kind": "calendar#event",
            "etag": "\"3181161784712000\"",
            "id": "abc123",
            "status": "confirmed",
            "htmlLink": "https://www.google.com/calendar/event?eid=abc",
            "summary": "Test 1",
            "start": { "dateTime": "2020-03-04T04:15:30-08:00", "timeZone": "America/Los_Angeles" },
            "end": { "dateTime": "2020-03-04T10:15:30-08:00", "timeZone": "America/Los_Angeles" },
            "reminders": { "useDefault": true }
        }"#;

        let event: TargetEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.id, "abc123");
        assert_eq!(event.summary.as_deref(), Some("Test 1"));
        assert!(event.description.is_none());
        assert!(!event.is_cancelled());
        assert_eq!(event.extra["kind"], "calendar#event");
        assert_eq!(event.extra["reminders"]["useDefault"], true);

        let back = serde_json::to_value(&event).unwrap();
        assert_eq!(back["htmlLink"], "https://www.google.com/calendar/event?eid=abc");
        assert!(back.get("description").is_none());
    }

    #[test]
    fn cancelled_event_without_fields() {
        let json = r#"{ "id": "gone1", "status": "cancelled" }"#;
        let event: TargetEvent = serde_json::from_str(json).unwrap();
        assert!(event.is_cancelled());
        assert!(event.start.is_none());
        assert_eq!(event.display_name(), "<unnamed event>");
    }

    #[test]
    fn all_day_encoding_serializes_date_only() {
        let value = serde_json::to_value(EventDateTime::date("2020-03-04")).unwrap();
        assert_eq!(value, serde_json::json!({ "date": "2020-03-04" }));
        assert!(EventDateTime::date("2020-03-04").is_all_day());
        assert!(!timed("2020-03-04T04:15:30-08:00").is_all_day());
    }

    #[test]
    fn same_instant_different_spelling() {
        let a = EventDateTime::timed("2020-03-04T10:15:30Z", "UTC");
        let b = EventDateTime::timed("2020-03-04T10:15:30+00:00", "UTC");
        assert!(a.same_as(&b));

        let c = EventDateTime::timed("2020-03-04T10:15:31+00:00", "UTC");
        assert!(!a.same_as(&c));

        let d = EventDateTime::timed("2020-03-04T10:15:30+00:00", "Europe/London");
        assert!(!b.same_as(&d));
    }

    #[test]
    fn mirrors_identical_record() {
        assert!(sample().mirrors(&sample()));
    }

    #[test]
    fn mirrors_detects_location_change() {
        let wanted = sample().with_location("Room 2");
        assert!(!sample().mirrors(&wanted));
    }

    #[test]
    fn mirrors_ignores_end_when_feed_has_none() {
        let mut wanted = sample();
        wanted.end = None;
        assert!(sample().mirrors(&wanted));
    }

    #[test]
    fn merge_preserves_identity_and_metadata() {
        let mut current = sample();
        current
            .extra
            .insert("etag".to_string(), Value::String("\"1\"".to_string()));

        let mut wanted = sample().with_location("Room 2");
        wanted.end = None;
        current.merge_from(&wanted);

        assert_eq!(current.id, "abc123");
        assert_eq!(current.location.as_deref(), Some("Room 2"));
        assert_eq!(current.end, sample().end);
        assert_eq!(current.extra["etag"], "\"1\"");
    }
}
