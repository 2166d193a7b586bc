//! Feed event type.
//!
//! A [`FeedEvent`] is one VEVENT from the source feed, after parsing and
//! before normalization. Instants keep their source timezone: the bare `UTC`
//! marker (`Tz::UTC`) is meaningful to the normalizer, because many feeds
//! emit local wall-clock values mislabelled as UTC.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;

use crate::identity::derive_identity;

/// A single event from the source feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    /// The natural unique identifier (the ICS `UID`).
    pub uid: String,

    /// The event title (`SUMMARY`).
    pub name: Option<String>,

    /// Free-text description.
    pub description: Option<String>,

    /// Free-text location.
    pub location: Option<String>,

    /// When the event starts, in its source timezone.
    ///
    /// Floating and date-only values carry `Tz::UTC`.
    pub start: DateTime<Tz>,

    /// When the event ends, if the feed says so.
    pub end: Option<DateTime<Tz>>,
}

impl FeedEvent {
    /// Creates a new feed event with no end and no text fields.
    pub fn new(uid: impl Into<String>, start: DateTime<Tz>) -> Self {
        Self {
            uid: uid.into(),
            name: None,
            description: None,
            location: None,
            start,
            end: None,
        }
    }

    /// Builder method to set the end.
    pub fn with_end(mut self, end: DateTime<Tz>) -> Self {
        self.end = Some(end);
        self
    }

    /// Builder method to set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
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

    /// Returns true if the feed provided an end.
    pub fn has_end(&self) -> bool {
        self.end.is_some()
    }

    /// The end used for identity and duration: the start when absent.
    pub fn effective_end(&self) -> DateTime<Tz> {
        self.end.unwrap_or(self.start)
    }

    /// Span between start and effective end.
    pub fn duration(&self) -> Duration {
        self.effective_end() - self.start
    }

    /// Returns true if the event covers at least one full day.
    ///
    /// Any whole-day span counts, including multi-day ones, which are
    /// flattened onto date-only encodings.
    pub fn is_all_day(&self) -> bool {
        self.duration().num_days() >= 1
    }

    /// Human-readable title, falling back to a placeholder.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed event>")
    }

    /// Derives this event's target identity under `prefix`.
    pub fn identity(&self, prefix: &str) -> String {
        derive_identity(prefix, &self.uid, &self.start, &self.effective_end())
    }
}
