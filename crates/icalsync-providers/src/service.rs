//! CalendarService trait definition.
//!
//! This module defines the [`CalendarService`] trait, the boundary between
//! the reconciliation engine and the remote calendar. Implementations:
//!
//! - `GoogleCalendarClient`: raw API client with a fixed bearer token
//! - `GoogleCalendar`: the client plus token persistence and refresh
//!
//! The engine only ever sees `&dyn CalendarService`, which keeps it testable
//! against an in-memory fake.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use icalsync_core::TargetEvent;

use crate::error::ProviderResult;

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe, so services can be passed
/// around as `&dyn CalendarService`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Metadata of a remote calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarInfo {
    /// Unique identifier for the calendar.
    pub id: String,
    /// Human-readable name of the calendar.
    pub name: String,
    /// Description of the calendar, if available.
    pub description: Option<String>,
    /// The timezone of the calendar (IANA identifier).
    pub timezone: Option<String>,
}

impl CalendarInfo {
    /// Creates a new CalendarInfo with the given ID and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            timezone: None,
        }
    }

    /// Builder method to set timezone.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

/// Query parameters of one `events.list` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Lower bound (inclusive) on event end time.
    pub time_min: DateTime<Utc>,
    /// Upper bound (exclusive) on event start time.
    pub time_max: Option<DateTime<Utc>>,
    /// Include cancelled (soft-deleted) events.
    pub show_deleted: bool,
    /// Expand recurring events into instances.
    pub single_events: bool,
    /// Order results by start time (requires `single_events`).
    pub order_by_start_time: bool,
    /// Page size hint.
    pub max_results: Option<u32>,
    /// Continuation token from the previous page.
    pub page_token: Option<String>,
}

impl ListQuery {
    /// Creates a query starting at `time_min` with no other constraints.
    pub fn new(time_min: DateTime<Utc>) -> Self {
        Self {
            time_min,
            time_max: None,
            show_deleted: false,
            single_events: false,
            order_by_start_time: false,
            max_results: None,
            page_token: None,
        }
    }

    /// Builder method to set the upper bound.
    pub fn with_time_max(mut self, time_max: Option<DateTime<Utc>>) -> Self {
        self.time_max = time_max;
        self
    }

    /// Builder method to include cancelled events.
    pub fn with_show_deleted(mut self, show_deleted: bool) -> Self {
        self.show_deleted = show_deleted;
        self
    }

    /// Builder method to expand recurring events and order by start time.
    pub fn with_single_events_by_start(mut self) -> Self {
        self.single_events = true;
        self.order_by_start_time = true;
        self
    }

    /// Builder method to set the page size hint.
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Returns this query pointed at another page.
    pub fn page(&self, page_token: Option<String>) -> Self {
        Self {
            page_token,
            ..self.clone()
        }
    }

    /// Renders the query as `events.list` URL parameters.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("timeMin", self.time_min.to_rfc3339())];
        if let Some(max) = self.time_max {
            params.push(("timeMax", max.to_rfc3339()));
        }
        if self.show_deleted {
            params.push(("showDeleted", "true".to_string()));
        }
        if self.single_events {
            params.push(("singleEvents", "true".to_string()));
        }
        if self.order_by_start_time {
            params.push(("orderBy", "startTime".to_string()));
        }
        if let Some(max) = self.max_results {
            params.push(("maxResults", max.to_string()));
        }
        if let Some(ref token) = self.page_token {
            params.push(("pageToken", token.clone()));
        }
        params
    }
}

/// One page of an `events.list` response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPage {
    /// Events on this page.
    pub items: Vec<TargetEvent>,
    /// Token of the next page, absent on the last one.
    pub next_page_token: Option<String>,
}

/// The remote calendar, as seen by the reconciler.
///
/// Every method is a single remote call: no retries, no pagination.
pub trait CalendarService: Send + Sync {
    /// Returns the name of this service (e.g. "google").
    fn name(&self) -> &str;

    /// Fetches calendar metadata, including its timezone.
    fn get_calendar<'a>(&'a self, calendar_id: &'a str)
    -> BoxFuture<'a, ProviderResult<CalendarInfo>>;

    /// Fetches one page of events.
    fn list_events_page<'a>(
        &'a self,
        calendar_id: &'a str,
        query: &'a ListQuery,
    ) -> BoxFuture<'a, ProviderResult<EventPage>>;

    /// Inserts an event with a caller-chosen id.
    ///
    /// Fails with `AlreadyExists` when the id is taken.
    fn insert_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a TargetEvent,
    ) -> BoxFuture<'a, ProviderResult<TargetEvent>>;

    /// Replaces the event `event_id` with `event`.
    fn update_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
        event: &'a TargetEvent,
    ) -> BoxFuture<'a, ProviderResult<TargetEvent>>;

    /// Deletes the event `event_id`.
    ///
    /// Fails with `NotFound` or `Gone` when there is nothing to delete.
    fn delete_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>>;
}
