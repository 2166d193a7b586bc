//! In-memory calendar service for engine tests.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use icalsync_core::{CANCELLED_STATUS, EventDateTime, TargetEvent};
use icalsync_providers::{
    BoxFuture, CalendarInfo, CalendarService, EventPage, ListQuery, ProviderError,
    ProviderErrorCode, ProviderResult,
};

/// A remote call observed by [`FakeCalendar`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Insert(String),
    Update(String),
    Delete(String),
}

/// Calendar service backed by a vector.
///
/// Deletes soft-delete (status `cancelled`) like the real API, deleting a
/// cancelled event answers `Gone`, and inserting a taken id answers
/// `AlreadyExists`. Listing honours the query window: an event is returned
/// when it ends after `time_min` and starts before `time_max`. Events
/// without a start are always returned.
pub struct FakeCalendar {
    timezone: Option<String>,
    page_size: usize,
    events: Mutex<Vec<TargetEvent>>,
    calls: Mutex<Vec<Call>>,
    queries: Mutex<Vec<ListQuery>>,
    failures: Mutex<HashMap<String, ProviderErrorCode>>,
}

impl FakeCalendar {
    pub fn new(timezone: &str) -> Self {
        Self {
            timezone: Some(timezone.to_string()),
            page_size: 100,
            events: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_events(self, events: Vec<TargetEvent>) -> Self {
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = events;
        self
    }

    /// Makes every mutation of `id` fail with `code`.
    pub fn fail_on(&self, id: &str, code: ProviderErrorCode) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), code);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn queries(&self) -> Vec<ListQuery> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events(&self) -> Vec<TargetEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn event(&self, id: &str) -> Option<TargetEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    fn instant(&self, value: &EventDateTime) -> Option<DateTime<Utc>> {
        if let Some(ref date_time) = value.date_time {
            return DateTime::parse_from_rfc3339(date_time)
                .ok()
                .map(|dt| dt.with_timezone(&Utc));
        }
        let zone: Tz = self.timezone.as_deref()?.parse().ok()?;
        let midnight = NaiveDate::parse_from_str(value.date.as_deref()?, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?;
        zone.from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn in_window(&self, event: &TargetEvent, query: &ListQuery) -> bool {
        let Some(start) = event.start.as_ref().and_then(|s| self.instant(s)) else {
            return true;
        };
        let end = event
            .end
            .as_ref()
            .and_then(|e| self.instant(e))
            .unwrap_or(start);
        let after_min = if end > start { end > query.time_min } else { start >= query.time_min };
        after_min && query.time_max.is_none_or(|max| start < max)
    }

    fn record(&self, call: Call) -> ProviderResult<()> {
        let id = match &call {
            Call::Insert(id) | Call::Update(id) | Call::Delete(id) => id.clone(),
        };
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        match self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            Some(code) => Err(ProviderError::new(*code, format!("injected failure for {}", id))),
            None => Ok(()),
        }
    }
}

impl CalendarService for FakeCalendar {
    fn name(&self) -> &str {
        "fake"
    }

    fn get_calendar<'a>(
        &'a self,
        calendar_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<CalendarInfo>> {
        Box::pin(async move {
            let mut info = CalendarInfo::new(calendar_id, "Fake");
            info.timezone = self.timezone.clone();
            Ok(info)
        })
    }

    fn list_events_page<'a>(
        &'a self,
        _calendar_id: &'a str,
        query: &'a ListQuery,
    ) -> BoxFuture<'a, ProviderResult<EventPage>> {
        Box::pin(async move {
            self.queries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(query.clone());

            let offset: usize = match query.page_token.as_deref() {
                Some(token) => token
                    .parse()
                    .map_err(|_| ProviderError::bad_request("bad page token"))?,
                None => 0,
            };
            let events: Vec<TargetEvent> = self
                .events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter(|e| self.in_window(e, query))
                .cloned()
                .collect();
            let end = (offset + self.page_size).min(events.len());
            let items = events.get(offset..end).unwrap_or_default().to_vec();
            let next_page_token = (end < events.len()).then(|| end.to_string());
            Ok(EventPage {
                items,
                next_page_token,
            })
        })
    }

    fn insert_event<'a>(
        &'a self,
        _calendar_id: &'a str,
        event: &'a TargetEvent,
    ) -> BoxFuture<'a, ProviderResult<TargetEvent>> {
        Box::pin(async move {
            self.record(Call::Insert(event.id.clone()))?;
            let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
            if events.iter().any(|e| e.id == event.id) {
                return Err(ProviderError::already_exists("The requested identifier already exists."));
            }
            events.push(event.clone());
            Ok(event.clone())
        })
    }

    fn update_event<'a>(
        &'a self,
        _calendar_id: &'a str,
        event_id: &'a str,
        event: &'a TargetEvent,
    ) -> BoxFuture<'a, ProviderResult<TargetEvent>> {
        Box::pin(async move {
            self.record(Call::Update(event_id.to_string()))?;
            let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = events
                .iter_mut()
                .find(|e| e.id == event_id)
                .ok_or_else(|| ProviderError::not_found("Not Found"))?;
            *slot = event.clone();
            Ok(event.clone())
        })
    }

    fn delete_event<'a>(
        &'a self,
        _calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.record(Call::Delete(event_id.to_string()))?;
            let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = events
                .iter_mut()
                .find(|e| e.id == event_id)
                .ok_or_else(|| ProviderError::not_found("Not Found"))?;
            if slot.is_cancelled() {
                return Err(ProviderError::gone("Resource has been deleted"));
            }
            slot.status = Some(CANCELLED_STATUS.to_string());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn listing_honours_window() {
        let noon = Utc.with_ymd_and_hms(2025, 2, 5, 12, 0, 0).unwrap();
        let at = |h| (noon + Duration::hours(h)).to_rfc3339();
        let timed = |id: &str, start: i64, end: i64| {
            let mut event = TargetEvent::new(id);
            event.start = Some(EventDateTime::timed(at(start), "UTC"));
            event.end = Some(EventDateTime::timed(at(end), "UTC"));
            event
        };
        let service = FakeCalendar::new("UTC").with_events(vec![
            timed("ended", -14, -13),
            timed("ongoing", -13, -11),
            timed("inside", 24, 25),
            timed("outside", 48, 49),
            TargetEvent::new("undated"),
        ]);

        let mut query = ListQuery::new(Utc.with_ymd_and_hms(2025, 2, 4, 23, 0, 0).unwrap());
        query.time_max = Some(noon + Duration::hours(30));
        let page = service.list_events_page("primary", &query).await.unwrap();
        let ids: Vec<_> = page.items.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["ongoing", "inside", "undated"]);
    }
}
