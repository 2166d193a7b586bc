//! ICS/iCalendar parsing.
//!
//! This module parses iCalendar (RFC 5545) documents and converts each
//! VEVENT to a [`FeedEvent`]. Recurring events are expected to be expanded by
//! the feed publisher; RRULEs are not interpreted.
//!
//! The end comes from DTEND, else from DTSTART plus DURATION. A date-only
//! DTSTART with neither lasts one day (RFC 5545 §3.6.1).

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike,
};
use icalsync_core::FeedEvent;
use tracing::{debug, warn};

use super::{FeedError, FeedResult};

/// Parses an ICS document into feed events.
///
/// VEVENTs without a UID or a DTSTART are skipped with a warning.
///
/// # Errors
///
/// Returns [`FeedError::Parse`] if the body is not a VCALENDAR.
pub fn parse_feed(ics: &str) -> FeedResult<Vec<FeedEvent>> {
    let body = ics.trim_start_matches('\u{feff}').trim_start();
    if !body
        .get(..15)
        .is_some_and(|head| head.eq_ignore_ascii_case("BEGIN:VCALENDAR"))
    {
        return Err(FeedError::Parse(
            "document does not start with BEGIN:VCALENDAR".to_string(),
        ));
    }

    let calendar = body.parse::<Calendar>().map_err(FeedError::Parse)?;

    let events: Vec<FeedEvent> = calendar
        .iter()
        .filter_map(|component| match component {
            CalendarComponent::Event(event) => convert_event(event),
            _ => None,
        })
        .collect();

    debug!(count = events.len(), "Parsed feed events");
    Ok(events)
}

fn convert_event(event: &Event) -> Option<FeedEvent> {
    let Some(uid) = event.get_uid() else {
        warn!(summary = ?event.get_summary(), "Skipping VEVENT without UID");
        return None;
    };
    let Some(start) = event.get_start() else {
        warn!(uid, "Skipping VEVENT without DTSTART");
        return None;
    };

    let date_only = matches!(start, DatePerhapsTime::Date(_));
    let start = convert_date_time(start);

    let end = match (event.get_end(), event.property_value("DURATION")) {
        (Some(end), _) => Some(convert_date_time(end)),
        (None, Some(raw)) => {
            let end = parse_duration(raw).and_then(|d| start.checked_add_signed(d));
            if end.is_none() {
                warn!(uid, duration = raw, "Ignoring malformed DURATION");
            }
            end
        }
        (None, None) if date_only => start.checked_add_signed(Duration::days(1)),
        (None, None) => None,
    };

    let mut feed_event = FeedEvent::new(uid, start);
    if let Some(end) = end {
        feed_event = feed_event.with_end(end);
    }
    feed_event.name = non_empty(event.get_summary());
    feed_event.description = non_empty(event.get_description());
    feed_event.location = non_empty(event.get_location());

    Some(feed_event)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Converts a DTSTART/DTEND value.
///
/// UTC, floating and date-only values carry `Tz::UTC`; zoned values keep
/// their zone when it is a known IANA name.
fn convert_date_time(value: DatePerhapsTime) -> DateTime<Tz> {
    match value {
        DatePerhapsTime::Date(date) => {
            Tz::UTC.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
        }
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => dt.with_timezone(&Tz::UTC),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            Tz::UTC.from_utc_datetime(&naive)
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            zoned(&date_time, &tzid)
        }
    }
}

/// Parses an RFC 5545 duration: `PT1H30M`, `P1D`, `P1DT12H`, `-P2W`.
fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim().to_ascii_uppercase();
    let (negative, rest) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(&raw)),
    };
    let rest = rest.strip_prefix('P')?;

    let mut total = Duration::zero();
    let mut digits = String::new();
    let mut in_time = false;
    let mut any_unit = false;
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'T' if digits.is_empty() && !in_time => in_time = true,
            unit => {
                let n: i64 = digits.parse().ok()?;
                digits.clear();
                let part = match (unit, in_time) {
                    ('W', false) => Duration::try_weeks(n)?,
                    ('D', false) => Duration::try_days(n)?,
                    ('H', true) => Duration::try_hours(n)?,
                    ('M', true) => Duration::try_minutes(n)?,
                    ('S', true) => Duration::try_seconds(n)?,
                    _ => return None,
                };
                total = total.checked_add(&part)?;
                any_unit = true;
            }
        }
    }

    if !any_unit || !digits.is_empty() {
        return None;
    }
    Some(if negative { -total } else { total })
}

fn zoned(date_time: &NaiveDateTime, tzid: &str) -> DateTime<Tz> {
    let tz = match tzid.trim_matches('"').parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            warn!(tzid, "Unknown TZID, treating value as UTC");
            return Tz::UTC.from_utc_datetime(date_time);
        }
    };
    tz.from_local_datetime(date_time)
        .earliest()
        // Wall-clock time skipped by a DST transition.
        .unwrap_or_else(|| tz.from_utc_datetime(date_time))
}
