//! Google Calendar API client.
//!
//! This module provides a low-level HTTP client for the Google Calendar API,
//! handling authentication, request building, and mapping of HTTP failures
//! onto [`ProviderErrorCode`](crate::error::ProviderErrorCode)s.

use std::time::Duration;

use icalsync_core::TargetEvent;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::service::{BoxFuture, CalendarInfo, CalendarService, EventPage, ListQuery};

/// Base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar API client.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GoogleCalendarClient {
    /// Creates a new Google Calendar client with the given access token.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("icalsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ProviderError::internal("failed to create HTTP client").with_source(e)
            })?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
            base_url: CALENDAR_API_BASE.to_string(),
        })
    }

    /// Points the client at another API root (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Updates the access token (after refresh).
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    fn calendar_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!("{}/events", self.calendar_url(calendar_id))
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        )
    }

    /// Fetches calendar metadata.
    pub async fn get_calendar(&self, calendar_id: &str) -> ProviderResult<CalendarInfo> {
        let request = self
            .http_client
            .get(self.calendar_url(calendar_id))
            .bearer_auth(&self.access_token);

        let calendar: ApiCalendar = read_json(send(request).await?).await?;

        let mut info = CalendarInfo::new(calendar.id, calendar.summary.unwrap_or_default());
        info.description = calendar.description;
        info.timezone = calendar.time_zone;
        Ok(info)
    }

    /// Fetches a single page of events.
    pub async fn list_events_page(
        &self,
        calendar_id: &str,
        query: &ListQuery,
    ) -> ProviderResult<EventPage> {
        let request = self
            .http_client
            .get(self.events_url(calendar_id))
            .bearer_auth(&self.access_token)
            .query(&query.to_params());

        let page: EventListResponse = read_json(send(request).await?).await?;
        debug!(
            calendar_id,
            count = page.items.len(),
            more = page.next_page_token.is_some(),
            "fetched events page"
        );

        Ok(EventPage {
            items: page.items,
            next_page_token: page.next_page_token,
        })
    }

    /// Inserts an event, keeping its id.
    pub async fn insert_event(
        &self,
        calendar_id: &str,
        event: &TargetEvent,
    ) -> ProviderResult<TargetEvent> {
        let request = self
            .http_client
            .post(self.events_url(calendar_id))
            .bearer_auth(&self.access_token)
            .json(event);

        read_json(send(request).await?).await
    }

    /// Replaces an event.
    pub async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &TargetEvent,
    ) -> ProviderResult<TargetEvent> {
        let request = self
            .http_client
            .put(self.event_url(calendar_id, event_id))
            .bearer_auth(&self.access_token)
            .json(event);

        read_json(send(request).await?).await
    }

    /// Deletes an event.
    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> ProviderResult<()> {
        let request = self
            .http_client
            .delete(self.event_url(calendar_id, event_id))
            .bearer_auth(&self.access_token);

        send(request).await?;
        Ok(())
    }
}

impl CalendarService for GoogleCalendarClient {
    fn name(&self) -> &str {
        "google"
    }

    fn get_calendar<'a>(
        &'a self,
        calendar_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<CalendarInfo>> {
        Box::pin(self.get_calendar(calendar_id))
    }

    fn list_events_page<'a>(
        &'a self,
        calendar_id: &'a str,
        query: &'a ListQuery,
    ) -> BoxFuture<'a, ProviderResult<EventPage>> {
        Box::pin(self.list_events_page(calendar_id, query))
    }

    fn insert_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a TargetEvent,
    ) -> BoxFuture<'a, ProviderResult<TargetEvent>> {
        Box::pin(self.insert_event(calendar_id, event))
    }

    fn update_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
        event: &'a TargetEvent,
    ) -> BoxFuture<'a, ProviderResult<TargetEvent>> {
        Box::pin(self.update_event(calendar_id, event_id, event))
    }

    fn delete_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(self.delete_event(calendar_id, event_id))
    }
}

/// Sends a request and turns non-2xx responses into errors.
async fn send(request: reqwest::RequestBuilder) -> ProviderResult<reqwest::Response> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ProviderError::network("request timeout")
        } else if e.is_connect() {
            ProviderError::network(format!("connection failed: {}", e))
        } else {
            ProviderError::network(format!("request failed: {}", e))
        }
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    Err(error_for_status(status, &body, retry_after).with_provider("google"))
}

/// Maps an API failure onto a provider error.
fn error_for_status(
    status: reqwest::StatusCode,
    body: &str,
    retry_after: Option<u64>,
) -> ProviderError {
    use reqwest::StatusCode;

    let api_error = serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .map(|r| r.error);
    let message = api_error
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| body.trim().to_string());
    let rate_limited = api_error.as_ref().is_some_and(|e| {
        e.errors.iter().any(|d| {
            matches!(
                d.reason.as_deref(),
                Some("rateLimitExceeded" | "userRateLimitExceeded")
            )
        })
    });

    match status {
        StatusCode::UNAUTHORIZED => {
            ProviderError::authentication("access token expired or invalid")
        }
        StatusCode::FORBIDDEN if rate_limited => {
            ProviderError::rate_limited(format!("rate limit exceeded: {}", message))
        }
        StatusCode::FORBIDDEN => {
            ProviderError::authorization(format!("access denied: {}", message))
        }
        StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )),
        StatusCode::NOT_FOUND => ProviderError::not_found(message),
        StatusCode::GONE => ProviderError::gone(message),
        StatusCode::CONFLICT => ProviderError::already_exists(message),
        StatusCode::BAD_REQUEST => ProviderError::bad_request(message),
        _ => ProviderError::server(format!("API error ({}): {}", status, message)),
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ProviderResult<T> {
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

    serde_json::from_str(&body).map_err(|e| {
        ProviderError::invalid_response(format!("failed to parse response: {}", e))
            .with_provider("google")
    })
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<TargetEvent>,
    next_page_token: Option<String>,
}

/// Response from the calendars.get endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCalendar {
    id: String,
    summary: Option<String>,
    description: Option<String>,
    time_zone: Option<String>,
}

/// Error envelope of the Google APIs.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::{TimeZone, Utc};
    use icalsync_core::EventDateTime;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GoogleCalendarClient {
        GoogleCalendarClient::new("test-token", Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri())
    }

    fn query() -> ListQuery {
        ListQuery::new(Utc.with_ymd_and_hms(2025, 2, 5, 0, 0, 0).unwrap())
            .with_show_deleted(true)
            .with_single_events_by_start()
    }

    #[test]
    fn parse_event_list_response() {
        let json = r#"{
            "kind": "calendar#events",
            "items": [
                {
                    "id": "event1",
                    "summary": "Test Meeting",
                    "start": { "dateTime": "2024-03-15T10:00:00Z" },
                    "end": { "dateTime": "2024-03-15T11:00:00Z" },
                    "status": "confirmed"
                },
                { "id": "event2", "status": "cancelled" }
            ],
            "nextPageToken": "page-2"
        }"#;

        let response: EventListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items.len(), 2);
        assert_eq!(response.items[0].summary.as_deref(), Some("Test Meeting"));
        assert!(response.items[1].is_cancelled());
        assert_eq!(response.next_page_token.as_deref(), Some("page-2"));
    }

    #[test]
    fn status_mapping() {
        use reqwest::StatusCode;

        let conflict = r#"{"error":{"code":409,"message":"The requested identifier already exists.","errors":[{"reason":"duplicate"}]}}"#;
        let err = error_for_status(StatusCode::CONFLICT, conflict, None);
        assert_eq!(err.code(), ProviderErrorCode::AlreadyExists);
        assert_eq!(err.message(), "The requested identifier already exists.");

        let quota = r#"{"error":{"code":403,"message":"Rate Limit Exceeded","errors":[{"reason":"rateLimitExceeded"}]}}"#;
        assert_eq!(
            error_for_status(StatusCode::FORBIDDEN, quota, None).code(),
            ProviderErrorCode::RateLimited
        );
        assert_eq!(
            error_for_status(StatusCode::FORBIDDEN, "nope", None).code(),
            ProviderErrorCode::AuthorizationFailed
        );
        assert_eq!(
            error_for_status(StatusCode::GONE, "", None).code(),
            ProviderErrorCode::Gone
        );
        assert_eq!(
            error_for_status(StatusCode::NOT_FOUND, "", None).code(),
            ProviderErrorCode::NotFound
        );
        assert_eq!(
            error_for_status(StatusCode::BAD_GATEWAY, "", None).code(),
            ProviderErrorCode::ServerError
        );

        let limited = error_for_status(StatusCode::TOO_MANY_REQUESTS, "", Some(30));
        assert_eq!(limited.code(), ProviderErrorCode::RateLimited);
        assert!(limited.message().contains("30 seconds"));
    }

    #[tokio::test]
    async fn list_events_page_sends_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(header("authorization", "Bearer test-token"))
            .and(query_param("timeMin", "2025-02-05T00:00:00+00:00"))
            .and(query_param("showDeleted", "true"))
            .and(query_param("singleEvents", "true"))
            .and(query_param("orderBy", "startTime"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{ "id": "abc", "summary": "One" }],
                "nextPageToken": "next"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client(&server)
            .list_events_page("primary", &query())
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "abc");
        assert_eq!(page.next_page_token.as_deref(), Some("next"));
    }

    #[tokio::test]
    async fn get_calendar_reads_timezone() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "calendar#calendar",
                "id": "me@example.com",
                "summary": "Me",
                "timeZone": "Europe/Paris"
            })))
            .mount(&server)
            .await;

        let info = client(&server).get_calendar("primary").await.unwrap();
        assert_eq!(info.id, "me@example.com");
        assert_eq!(info.timezone.as_deref(), Some("Europe/Paris"));
    }

    #[tokio::test]
    async fn insert_conflict_is_already_exists() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(body_partial_json(serde_json::json!({ "id": "abc123" })))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "error": { "code": 409, "message": "The requested identifier already exists." }
            })))
            .mount(&server)
            .await;

        let event = TargetEvent::new("abc123").with_summary("x");
        let err = client(&server)
            .insert_event("primary", &event)
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(err.provider(), Some("google"));
    }

    #[tokio::test]
    async fn update_puts_full_record() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/calendars/primary/events/abc123"))
            .and(body_partial_json(serde_json::json!({
                "id": "abc123",
                "summary": "Renamed",
                "etag": "\"1\"",
                "start": { "date": "2025-02-06" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "abc123",
                "summary": "Renamed"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut event = TargetEvent::new("abc123")
            .with_summary("Renamed")
            .with_span(EventDateTime::date("2025-02-06"), None);
        event
            .extra
            .insert("etag".to_string(), serde_json::json!("\"1\""));

        let updated = client(&server)
            .update_event("primary", "abc123", &event)
            .await
            .unwrap();
        assert_eq!(updated.summary.as_deref(), Some("Renamed"));
    }

    #[tokio::test]
    async fn delete_gone_is_missing() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/ok"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/old"))
            .respond_with(ResponseTemplate::new(410).set_body_json(serde_json::json!({
                "error": { "code": 410, "message": "Resource has been deleted" }
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        client.delete_event("primary", "ok").await.unwrap();

        let err = client.delete_event("primary", "old").await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::Gone);
        assert!(err.is_missing());
    }

    #[tokio::test]
    async fn unauthorized_is_authentication_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server)
            .list_events_page("primary", &query())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
    }
}
