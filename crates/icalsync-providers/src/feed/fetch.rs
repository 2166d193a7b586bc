//! HTTP retrieval of the feed document.

use std::time::Duration;

use icalsync_core::FeedEvent;
use tracing::{debug, info};
use url::Url;

use super::{FeedError, FeedResult, parse_feed};

/// Fetches and parses iCal feeds.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http_client: reqwest::Client,
}

impl FeedClient {
    /// Default request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Creates a feed client with the given request timeout.
    pub fn new(timeout: Duration) -> FeedResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("icalsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| FeedError::Fetch {
                url: String::new(),
                source,
            })?;

        Ok(Self { http_client })
    }

    /// Downloads the raw feed body.
    ///
    /// `webcal://` URLs are fetched over HTTPS.
    pub async fn fetch(&self, url: &str) -> FeedResult<String> {
        let url = normalize_url(url)?;
        debug!(%url, "fetching feed");

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FeedError::Fetch {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FeedError::Fetch {
            url: url.to_string(),
            source,
        })
    }

    /// Downloads and parses the feed.
    pub async fn fetch_events(&self, url: &str) -> FeedResult<Vec<FeedEvent>> {
        let body = self.fetch(url).await?;
        let events = parse_feed(&body)?;
        info!(count = events.len(), "Retrieved events from iCal feed");
        Ok(events)
    }
}

fn normalize_url(raw: &str) -> FeedResult<Url> {
    let invalid = |reason: String| FeedError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let rewritten = match raw.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("webcal") => {
            format!("https://{}", rest)
        }
        _ => raw.to_string(),
    };

    let url = Url::parse(&rewritten).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
        VERSION:2.0\r\n\
        BEGIN:VEVENT\r\n\
        UID:one\r\n\
        DTSTART:20250205T100000Z\r\n\
        DTEND:20250205T110000Z\r\n\
        SUMMARY:One\r\n\
        END:VEVENT\r\n\
        END:VCALENDAR\r\n";

    fn client() -> FeedClient {
        FeedClient::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn url_normalization() {
        assert_eq!(
            normalize_url("webcal://example.com/cal.ics").unwrap().as_str(),
            "https://example.com/cal.ics"
        );
        assert_eq!(
            normalize_url("http://example.com/cal.ics").unwrap().scheme(),
            "http"
        );
        assert!(matches!(
            normalize_url("ftp://example.com/cal.ics"),
            Err(FeedError::InvalidUrl { .. })
        ));
        assert!(matches!(
            normalize_url("not a url"),
            Err(FeedError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn fetch_events_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cal.ics"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/calendar; charset=utf-8")
                    .set_body_string(FEED),
            )
            .expect(1)
            .mount(&server)
            .await;

        let events = client()
            .fetch_events(&format!("{}/cal.ics", server.uri()))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name.as_deref(), Some("One"));
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client()
            .fetch(&format!("{}/cal.ics", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn html_body_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let err = client()
            .fetch_events(&format!("{}/cal.ics", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));
    }

    #[tokio::test]
    async fn connection_failure_is_fetch_error() {
        // Nothing listens on port 9 of the loopback interface.
        let err = client()
            .fetch("http://127.0.0.1:9/cal.ics")
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Fetch { .. }));
    }
}
