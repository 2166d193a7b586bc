//! iCal feed source.
//!
//! The feed is the authoritative side of a sync: an ICS document fetched
//! over HTTP and parsed into [`FeedEvent`](icalsync_core::FeedEvent)s.
//! Failure to fetch or parse it aborts the run, so both surface as
//! [`FeedError`].

mod fetch;
mod ics;

pub use fetch::FeedClient;
pub use ics::parse_feed;

use thiserror::Error;

/// Errors from retrieving or parsing the feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed URL is malformed or uses an unsupported scheme.
    #[error("invalid feed URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The HTTP request itself failed.
    #[error("failed to fetch feed {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("feed {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body is not a valid iCalendar document.
    #[error("failed to parse feed: {0}")]
    Parse(String),
}

/// A specialized Result type for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;
