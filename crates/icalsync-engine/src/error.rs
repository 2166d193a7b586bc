//! Sync error types.

use icalsync_providers::{FeedError, ProviderError};
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The feed could not be fetched or parsed.
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// A calendar service call failed.
    #[error("Calendar service error: {0}")]
    Provider(#[from] ProviderError),

    /// The calendar reports a timezone that is not a known IANA name.
    #[error("Unknown calendar timezone: {name}")]
    Timezone { name: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl SyncError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a timezone error.
    pub fn timezone(name: impl Into<String>) -> Self {
        Self::Timezone { name: name.into() }
    }

    /// Returns true if the run failed before touching the calendar.
    pub fn is_feed_failure(&self) -> bool {
        matches!(self, Self::Feed(_))
    }
}
