//! Client error types.

use std::fmt;

use icalsync_engine::SyncError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Calendar service error.
    Provider(String),
    /// Feed could not be fetched or parsed.
    Feed(String),
    /// The sync run failed.
    Sync(SyncError),
    /// IO error.
    Io(std::io::Error),
    /// Authentication required.
    AuthRequired(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Provider(msg) => write!(f, "provider error: {}", msg),
            Self::Feed(msg) => write!(f, "feed error: {}", msg),
            Self::Sync(err) => write!(f, "sync failed: {}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::AuthRequired(msg) => write!(f, "authentication required: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Sync(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<SyncError> for ClientError {
    fn from(err: SyncError) -> Self {
        Self::Sync(err)
    }
}

impl From<icalsync_providers::ProviderError> for ClientError {
    fn from(err: icalsync_providers::ProviderError) -> Self {
        Self::Provider(err.to_string())
    }
}

impl From<icalsync_providers::FeedError> for ClientError {
    fn from(err: icalsync_providers::FeedError) -> Self {
        Self::Feed(err.to_string())
    }
}
