//! Errors returned by the target calendar service.
//!
//! The reconciler branches on a handful of codes: a missing event on delete
//! is already done, an existing event on insert becomes an update. Every
//! other code aborts the run.

use std::fmt;
use thiserror::Error;

/// What went wrong, independent of the service that reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// No usable token, or the service rejected it (401).
    AuthenticationFailed,
    /// The account may not touch this calendar (403).
    AuthorizationFailed,
    /// The request never got a response.
    NetworkError,
    /// Quota exhausted (429, or 403 with a rate limit reason).
    RateLimited,
    /// Any other non-success status.
    ServerError,
    /// The response body did not decode.
    InvalidResponse,
    /// 404.
    NotFound,
    /// 410: the event was deleted for good.
    Gone,
    /// 409: the identity is taken, usually by a cancelled event.
    AlreadyExists,
    /// 400.
    BadRequest,
    /// Missing or malformed credentials or settings.
    ConfigurationError,
    /// Local failure: HTTP client setup, token storage, callback plumbing.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns true if the event is not there (any more).
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound | Self::Gone)
    }

    /// Stable snake_case name, used in messages and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::Gone => "gone",
            Self::AlreadyExists => "already_exists",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed calendar service call.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// Service name, e.g. "google".
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    pub fn gone(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Gone, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AlreadyExists, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadRequest, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Tags the error with the service that raised it.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// 404 or 410: a delete of this event has nothing left to do.
    pub fn is_missing(&self) -> bool {
        self.code.is_missing()
    }

    /// 409: an insert of this event should become an update.
    pub fn is_already_exists(&self) -> bool {
        self.code == ProviderErrorCode::AlreadyExists
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
