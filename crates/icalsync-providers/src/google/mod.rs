//! Google Calendar API v3 backend.
//!
//! # Features
//!
//! - OAuth 2.0 PKCE authorization flow with loopback redirect
//! - Token persistence with owner-only file permissions
//! - Automatic token refresh
//! - Mapping of API failures (404, 409, 410, rate limits) onto
//!   [`ProviderErrorCode`](crate::ProviderErrorCode)s the reconciler acts on
//!
//! # Example
//!
//! ```ignore
//! use icalsync_providers::google::{GoogleCalendar, GoogleConfig, OAuthCredentials};
//!
//! let credentials = OAuthCredentials::new(
//!     "your-client-id.apps.googleusercontent.com",
//!     "your-client-secret",
//! );
//! let service = GoogleCalendar::new(GoogleConfig::new(credentials))?;
//!
//! if !service.is_authenticated() {
//!     service.authenticate().await?;
//! }
//! ```

mod client;
mod config;
mod oauth;
mod service;
mod tokens;

pub use client::{CALENDAR_API_BASE, GoogleCalendarClient};
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow};
pub use service::GoogleCalendar;
pub use tokens::{TokenInfo, TokenStorage};
