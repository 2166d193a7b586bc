//! Both ends of a sync: the iCal feed source and the target calendar service.
//!
//! - [`feed`] - ICS retrieval and parsing into [`FeedEvent`](icalsync_core::FeedEvent)s
//! - [`CalendarService`] - The trait the reconciler drives the target through
//! - [`google`] - Google Calendar API v3 implementation with OAuth
//! - [`ProviderError`] - Error types for calendar service operations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐              ┌─────────────────┐
//! │   ICS feed      │              │  Google API     │
//! └────────┬────────┘              └────────┬────────┘
//!          │                                │
//!          ▼                                ▼
//! ┌─────────────────┐              ┌─────────────────┐
//! │   FeedClient    │              │ GoogleCalendar  │
//! └────────┬────────┘              └────────┬────────┘
//!          │ Vec<FeedEvent>                 │ CalendarService
//!          └───────────────┬────────────────┘
//!                          ▼
//!                  icalsync-engine
//! ```

pub mod error;
pub mod feed;
#[cfg(feature = "google")]
pub mod google;
pub mod service;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use feed::{FeedClient, FeedError, FeedResult, parse_feed};
pub use service::{BoxFuture, CalendarInfo, CalendarService, EventPage, ListQuery};
