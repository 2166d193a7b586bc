//! Core types: feed events, target events, identities, normalization,
//! feed filtering and tracing setup.
//!
//! Everything in this crate is pure and synchronous. Network access (feed
//! retrieval, calendar service calls) lives in `icalsync-providers`, and the
//! reconciliation pass that drives both lives in `icalsync-engine`.

pub mod collect;
pub mod event;
pub mod identity;
pub mod normalize;
pub mod target;
pub mod time;
pub mod tracing;

pub use collect::{FeedFilter, FeedHooks, NoHooks, collect_feed};
pub use event::FeedEvent;
pub use identity::{MAX_IDENTITY_LEN, MIN_IDENTITY_LEN, derive_identity, is_managed, sanitize};
pub use normalize::{DEFAULT_IMPORT_MARKER, NormalizeOptions, Normalizer, normalize_event};
pub use target::{CANCELLED_STATUS, CONFIRMED_STATUS, EventDateTime, TargetEvent};
pub use time::{SyncWindow, reinterpret_utc_marker, start_of_day};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
