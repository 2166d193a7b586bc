//! Target event identities.
//!
//! Google Calendar event ids are restricted to the base32hex alphabet
//! (lowercase `a`-`v` and digits, RFC 2938 §3.1.2) and must be 5–1024
//! characters long. A feed event's identity is its namespace prefix and
//! lowercased UID filtered down to that alphabet, followed by the start and
//! end Unix timestamps. Instances of a recurring event share a UID but not a
//! span, so they get distinct identities without explicit instance numbers.
//!
//! Consumers already key existing remote events on this exact shape, so the
//! alphabet is `a`-`v`, not the full `a`-`z`.

use chrono::{DateTime, TimeZone};

/// Shortest identity the remote service accepts.
pub const MIN_IDENTITY_LEN: usize = 5;

/// Longest identity the remote service accepts.
pub const MAX_IDENTITY_LEN: usize = 1024;

fn is_allowed(c: char) -> bool {
    matches!(c, 'a'..='v' | '0'..='9')
}

/// Strips every character outside `[a-v0-9]`.
pub fn sanitize(raw: &str) -> String {
    raw.chars().filter(|&c| is_allowed(c)).collect()
}

/// Derives the target identity of a feed event.
///
/// The prefix is filtered as-is while the natural id is lowercased first, so
/// uppercase letters in the prefix are dropped. An empty natural id yields
/// `prefix + timestamps`, which is not guaranteed unique.
pub fn derive_identity<A: TimeZone, B: TimeZone>(
    prefix: &str,
    natural_id: &str,
    start: &DateTime<A>,
    end: &DateTime<B>,
) -> String {
    let mut id = sanitize(&format!("{}{}", prefix, natural_id.to_lowercase()));
    id.push_str(&start.timestamp().to_string());
    id.push_str(&end.timestamp().to_string());
    id
}

/// Returns true if a remote event id lives in `prefix`'s namespace.
///
/// Every id is managed when the sanitized prefix is empty.
pub fn is_managed(prefix: &str, event_id: &str) -> bool {
    event_id.starts_with(&sanitize(prefix))
}
