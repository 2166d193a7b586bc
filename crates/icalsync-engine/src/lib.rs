//! Reconciliation engine.
//!
//! This crate drives a sync run:
//!
//! - [`collect_targets`] - Lists the remote calendar over a window, following pages
//! - [`Reconciler`] - Diffs targets against the feed and issues the mutations
//! - [`SyncRunner`] - Fetch, filter, list and reconcile in one call
//! - [`SyncJournal`] - Injected sink for every reconciliation decision
//! - [`Throttle`] - Pause policy after each mutation

pub mod collector;
pub mod config;
pub mod error;
pub mod journal;
pub mod reconcile;
pub mod runner;
#[cfg(test)]
mod testing;
pub mod throttle;

pub use collector::{collect_targets, window_query};
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use journal::{RecordingJournal, SyncDecision, SyncJournal, TracingJournal};
pub use reconcile::{ReconcileReport, Reconciler};
pub use runner::SyncRunner;
pub use throttle::{FixedDelay, NoDelay, Throttle};
