//! Decision journal of a reconciliation pass.
//!
//! The reconciler never logs directly: it reports each [`SyncDecision`] to an
//! injected [`SyncJournal`]. [`TracingJournal`] forwards to `tracing`;
//! [`RecordingJournal`] keeps decisions in memory.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, info};

/// One reconciliation decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SyncDecision {
    /// A managed event no longer in the feed is deleted.
    Delete { id: String, title: String },
    /// A managed event no longer in the feed was already soft-deleted.
    AlreadyDeleted { id: String, title: String },
    /// A feed event changed and its target record is rewritten.
    Update { id: String },
    /// A soft-deleted target is back in the feed and is restored.
    Restore { id: String },
    /// A feed event has no target record yet.
    Insert { id: String },
    /// An insert hit an existing id and is retried as an update.
    InsertConflict { id: String },
    /// A target record already mirrors its feed event.
    Unchanged { id: String },
    /// A target record outside the managed namespace.
    Foreign { id: String },
}

impl SyncDecision {
    /// The event id the decision is about.
    pub fn id(&self) -> &str {
        match self {
            Self::Delete { id, .. }
            | Self::AlreadyDeleted { id, .. }
            | Self::Update { id }
            | Self::Restore { id }
            | Self::Insert { id }
            | Self::InsertConflict { id }
            | Self::Unchanged { id }
            | Self::Foreign { id } => id,
        }
    }

    /// Returns true if the decision leads to a remote call.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Delete { .. }
                | Self::Update { .. }
                | Self::Restore { .. }
                | Self::Insert { .. }
                | Self::InsertConflict { .. }
        )
    }
}

impl fmt::Display for SyncDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete { title, .. } => write!(f, "Deleting event \"{}\"...", title),
            Self::AlreadyDeleted { title, .. } => {
                write!(f, "Event \"{}\" already deleted, skipping", title)
            }
            Self::Update { id } => write!(f, "Updating event \"{}\" due to change...", id),
            Self::Restore { id } => write!(f, "Restoring cancelled event \"{}\"...", id),
            Self::Insert { id } => write!(f, "Inserting event \"{}\"...", id),
            Self::InsertConflict { id } => {
                write!(f, "Event \"{}\" already exists, updating instead...", id)
            }
            Self::Unchanged { id } => write!(f, "Event \"{}\" unchanged", id),
            Self::Foreign { id } => write!(f, "Leaving foreign event \"{}\" untouched", id),
        }
    }
}

/// Sink for reconciliation decisions.
pub trait SyncJournal: Send + Sync {
    /// Records one decision.
    fn record(&self, decision: &SyncDecision);
}

/// Forwards decisions to `tracing`.
///
/// Mutations are logged at INFO, everything else at DEBUG.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingJournal {
    dry_run: bool,
}

impl TracingJournal {
    /// Creates a journal that logs to `tracing`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: tag every record as a dry run.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl SyncJournal for TracingJournal {
    fn record(&self, decision: &SyncDecision) {
        if decision.is_mutation() {
            info!(id = decision.id(), dry_run = self.dry_run, "{}", decision);
        } else {
            debug!(id = decision.id(), "{}", decision);
        }
    }
}

/// Keeps every decision in memory.
#[derive(Debug, Default)]
pub struct RecordingJournal {
    entries: Mutex<Vec<SyncDecision>>,
}

impl RecordingJournal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded decisions, in order.
    pub fn entries(&self) -> Vec<SyncDecision> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the rendered log line of each recorded mutation.
    pub fn messages(&self) -> Vec<String> {
        self.entries()
            .iter()
            .filter(|d| d.is_mutation())
            .map(ToString::to_string)
            .collect()
    }
}

impl SyncJournal for RecordingJournal {
    fn record(&self, decision: &SyncDecision) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(decision.clone());
    }
}
