//! Sync run configuration.

use std::time::Duration;

use icalsync_core::NormalizeOptions;

use crate::error::{SyncError, SyncResult};

/// Settings of one sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Feed URL (`http`, `https` or `webcal`).
    pub feed_url: String,

    /// Target calendar id.
    pub calendar_id: String,

    /// Namespace prefix of managed event ids.
    pub prefix: String,

    /// Days ahead to mirror; `0` means unbounded.
    pub horizon_days: u32,

    /// Pause after every remote mutation.
    pub api_delay: Duration,

    /// Normalization settings.
    pub normalize: NormalizeOptions,

    /// Log decisions without mutating the calendar.
    pub dry_run: bool,
}

impl SyncConfig {
    /// Default pause between mutations.
    pub const DEFAULT_API_DELAY: Duration = Duration::from_millis(100);

    /// Creates a configuration for the given feed and calendar.
    pub fn new(feed_url: impl Into<String>, calendar_id: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.into(),
            calendar_id: calendar_id.into(),
            prefix: String::new(),
            horizon_days: 0,
            api_delay: Self::DEFAULT_API_DELAY,
            normalize: NormalizeOptions::default(),
            dry_run: false,
        }
    }

    /// Builder: set the id prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Builder: set the horizon in days.
    pub fn with_horizon_days(mut self, days: u32) -> Self {
        self.horizon_days = days;
        self
    }

    /// Builder: set the pause between mutations.
    pub fn with_api_delay(mut self, delay: Duration) -> Self {
        self.api_delay = delay;
        self
    }

    /// Builder: set whether bare-UTC values are reinterpreted in the calendar zone.
    pub fn with_replace_utc(mut self, replace_utc: bool) -> Self {
        self.normalize.replace_utc = replace_utc;
        self
    }

    /// Builder: set dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Checks the settings a run cannot do without.
    pub fn validate(&self) -> SyncResult<()> {
        if self.calendar_id.trim().is_empty() {
            return Err(SyncError::config("calendar id is empty"));
        }
        if self.feed_url.trim().is_empty() {
            return Err(SyncError::config("feed URL is empty"));
        }
        Ok(())
    }
}
