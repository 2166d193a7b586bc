//! A complete sync run.
//!
//! The runner strings the pieces together in this order:
//!
//! 1. fetch and parse the feed (any failure aborts before the calendar is touched)
//! 2. look up the calendar timezone, which decides what "today" is
//! 3. list the calendar from the start of today up to the feed horizon
//! 4. filter and index the feed
//! 5. reconcile

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local};
use chrono_tz::Tz;
use icalsync_core::{
    FeedEvent, FeedFilter, FeedHooks, NoHooks, Normalizer, SyncWindow, collect_feed, start_of_day,
};
use icalsync_providers::{CalendarService, FeedClient};
use tracing::{info, warn};

use crate::collector::collect_targets;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::journal::{SyncJournal, TracingJournal};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::throttle::{FixedDelay, Throttle};

/// Runs syncs and purges against one calendar.
pub struct SyncRunner {
    config: SyncConfig,
    service: Arc<dyn CalendarService>,
    hooks: Arc<dyn FeedHooks>,
    journal: Arc<dyn SyncJournal>,
    throttle: Arc<dyn Throttle>,
}

impl std::fmt::Debug for SyncRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRunner")
            .field("config", &self.config)
            .field("service", &self.service.name())
            .finish_non_exhaustive()
    }
}

impl SyncRunner {
    /// Creates a runner with tracing output and the configured API delay.
    pub fn new(config: SyncConfig, service: Arc<dyn CalendarService>) -> Self {
        let journal = TracingJournal::new().with_dry_run(config.dry_run);
        let throttle = FixedDelay::new(config.api_delay);
        Self {
            config,
            service,
            hooks: Arc::new(NoHooks),
            journal: Arc::new(journal),
            throttle: Arc::new(throttle),
        }
    }

    /// Builder: set the feed filter/annotation hooks.
    pub fn with_hooks(mut self, hooks: Arc<dyn FeedHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Builder: set the decision journal.
    pub fn with_journal(mut self, journal: Arc<dyn SyncJournal>) -> Self {
        self.journal = journal;
        self
    }

    /// Builder: set the mutation throttle.
    pub fn with_throttle(mut self, throttle: Arc<dyn Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    /// The run configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Fetches the configured feed and syncs it, as of now.
    pub async fn run(&self, feed: &FeedClient) -> SyncResult<ReconcileReport> {
        self.config.validate()?;

        info!(url = %self.config.feed_url, "Retrieving events from iCal feed");
        let events = feed.fetch_events(&self.config.feed_url).await?;
        self.run_with_events(events, Local::now().fixed_offset())
            .await
    }

    /// Syncs already parsed feed events, with `now` as the current time.
    ///
    /// Only the instant of `now` matters: the day boundaries are taken in
    /// the calendar's timezone.
    pub async fn run_with_events(
        &self,
        events: Vec<FeedEvent>,
        now: DateTime<FixedOffset>,
    ) -> SyncResult<ReconcileReport> {
        self.config.validate()?;

        let timezone = self.calendar_timezone().await?;
        let now = now.with_timezone(&timezone);
        let window = SyncWindow::for_horizon(start_of_day(&now), &now, self.config.horizon_days);

        info!("Retrieving events from calendar");
        let targets = collect_targets(self.service.as_ref(), &self.config.calendar_id, &window)
            .await?;

        let mut filter = FeedFilter::at(&now, self.config.horizon_days);
        if self.config.normalize.replace_utc {
            filter = filter.with_floating_zone(timezone);
        }
        let mut feed = collect_feed(events, &filter, &self.config.prefix, self.hooks.as_ref());
        info!(count = feed.len(), "Collected iCal events");

        let normalizer = self.normalizer(timezone);
        let report = self
            .reconciler(&normalizer)
            .reconcile(targets, &mut feed)
            .await?;

        info!(dry_run = self.config.dry_run, "Sync finished: {}", report);
        Ok(report)
    }

    /// Deletes every event from the start of today onwards, as of now.
    pub async fn purge(&self, include_foreign: bool) -> SyncResult<ReconcileReport> {
        self.purge_at(Local::now().fixed_offset(), include_foreign)
            .await
    }

    /// Deletes every event from the start of `now`'s day onwards.
    ///
    /// Only managed events are deleted unless `include_foreign` is set.
    pub async fn purge_at(
        &self,
        now: DateTime<FixedOffset>,
        include_foreign: bool,
    ) -> SyncResult<ReconcileReport> {
        if self.config.calendar_id.trim().is_empty() {
            return Err(SyncError::config("calendar id is empty"));
        }

        let window = SyncWindow::starting(start_of_day(&now));
        let targets = collect_targets(self.service.as_ref(), &self.config.calendar_id, &window)
            .await?;

        // Purging never needs the calendar zone: nothing gets normalized.
        let normalizer = self.normalizer(Tz::UTC);
        let report = self
            .reconciler(&normalizer)
            .purge(targets, include_foreign)
            .await?;

        info!(dry_run = self.config.dry_run, "Purge finished: {}", report);
        Ok(report)
    }

    async fn calendar_timezone(&self) -> SyncResult<Tz> {
        let calendar = self
            .service
            .get_calendar(&self.config.calendar_id)
            .await?;

        match calendar.timezone {
            Some(name) => name.parse::<Tz>().map_err(|_| SyncError::timezone(name)),
            None => {
                warn!(calendar = %calendar.id, "Calendar has no timezone, using UTC");
                Ok(Tz::UTC)
            }
        }
    }

    fn normalizer(&self, timezone: Tz) -> Normalizer {
        Normalizer::new(timezone, self.config.prefix.clone())
            .with_options(self.config.normalize.clone())
            .with_hooks(self.hooks.clone())
    }

    fn reconciler<'a>(&'a self, normalizer: &'a Normalizer) -> Reconciler<'a> {
        Reconciler::new(
            self.service.as_ref(),
            &self.config.calendar_id,
            normalizer,
        )
        .with_journal(self.journal.clone())
        .with_throttle(self.throttle.clone())
        .with_dry_run(self.config.dry_run)
    }
}
