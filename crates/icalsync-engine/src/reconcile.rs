//! The reconciliation pass.
//!
//! Given the targets listed from the remote calendar and the collected feed
//! (keyed by identity), the [`Reconciler`] walks the targets once, deleting,
//! updating or restoring managed events, then inserts whatever is left in the
//! feed map. Every feed event is consumed exactly once: either by matching a
//! target or by the insert phase.
//!
//! Targets outside the managed namespace are never touched.

use std::collections::HashMap;
use std::sync::Arc;

use icalsync_core::{CONFIRMED_STATUS, FeedEvent, Normalizer, TargetEvent, is_managed};
use icalsync_providers::CalendarService;
use serde::Serialize;
use tracing::debug;

use crate::error::SyncResult;
use crate::journal::{SyncDecision, SyncJournal, TracingJournal};
use crate::throttle::{NoDelay, Throttle};

/// Counters of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Managed targets deleted (including ones already missing remotely).
    pub deleted: usize,
    /// Targets rewritten because their feed event changed.
    pub updated: usize,
    /// Soft-deleted targets brought back because the feed still has them.
    pub restored: usize,
    /// Feed events created on the calendar.
    pub inserted: usize,
    /// Targets already mirroring their feed event.
    pub unchanged: usize,
    /// Managed targets already soft-deleted and absent from the feed.
    pub already_deleted: usize,
    /// Targets outside the managed namespace.
    pub foreign: usize,
}

impl ReconcileReport {
    /// Number of remote mutations issued (or planned, in a dry run).
    pub fn mutations(&self) -> usize {
        self.deleted + self.updated + self.restored + self.inserted
    }
}

impl std::fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} inserted, {} updated, {} restored, {} deleted, {} unchanged, {} already deleted, {} foreign",
            self.inserted,
            self.updated,
            self.restored,
            self.deleted,
            self.unchanged,
            self.already_deleted,
            self.foreign
        )
    }
}

/// Diffs targets against the feed and applies the result.
pub struct Reconciler<'a> {
    service: &'a dyn CalendarService,
    calendar_id: &'a str,
    normalizer: &'a Normalizer,
    journal: Arc<dyn SyncJournal>,
    throttle: Arc<dyn Throttle>,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler writing to `calendar_id` through `service`.
    ///
    /// The normalizer carries the target timezone and the namespace prefix.
    pub fn new(
        service: &'a dyn CalendarService,
        calendar_id: &'a str,
        normalizer: &'a Normalizer,
    ) -> Self {
        Self {
            service,
            calendar_id,
            normalizer,
            journal: Arc::new(TracingJournal::new()),
            throttle: Arc::new(NoDelay),
            dry_run: false,
        }
    }

    /// Builder: set the decision journal.
    pub fn with_journal(mut self, journal: Arc<dyn SyncJournal>) -> Self {
        self.journal = journal;
        self
    }

    /// Builder: set the pause applied after each mutation.
    pub fn with_throttle(mut self, throttle: Arc<dyn Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    /// Builder: record decisions without calling the service.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Runs one pass.
    ///
    /// Matched feed events are removed from `feed`, which is empty on
    /// success. The first remote error other than a delete of a missing
    /// event or an insert of a taken id aborts the pass.
    pub async fn reconcile(
        &self,
        targets: Vec<TargetEvent>,
        feed: &mut HashMap<String, FeedEvent>,
    ) -> SyncResult<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let prefix = self.normalizer.prefix();

        for mut target in targets {
            if !is_managed(prefix, &target.id) {
                self.journal.record(&SyncDecision::Foreign {
                    id: target.id.clone(),
                });
                report.foreign += 1;
                continue;
            }

            let Some(event) = feed.remove(&target.id) else {
                if target.is_cancelled() {
                    self.journal.record(&SyncDecision::AlreadyDeleted {
                        id: target.id.clone(),
                        title: target.display_name().to_string(),
                    });
                    report.already_deleted += 1;
                } else {
                    self.delete(&target).await?;
                    report.deleted += 1;
                }
                continue;
            };

            let mut wanted = self.normalizer.normalize(&event);
            let restoring = target.is_cancelled();

            if !restoring && target.mirrors(&wanted) {
                self.journal.record(&SyncDecision::Unchanged {
                    id: target.id.clone(),
                });
                report.unchanged += 1;
                continue;
            }

            if restoring {
                self.journal.record(&SyncDecision::Restore {
                    id: target.id.clone(),
                });
                wanted.status = Some(CONFIRMED_STATUS.to_string());
                report.restored += 1;
            } else {
                self.journal.record(&SyncDecision::Update {
                    id: target.id.clone(),
                });
                report.updated += 1;
            }

            target.merge_from(&wanted);
            self.update(&target).await?;
        }

        // Insert in start order so runs are reproducible.
        let mut remaining: Vec<(String, FeedEvent)> = feed.drain().collect();
        remaining.sort_by(|a, b| a.1.start.cmp(&b.1.start).then_with(|| a.0.cmp(&b.0)));

        for (_, event) in remaining {
            let wanted = self.normalizer.normalize(&event);
            self.insert(wanted).await?;
            report.inserted += 1;
        }

        Ok(report)
    }

    /// Deletes every non-cancelled target.
    ///
    /// Foreign targets are only deleted when `include_foreign` is set.
    pub async fn purge(
        &self,
        targets: Vec<TargetEvent>,
        include_foreign: bool,
    ) -> SyncResult<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for target in targets {
            if !include_foreign && !is_managed(self.normalizer.prefix(), &target.id) {
                self.journal.record(&SyncDecision::Foreign {
                    id: target.id.clone(),
                });
                report.foreign += 1;
            } else if target.is_cancelled() {
                report.already_deleted += 1;
            } else {
                self.delete(&target).await?;
                report.deleted += 1;
            }
        }

        Ok(report)
    }

    async fn delete(&self, target: &TargetEvent) -> SyncResult<()> {
        self.journal.record(&SyncDecision::Delete {
            id: target.id.clone(),
            title: target.display_name().to_string(),
        });
        if self.dry_run {
            return Ok(());
        }

        let result = self.service.delete_event(self.calendar_id, &target.id).await;
        self.throttle.pause().await;

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_missing() => {
                debug!(id = %target.id, error = %e, "Event already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, target: &TargetEvent) -> SyncResult<()> {
        if self.dry_run {
            return Ok(());
        }

        let result = self
            .service
            .update_event(self.calendar_id, &target.id, target)
            .await;
        self.throttle.pause().await;
        result?;
        Ok(())
    }

    async fn insert(&self, mut wanted: TargetEvent) -> SyncResult<()> {
        self.journal.record(&SyncDecision::Insert {
            id: wanted.id.clone(),
        });
        if self.dry_run {
            return Ok(());
        }

        let result = self.service.insert_event(self.calendar_id, &wanted).await;
        self.throttle.pause().await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.is_already_exists() => {
                // The id is taken by an event outside the listed window or in
                // the bin; take it over and bring it back.
                self.journal.record(&SyncDecision::InsertConflict {
                    id: wanted.id.clone(),
                });
                wanted.status = Some(CONFIRMED_STATUS.to_string());
                self.update(&wanted).await
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::journal::RecordingJournal;
    use crate::testing::{Call, FakeCalendar};
    use chrono::{Duration, TimeZone};
    use chrono_tz::Tz;
    use icalsync_core::{CANCELLED_STATUS, DEFAULT_IMPORT_MARKER, FeedHooks};
    use icalsync_providers::ProviderErrorCode;

    const TZ: Tz = chrono_tz::America::Los_Angeles;

    fn feed_event(uid: &str, name: &str, day: u32) -> FeedEvent {
        let start = Tz::UTC.with_ymd_and_hms(2020, 3, day, 4, 15, 30).unwrap();
        FeedEvent::new(uid, start)
            .with_end(start + Duration::hours(6))
            .with_name(name)
    }

    fn feed_of(events: Vec<FeedEvent>) -> HashMap<String, FeedEvent> {
        events.into_iter().map(|e| (e.identity("bob"), e)).collect()
    }

    fn normalizer() -> Normalizer {
        Normalizer::new(TZ, "bob")
    }

    struct Harness {
        service: FakeCalendar,
        journal: Arc<RecordingJournal>,
        normalizer: Normalizer,
    }

    impl Harness {
        fn new(targets: Vec<TargetEvent>) -> Self {
            Self {
                service: FakeCalendar::new(TZ.name()).with_events(targets),
                journal: Arc::new(RecordingJournal::new()),
                normalizer: normalizer(),
            }
        }

        fn reconciler(&self) -> Reconciler<'_> {
            Reconciler::new(&self.service, "primary", &self.normalizer)
                .with_journal(self.journal.clone())
        }

        async fn run(
            &self,
            feed: &mut HashMap<String, FeedEvent>,
        ) -> SyncResult<ReconcileReport> {
            let targets = self.service.events();
            self.reconciler().reconcile(targets, feed).await
        }
    }

    #[tokio::test]
    async fn four_target_scenario() {
        let event_a = feed_event("43", "Test 2", 4);
        let event_b = feed_event("44", "Test 3", 4).with_location("Room 2");
        assert_eq!(event_a.identity("bob"), "bob4315832953301583316930");

        let normalizer = normalizer();
        let foreign = TargetEvent::new("alice4415832953301583316930").with_summary("Not ours");
        let stale = TargetEvent::new("bob4115832953301583316930").with_summary("Test 1");
        let mut changed = normalizer.normalize(&event_a);
        changed.location = Some("Somewhere else".to_string());
        let same = normalizer.normalize(&event_b);

        let harness = Harness::new(vec![foreign, stale, changed, same]);
        let mut feed = feed_of(vec![event_a, event_b]);

        let report = harness.run(&mut feed).await.unwrap();

        assert_eq!(
            harness.service.calls(),
            vec![
                Call::Delete("bob4115832953301583316930".to_string()),
                Call::Update("bob4315832953301583316930".to_string()),
            ]
        );
        assert_eq!(
            harness.journal.messages(),
            vec![
                "Deleting event \"Test 1\"...".to_string(),
                "Updating event \"bob4315832953301583316930\" due to change...".to_string(),
            ]
        );
        assert_eq!(report.deleted, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.foreign, 1);
        assert_eq!(report.inserted, 0);
        assert!(feed.is_empty());

        // The foreign event was left alone.
        let foreign = harness.service.event("alice4415832953301583316930").unwrap();
        assert_eq!(foreign.status, None);
        // The update carries the feed's location.
        let updated = harness.service.event("bob4315832953301583316930").unwrap();
        assert_eq!(updated.location, None);
    }

    #[tokio::test]
    async fn partition_of_keys() {
        let kept = feed_event("1", "Kept", 5);
        let fresh = feed_event("2", "Fresh", 6);
        let normalizer = normalizer();
        let gone = TargetEvent::new("bob99").with_summary("Gone");

        let harness = Harness::new(vec![normalizer.normalize(&kept), gone]);
        let mut feed = feed_of(vec![kept, fresh.clone()]);

        let report = harness.run(&mut feed).await.unwrap();
        assert_eq!(report.deleted, 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.updated, 0);
        assert!(feed.is_empty());

        let inserted = harness.service.event(&fresh.identity("bob")).unwrap();
        assert_eq!(inserted.summary.as_deref(), Some("Fresh"));
        assert_eq!(
            inserted.description.as_deref(),
            Some(DEFAULT_IMPORT_MARKER)
        );
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let events = vec![feed_event("1", "One", 5), feed_event("2", "Two", 6)];
        let harness = Harness::new(Vec::new());

        let first = harness.run(&mut feed_of(events.clone())).await.unwrap();
        assert_eq!(first.inserted, 2);

        let second = harness.run(&mut feed_of(events)).await.unwrap();
        assert_eq!(second.unchanged, 2);
        assert_eq!(second.mutations(), 0);
        assert_eq!(harness.service.calls().len(), 2);
    }

    #[tokio::test]
    async fn annotation_hook_runs_before_comparison() {
        struct Tag;
        impl FeedHooks for Tag {
            fn annotate(&self, mut event: FeedEvent) -> FeedEvent {
                event.description = Some("tagged".to_string());
                event
            }
        }

        let event = feed_event("1", "One", 5);
        let normalizer = normalizer().with_hooks(Arc::new(Tag));
        let stored = normalizer.normalize(&event);
        assert_eq!(
            stored.description.as_deref(),
            Some("tagged (Imported from icalsync)")
        );

        let service = FakeCalendar::new(TZ.name()).with_events(vec![stored.clone()]);
        let report = Reconciler::new(&service, "primary", &normalizer)
            .reconcile(vec![stored], &mut feed_of(vec![event]))
            .await
            .unwrap();

        assert_eq!(report.unchanged, 1);
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_of_missing_event_is_success() {
        let ghost = TargetEvent::new("bob404").with_summary("Ghost");
        let service = FakeCalendar::new(TZ.name());
        service.fail_on("bob404", ProviderErrorCode::NotFound);
        let normalizer = normalizer();

        let report = Reconciler::new(&service, "primary", &normalizer)
            .reconcile(vec![ghost], &mut HashMap::new())
            .await
            .unwrap();
        assert_eq!(report.deleted, 1);

        service.fail_on("bob404", ProviderErrorCode::Gone);
        let ghost = TargetEvent::new("bob404");
        assert!(
            Reconciler::new(&service, "primary", &normalizer)
                .reconcile(vec![ghost], &mut HashMap::new())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn cancelled_targets() {
        let back = feed_event("1", "Back", 5);
        let normalizer = normalizer();
        let cancelled_in_feed = normalizer
            .normalize(&back)
            .with_status(CANCELLED_STATUS);
        let cancelled_gone = TargetEvent::new("bob77")
            .with_summary("Old")
            .with_status(CANCELLED_STATUS);

        let harness = Harness::new(vec![cancelled_in_feed, cancelled_gone]);
        let mut feed = feed_of(vec![back.clone()]);
        let report = harness.run(&mut feed).await.unwrap();

        assert_eq!(report.already_deleted, 1);
        assert_eq!(report.restored, 1);
        assert_eq!(report.deleted, 0);
        assert_eq!(
            harness.service.calls(),
            vec![Call::Update(back.identity("bob"))]
        );
        let restored = harness.service.event(&back.identity("bob")).unwrap();
        assert_eq!(restored.status.as_deref(), Some(CONFIRMED_STATUS));
    }

    #[tokio::test]
    async fn insert_conflict_falls_back_to_update() {
        let event = feed_event("1", "One", 5);
        let id = event.identity("bob");
        // Present remotely but not listed, e.g. in the bin.
        let hidden = TargetEvent::new(id.clone()).with_status(CANCELLED_STATUS);

        let harness = Harness::new(vec![hidden]);
        let report = harness
            .reconciler()
            .reconcile(Vec::new(), &mut feed_of(vec![event]))
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(
            harness.service.calls(),
            vec![Call::Insert(id.clone()), Call::Update(id.clone())]
        );
        assert_eq!(
            harness.journal.messages(),
            vec![
                format!("Inserting event \"{}\"...", id),
                format!("Event \"{}\" already exists, updating instead...", id),
            ]
        );
        let stored = harness.service.event(&id).unwrap();
        assert_eq!(stored.status.as_deref(), Some(CONFIRMED_STATUS));
        assert_eq!(stored.summary.as_deref(), Some("One"));
    }

    #[tokio::test]
    async fn other_errors_abort() {
        let event = feed_event("1", "One", 5);
        let harness = Harness::new(Vec::new());
        harness
            .service
            .fail_on(&event.identity("bob"), ProviderErrorCode::ServerError);

        let err = harness
            .run(&mut feed_of(vec![event]))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Provider(_)));
    }

    #[tokio::test]
    async fn empty_prefix_manages_everything() {
        let normalizer = Normalizer::new(TZ, "");
        let service = FakeCalendar::new(TZ.name());
        let report = Reconciler::new(&service, "primary", &normalizer)
            .reconcile(
                vec![TargetEvent::new("anything123")],
                &mut HashMap::new(),
            )
            .await
            .unwrap();
        assert_eq!(report.foreign, 0);
        assert_eq!(report.deleted, 1);
    }

    #[tokio::test]
    async fn dry_run_records_without_calls() {
        let harness = Harness::new(vec![TargetEvent::new("bob1").with_summary("Stale")]);
        let report = harness
            .reconciler()
            .with_dry_run(true)
            .reconcile(
                harness.service.events(),
                &mut feed_of(vec![feed_event("2", "New", 5)]),
            )
            .await
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(report.inserted, 1);
        assert!(harness.service.calls().is_empty());
        assert_eq!(harness.journal.messages().len(), 2);
    }

    #[tokio::test]
    async fn purge_respects_namespace() {
        let targets = vec![
            TargetEvent::new("bob1"),
            TargetEvent::new("bob2").with_status(CANCELLED_STATUS),
            TargetEvent::new("alice1"),
        ];
        let harness = Harness::new(targets.clone());

        let report = harness.reconciler().purge(targets.clone(), false).await.unwrap();
        assert_eq!(report.deleted, 1);
        assert_eq!(report.already_deleted, 1);
        assert_eq!(report.foreign, 1);

        let report = harness.reconciler().purge(targets, true).await.unwrap();
        assert_eq!(report.foreign, 0);
        // bob1 is gone remotely by now, which still counts as deleted.
        assert_eq!(report.deleted, 2);
        assert_eq!(harness.service.calls().len(), 3);
    }
}
