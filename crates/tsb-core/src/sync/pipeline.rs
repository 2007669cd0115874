use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
    ports::{RemoteConnector, SubscriptionStore},
    sync::{
        ack::{AckReport, AckTracker},
        fanout::{FanoutReport, SubscriberFanout},
        poller::{PollReport, UpdatePoller},
        reconciler::{ReconcileOutcome, SnapshotReconciler},
    },
    Result,
};

/// What one sync cycle did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CycleReport {
    /// `None` when the cycle does not own the snapshot check, or the check
    /// failed; the cycle still polls.
    pub reconcile: Option<ReconcileOutcome>,
    pub poll: PollReport,
    pub fanout: FanoutReport,
    pub acks: AckReport,
}

/// reconcile → poll → fan out → acknowledge.
///
/// The reconcile step is skipped when a separate snapshot job owns it.
pub struct SyncPipeline {
    connector: Arc<dyn RemoteConnector>,
    reconcile_in_cycle: bool,
    reconciler: SnapshotReconciler,
    poller: UpdatePoller,
    fanout: SubscriberFanout,
    acks: AckTracker,
    subscriptions: Arc<dyn SubscriptionStore>,
}

impl SyncPipeline {
    pub fn new(
        connector: Arc<dyn RemoteConnector>,
        reconciler: SnapshotReconciler,
        poller: UpdatePoller,
        fanout: SubscriberFanout,
        subscriptions: Arc<dyn SubscriptionStore>,
    ) -> Self {
        Self {
            connector,
            reconcile_in_cycle: true,
            reconciler,
            poller,
            fanout,
            acks: AckTracker::new(),
            subscriptions,
        }
    }

    /// Whether `run_cycle` starts with a snapshot check (on by default).
    pub fn with_cycle_reconcile(mut self, enabled: bool) -> Self {
        self.reconcile_in_cycle = enabled;
        self
    }

    pub fn acks(&self) -> &AckTracker {
        &self.acks
    }

    /// Run one full cycle.
    ///
    /// Errors returned here mean the cycle stopped before acknowledging
    /// anything, so the same diffs come back next time.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let session = self.connector.open().await?;
        let mut report = CycleReport::default();

        if self.reconcile_in_cycle {
            match self.reconciler.check_for_update(&session).await {
                Ok(outcome) => report.reconcile = Some(outcome),
                Err(e) => error!(error = %e, "snapshot reconciliation failed"),
            }
        }

        report.poll = self
            .poller
            .poll(session.schedules.as_ref(), &self.acks)
            .await?;
        if report.poll.updates.is_empty() {
            info!("no schedule updates");
            return Ok(report);
        }

        let subscriptions = self.subscriptions.all().await?;
        info!(subscribers = subscriptions.len(), "loaded subscriptions");

        report.fanout = self
            .fanout
            .deliver(&subscriptions, &report.poll.updates)
            .await;
        if !report.fanout.failed_chats.is_empty() {
            warn!(
                failed = report.fanout.failed_chats.len(),
                "some subscribers did not receive the full report"
            );
        }

        report.acks = self
            .acks
            .acknowledge(session.schedules.as_ref(), &report.poll.updates)
            .await;
        Ok(report)
    }

    /// Snapshot check on its own, for the hourly job.
    pub async fn run_snapshot_check(&self) -> Result<ReconcileOutcome> {
        let session = self.connector.open().await?;
        self.reconciler.check_for_update(&session).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;
    use chrono::FixedOffset;

    use super::*;
    use crate::{
        domain::{ChatId, ScheduleId, SnapshotId},
        errors::Error,
        subscriptions::Subscription,
        sync::testing::{
            lesson, update, FakeCatalog, FakeConnector, FakeMessenger, FakeService,
            FakeSnapshotStore, FakeSnapshots, FakeSubscriptions,
        },
    };

    struct Harness {
        dir: tempfile::TempDir,
        service: Arc<FakeService>,
        snapshots: Arc<FakeSnapshots>,
        messenger: Arc<FakeMessenger>,
        subs: Arc<FakeSubscriptions>,
        connector: Arc<FakeConnector>,
    }

    impl Harness {
        fn new(remote: i64) -> Self {
            let service = Arc::new(FakeService::default());
            let snapshots = Arc::new(FakeSnapshots::new(remote, b"new dataset"));
            let h = Self {
                dir: tempfile::tempdir().unwrap(),
                connector: Arc::new(FakeConnector::new(service.clone(), snapshots.clone())),
                service,
                snapshots,
                messenger: Arc::new(FakeMessenger::default()),
                subs: Arc::new(FakeSubscriptions::default()),
            };
            std::fs::write(h.dataset(), b"old dataset").unwrap();
            h
        }

        fn dataset(&self) -> std::path::PathBuf {
            self.dir.path().join("schedule.db")
        }

        fn pipeline(&self, local: i64) -> SyncPipeline {
            let reconciler = SnapshotReconciler::new(
                self.dataset(),
                10_000,
                Arc::new(FakeSnapshotStore::new(local)),
                Arc::new(FakeCatalog::default()),
            );
            SyncPipeline::new(
                self.connector.clone(),
                reconciler,
                UpdatePoller::new(4),
                SubscriberFanout::new(
                    self.messenger.clone(),
                    4000,
                    4,
                    FixedOffset::east_opt(3 * 3600).unwrap(),
                ),
                self.subs.clone(),
            )
        }

        fn subscribe(&self, chat: i64, ids: &[ScheduleId]) {
            self.subs
                .subs
                .lock()
                .unwrap()
                .push(Subscription::new(ChatId(chat), ids.iter().copied()));
        }
    }

    #[tokio::test]
    async fn modified_lesson_reaches_subscriber_and_is_acked() {
        let h = Harness::new(5);
        let t1 = ScheduleId::teacher(1);
        h.service.subscribe(t1, "Иванов И.И.");
        h.service.put_update(update(
            t1,
            6,
            Some(lesson("Algebra")),
            Some(lesson("Calculus")),
        ));
        h.subscribe(100, &[t1]);
        h.subscribe(200, &[ScheduleId::group(9)]);

        let report = h.pipeline(5).run_cycle().await.unwrap();

        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ChatId(100));
        assert!(sent[0].1.contains("✏️"));
        assert!(sent[0].1.contains("Calculus"));
        assert_eq!(h.service.accepted(), vec![(t1, SnapshotId(6))]);
        assert_eq!(report.acks.acked, vec![(t1, SnapshotId(6))]);
    }

    #[tokio::test]
    async fn unchanged_snapshot_and_no_diffs_is_quiet() {
        let h = Harness::new(5);
        h.service.subscribe(ScheduleId::group(1), "ИКБО-01-23");
        h.subscribe(100, &[ScheduleId::group(1)]);

        let report = h.pipeline(5).run_cycle().await.unwrap();

        assert!(matches!(
            report.reconcile,
            Some(ReconcileOutcome::Stale { .. })
        ));
        assert_eq!(h.snapshots.downloads(), 0);
        assert!(h.service.accepted().is_empty());
        assert!(h.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn same_diff_is_not_redelivered_after_ack() {
        let h = Harness::new(5);
        let t1 = ScheduleId::teacher(1);
        h.service.subscribe(t1, "Иванов И.И.");
        h.service
            .put_update(update(t1, 6, None, Some(lesson("Calculus"))));
        h.subscribe(100, &[t1]);

        let pipeline = h.pipeline(5);
        pipeline.run_cycle().await.unwrap();
        let second = pipeline.run_cycle().await.unwrap();

        assert_eq!(h.messenger.sent().len(), 1);
        assert_eq!(second.poll.stale, vec![t1]);
        assert_eq!(h.service.accepted().len(), 1);
    }

    #[tokio::test]
    async fn diff_without_records_is_acked_but_not_rendered() {
        let h = Harness::new(5);
        let g = ScheduleId::group(3);
        h.service.subscribe(g, "ИКБО-03-23");
        let mut empty = update(g, 8, None, Some(lesson("X")));
        empty.records.clear();
        h.service.put_update(empty);
        h.subscribe(100, &[g]);

        let report = h.pipeline(5).run_cycle().await.unwrap();
        assert_eq!(report.fanout.subscribers_matched, 0);
        assert!(h.messenger.sent().is_empty());
        assert_eq!(h.service.accepted(), vec![(g, SnapshotId(8))]);
    }

    #[tokio::test]
    async fn delivery_and_ack_failures_stay_isolated() {
        let h = Harness::new(5);
        let t1 = ScheduleId::teacher(1);
        let t2 = ScheduleId::teacher(2);
        h.service.subscribe(t1, "T1");
        h.service.subscribe(t2, "T2");
        h.service
            .put_update(update(t1, 6, None, Some(lesson("A"))));
        h.service
            .put_update(update(t2, 7, None, Some(lesson("B"))));
        h.service.failing_ack.lock().unwrap().insert(t1);
        h.messenger.failing_chats.lock().unwrap().insert(ChatId(1));
        h.subscribe(1, &[t1, t2]);
        h.subscribe(2, &[t2]);

        let report = h.pipeline(5).run_cycle().await.unwrap();
        assert_eq!(report.fanout.failed_chats, vec![ChatId(1)]);
        assert_eq!(h.messenger.sent_to(ChatId(2)).len(), 1);
        assert_eq!(report.acks.failed, vec![t1]);
        assert_eq!(h.service.accepted(), vec![(t2, SnapshotId(7))]);
    }

    struct BrokenSubscriptions;

    #[async_trait]
    impl SubscriptionStore for BrokenSubscriptions {
        async fn all(&self) -> Result<Vec<Subscription>> {
            Err(Error::Store("database is locked".to_string()))
        }
    }

    #[tokio::test]
    async fn subscription_failure_skips_ack() {
        let h = Harness::new(5);
        let t1 = ScheduleId::teacher(1);
        h.service.subscribe(t1, "T1");
        h.service
            .put_update(update(t1, 6, None, Some(lesson("A"))));

        let pipeline = SyncPipeline {
            subscriptions: Arc::new(BrokenSubscriptions),
            ..h.pipeline(5)
        };
        assert!(pipeline.run_cycle().await.is_err());
        assert!(h.service.accepted().is_empty());
    }

    #[tokio::test]
    async fn cycle_leaves_snapshot_to_the_snapshot_job() {
        let h = Harness::new(6);
        let t1 = ScheduleId::teacher(1);
        h.service.subscribe(t1, "T1");
        h.service
            .put_update(update(t1, 6, None, Some(lesson("A"))));
        h.subscribe(100, &[t1]);

        let report = h
            .pipeline(5)
            .with_cycle_reconcile(false)
            .run_cycle()
            .await
            .unwrap();

        assert_eq!(report.reconcile, None);
        assert_eq!(h.snapshots.downloads(), 0);
        assert_eq!(std::fs::read(h.dataset()).unwrap(), b"old dataset");
        assert_eq!(h.service.accepted(), vec![(t1, SnapshotId(6))]);
    }

    #[tokio::test]
    async fn cycle_runs_inside_a_spawned_task() {
        let h = Harness::new(5);
        let t1 = ScheduleId::teacher(1);
        h.service.subscribe(t1, "T1");
        h.service
            .put_update(update(t1, 6, None, Some(lesson("A"))));
        h.subscribe(100, &[t1]);

        let pipeline = Arc::new(h.pipeline(5));
        let task = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.run_cycle().await }
        });

        let report = task.await.unwrap().unwrap();
        assert_eq!(report.fanout.messages_sent, 1);
        assert_eq!(h.messenger.sent_to(ChatId(100)).len(), 1);
    }

    #[tokio::test]
    async fn snapshot_check_installs_newer_dataset() {
        let h = Harness::new(6);
        let outcome = h.pipeline(5).run_snapshot_check().await.unwrap();
        assert!(matches!(
            outcome,
            ReconcileOutcome::Installed {
                snapshot_id: SnapshotId(6),
                ..
            }
        ));
        assert_eq!(h.snapshots.downloads(), 1);
        assert_eq!(h.connector.opened.load(Ordering::SeqCst), 1);
    }
}
