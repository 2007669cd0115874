use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    diff::ScheduleUpdate,
    domain::{ScheduleId, SnapshotId},
    ports::ScheduleService,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AckReport {
    pub acked: Vec<(ScheduleId, SnapshotId)>,
    pub failed: Vec<ScheduleId>,
    /// Updates without a snapshot id; there is nothing to confirm.
    pub skipped: Vec<ScheduleId>,
}

/// Confirms consumed diffs and remembers the last confirmed snapshot per schedule.
#[derive(Default)]
pub struct AckTracker {
    acked: Mutex<HashMap<ScheduleId, SnapshotId>>,
}

impl AckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn last_acked(&self, schedule_id: &ScheduleId) -> Option<SnapshotId> {
        self.acked.lock().await.get(schedule_id).copied()
    }

    /// A diff is accepted only if it is newer than the last confirmed one.
    pub async fn is_new(&self, schedule_id: &ScheduleId, snapshot_id: SnapshotId) -> bool {
        match self.last_acked(schedule_id).await {
            Some(last) => snapshot_id > last,
            None => true,
        }
    }

    /// Accept every update that was shown to subscribers this cycle.
    ///
    /// Each ack carries the snapshot of the very update that was rendered.
    /// Failures are logged per schedule; the diff is redelivered next cycle.
    /// Updates with snapshot id 0 are not confirmed.
    pub async fn acknowledge(
        &self,
        service: &dyn ScheduleService,
        updates: &[ScheduleUpdate],
    ) -> AckReport {
        let mut report = AckReport::default();

        for upd in updates {
            if upd.snapshot_id == SnapshotId(0) {
                debug!(
                    schedule = %upd.schedule_id,
                    "update has no snapshot id, not accepting"
                );
                report.skipped.push(upd.schedule_id);
                continue;
            }
            match service
                .accept_updates(&upd.schedule_id, upd.snapshot_id)
                .await
            {
                Ok(()) => {
                    info!(
                        schedule = %upd.schedule_id,
                        title = %upd.title,
                        snapshot_id = %upd.snapshot_id,
                        "accepted updates"
                    );
                    self.record(upd.schedule_id, upd.snapshot_id).await;
                    report.acked.push((upd.schedule_id, upd.snapshot_id));
                }
                Err(e) => {
                    warn!(
                        schedule = %upd.schedule_id,
                        title = %upd.title,
                        error = %e,
                        "failed to accept updates"
                    );
                    report.failed.push(upd.schedule_id);
                }
            }
        }

        report
    }

    async fn record(&self, schedule_id: ScheduleId, snapshot_id: SnapshotId) {
        let mut acked = self.acked.lock().await;
        let entry = acked.entry(schedule_id).or_insert(snapshot_id);
        if snapshot_id > *entry {
            *entry = snapshot_id;
        }
    }
}
