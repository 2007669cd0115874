use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::{
    diff::ScheduleUpdate,
    domain::ScheduleId,
    ports::{ScheduleService, SubscribedSchedule},
    sync::ack::AckTracker,
    Result,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    pub polled: usize,
    /// Accepted diffs, sorted by schedule id.
    pub updates: Vec<ScheduleUpdate>,
    pub failed: Vec<ScheduleId>,
    /// Diffs dropped because their snapshot was already acknowledged.
    pub stale: Vec<ScheduleId>,
}

/// Collects per-schedule diffs from the remote service.
pub struct UpdatePoller {
    concurrency: usize,
}

impl UpdatePoller {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Ask for a diff for every subscribed schedule.
    ///
    /// Only the schedule list is fatal for the poll; a failing schedule is
    /// logged and skipped.
    pub async fn poll(
        &self,
        service: &dyn ScheduleService,
        acks: &AckTracker,
    ) -> Result<PollReport> {
        let schedules = service.list_subscribed_schedules().await?;
        info!(count = schedules.len(), "polling subscribed schedules");

        let results = stream::iter(schedules)
            .map(|schedule| async move {
                let schedule = with_title(service, schedule).await;
                let res = service.get_updates(&schedule).await;
                (schedule, res)
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let mut report = PollReport {
            polled: results.len(),
            ..Default::default()
        };

        for (schedule, res) in results {
            let update = match res {
                Ok(Some(update)) => update,
                Ok(None) => continue,
                Err(e) => {
                    error!(
                        schedule = %schedule.schedule_id,
                        title = %schedule.title,
                        error = %e,
                        "failed to fetch updates"
                    );
                    report.failed.push(schedule.schedule_id);
                    continue;
                }
            };

            if !acks.is_new(&update.schedule_id, update.snapshot_id).await {
                debug!(
                    schedule = %update.schedule_id,
                    snapshot_id = %update.snapshot_id,
                    "diff already acknowledged"
                );
                report.stale.push(update.schedule_id);
                continue;
            }

            for rec in &update.records {
                let anomalies = rec.anomalies();
                if anomalies > 0 {
                    warn!(
                        schedule = %rec.schedule_id,
                        snapshot_id = %rec.snapshot_id,
                        anomalies,
                        "diff contains transitions with neither side present"
                    );
                }
            }
            report.updates.push(update);
        }

        report.updates.sort_by_key(|u| u.schedule_id);
        report.failed.sort();
        report.stale.sort();
        info!(
            polled = report.polled,
            changed = report.updates.len(),
            failed = report.failed.len(),
            "poll finished"
        );
        Ok(report)
    }
}

async fn with_title(
    service: &dyn ScheduleService,
    mut schedule: SubscribedSchedule,
) -> SubscribedSchedule {
    if !schedule.title.trim().is_empty() {
        return schedule;
    }
    match service.schedule_title(&schedule.schedule_id).await {
        Ok(title) if !title.trim().is_empty() => schedule.title = title,
        Ok(_) | Err(_) => schedule.title = schedule.schedule_id.to_string(),
    }
    schedule
}
