//! Cron scheduler for the sync jobs.
//!
//! - Two jobs: the full sync cycle and the standalone snapshot check
//! - Standard 5-field cron syntax (min hour dom mon dow), evaluated in a fixed
//!   UTC offset
//! - Both jobs share one cycle lease; a tick that finds it taken is skipped

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};
use tokio::{sync::Mutex, task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{sync::SyncPipeline, Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// reconcile → poll → fan out → acknowledge
    Sync,
    /// Snapshot reconciliation only.
    Snapshot,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Snapshot => "snapshot",
        }
    }
}

/// Result of one scheduler tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobRun {
    Completed,
    Failed,
    /// Another job held the cycle lease.
    Skipped,
}

#[derive(Clone)]
pub struct SyncScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    pipeline: Arc<SyncPipeline>,
    tz: FixedOffset,
    crons: Vec<(JobKind, String)>,
    lease: Mutex<()>,
    jobs: Mutex<HashMap<JobKind, JobEntry>>,
}

struct JobEntry {
    expr: CronExpr,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl SyncScheduler {
    pub fn new(
        pipeline: Arc<SyncPipeline>,
        tz: FixedOffset,
        sync_cron: &str,
        snapshot_cron: Option<&str>,
    ) -> Self {
        let mut crons = Vec::with_capacity(2);
        if let Some(raw) = snapshot_cron {
            crons.push((JobKind::Snapshot, raw.to_string()));
        }
        crons.push((JobKind::Sync, sync_cron.to_string()));

        Self {
            inner: Arc::new(SchedulerInner {
                pipeline,
                tz,
                crons,
                lease: Mutex::new(()),
                jobs: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Parse every configured expression and spawn the job loops.
    ///
    /// An invalid expression fails the whole start; nothing is spawned.
    pub async fn start(&self) -> Result<usize> {
        self.stop().await;

        let mut parsed = Vec::with_capacity(self.inner.crons.len());
        for (kind, raw) in &self.inner.crons {
            let expr = CronExpr::parse(raw).map_err(|e| {
                Error::Config(format!(
                    "invalid cron expression for {} job: {e}",
                    kind.as_str()
                ))
            })?;
            parsed.push((*kind, expr));
        }

        let mut jobs = self.inner.jobs.lock().await;
        for (kind, expr) in parsed {
            let cancel = CancellationToken::new();
            let scheduler = self.clone();
            let cancel_clone = cancel.clone();
            let expr_for_task = expr.clone();
            let handle = tokio::spawn(async move {
                scheduler.job_loop(kind, expr_for_task, cancel_clone).await;
            });

            let next = expr.next_after(self.now());
            info!(job = kind.as_str(), next = ?next, "scheduled job");
            jobs.insert(
                kind,
                JobEntry {
                    expr,
                    cancel,
                    handle,
                },
            );
        }

        info!(jobs = jobs.len(), "scheduler started");
        Ok(jobs.len())
    }

    pub async fn stop(&self) {
        let mut jobs = self.inner.jobs.lock().await;
        for (_, job) in jobs.drain() {
            job.cancel.cancel();
            job.handle.abort(); // best-effort
        }
    }

    /// Next planned run for each started job.
    pub async fn next_runs(&self) -> Vec<(JobKind, Option<DateTime<FixedOffset>>)> {
        let now = self.now();
        let jobs = self.inner.jobs.lock().await;
        let mut out: Vec<_> = jobs
            .iter()
            .map(|(kind, job)| (*kind, job.expr.next_after(now)))
            .collect();
        out.sort_by_key(|(kind, _)| kind.as_str());
        out
    }

    /// Run one job right now, unless another one holds the lease.
    pub async fn run_job(&self, kind: JobKind) -> JobRun {
        let Ok(_lease) = self.inner.lease.try_lock() else {
            warn!(job = kind.as_str(), "previous cycle still running, skipping tick");
            return JobRun::Skipped;
        };

        info!(job = kind.as_str(), "job started");
        let res = match kind {
            JobKind::Sync => self.inner.pipeline.run_cycle().await.map(|report| {
                info!(
                    changed = report.poll.updates.len(),
                    messages = report.fanout.messages_sent,
                    acked = report.acks.acked.len(),
                    "sync cycle finished"
                );
            }),
            JobKind::Snapshot => self
                .inner
                .pipeline
                .run_snapshot_check()
                .await
                .map(|outcome| info!(outcome = ?outcome, "snapshot check finished")),
        };

        match res {
            Ok(()) => JobRun::Completed,
            Err(e) => {
                error!(job = kind.as_str(), error = %e, "job failed");
                JobRun::Failed
            }
        }
    }

    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.inner.tz)
    }

    async fn job_loop(&self, kind: JobKind, expr: CronExpr, cancel: CancellationToken) {
        loop {
            let now = self.now();
            let Some(next) = expr.next_after(now) else {
                error!(job = kind.as_str(), "job has no next run (stopping)");
                break;
            };

            let dur = (next - now).to_std().unwrap_or(Duration::from_secs(0));

            tokio::select! {
              _ = cancel.cancelled() => break,
              _ = sleep(dur) => {
                self.run_job(kind).await;
              }
            }
        }
    }
}

// === Cron expression engine ===

#[derive(Clone, Debug)]
pub(crate) struct CronExpr {
    min: Field,
    hour: Field,
    dom: Field,
    mon: Field,
    dow: Field,
}

#[derive(Clone, Debug)]
struct Field {
    min: u32,
    max: u32,
    any: bool,
    allowed: Vec<bool>, // index = value
}

impl CronExpr {
    pub(crate) fn parse(expr: &str) -> Result<Self> {
        let parts = expr.split_whitespace().collect::<Vec<_>>();
        if parts.len() != 5 {
            return Err(Error::Config(format!(
                "expected 5 fields, got {}",
                parts.len()
            )));
        }

        Ok(Self {
            min: Field::parse(parts[0], 0, 59, false)?,
            hour: Field::parse(parts[1], 0, 23, false)?,
            dom: Field::parse(parts[2], 1, 31, false)?,
            mon: Field::parse(parts[3], 1, 12, false)?,
            dow: Field::parse(parts[4], 0, 6, true)?,
        })
    }

    fn matches(&self, dt: DateTime<FixedOffset>) -> bool {
        if !self.min.contains(dt.minute())
            || !self.hour.contains(dt.hour())
            || !self.mon.contains(dt.month())
        {
            return false;
        }

        // Standard cron semantics: if both DOM and DOW are restricted, match when EITHER matches.
        let dom_match = self.dom.contains(dt.day());
        let dow_match = self.dow.contains(dt.weekday().num_days_from_sunday());

        match (self.dom.any, self.dow.any) {
            (true, true) => true,
            (true, false) => dow_match,
            (false, true) => dom_match,
            (false, false) => dom_match || dow_match,
        }
    }

    pub(crate) fn next_after(&self, now: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        let mut t = now + chrono::Duration::minutes(1);
        t = t.with_second(0)?.with_nanosecond(0)?;

        // Hard cap for impossible expressions (e.g. Feb 31).
        let max_iters = 366usize * 24 * 60;
        for _ in 0..max_iters {
            if self.matches(t) {
                return Some(t);
            }
            t += chrono::Duration::minutes(1);
        }
        None
    }
}

impl Field {
    fn parse(raw: &str, min: u32, max: u32, allow_7_as_0: bool) -> Result<Self> {
        let raw = raw.trim();
        let mut allowed = vec![false; (max + 1) as usize];

        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (base, step) = match part.split_once('/') {
                Some((a, b)) => {
                    let step: u32 = b
                        .trim()
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid step: {b}")))?;
                    if step == 0 {
                        return Err(Error::Config("step must be > 0".to_string()));
                    }
                    (a.trim(), Some(step))
                }
                None => (part, None),
            };

            let (start, end) = if base == "*" {
                (min, max)
            } else if let Some((a, b)) = base.split_once('-') {
                (
                    parse_u32(a.trim(), allow_7_as_0)?,
                    parse_u32(b.trim(), allow_7_as_0)?,
                )
            } else {
                let a = parse_u32(base, allow_7_as_0)?;
                if step.is_some() {
                    (a, max)
                } else {
                    (a, a)
                }
            };

            if start < min || end > max || start > end {
                return Err(Error::Config(format!("invalid range: {base}")));
            }

            let step = step.unwrap_or(1);
            let mut v = start;
            while v <= end {
                allowed[v as usize] = true;
                v = v.saturating_add(step);
            }
        }

        let any = (min..=max).all(|v| allowed[v as usize]);
        if !any && !allowed.iter().any(|a| *a) {
            return Err(Error::Config(format!("empty field: {raw}")));
        }

        Ok(Self {
            min,
            max,
            any,
            allowed,
        })
    }

    fn contains(&self, v: u32) -> bool {
        if v < self.min || v > self.max {
            return false;
        }
        self.allowed.get(v as usize).copied().unwrap_or(false)
    }
}

fn parse_u32(s: &str, allow_7_as_0: bool) -> Result<u32> {
    let v: u32 = s
        .parse()
        .map_err(|_| Error::Config(format!("invalid number: {s}")))?;
    Ok(if allow_7_as_0 && v == 7 { 0 } else { v })
}
