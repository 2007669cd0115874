//! Hexagonal ports for the sync pipeline.
//!
//! The remote schedule service, the persisted state and the dataset file all
//! live behind these traits; adapter crates implement them.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;

use crate::{
    diff::ScheduleUpdate,
    domain::{ScheduleId, SnapshotId},
    subscriptions::Subscription,
    Result,
};

/// A schedule the remote service is tracking on our behalf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribedSchedule {
    pub schedule_id: ScheduleId,
    pub title: String,
}

/// Typed RPC surface of the remote schedule service.
#[async_trait]
pub trait ScheduleService: Send + Sync {
    async fn list_subscribed_schedules(&self) -> Result<Vec<SubscribedSchedule>>;

    /// Diff since the last accepted snapshot. `None` means "no change".
    async fn get_updates(&self, schedule: &SubscribedSchedule) -> Result<Option<ScheduleUpdate>>;

    async fn accept_updates(&self, schedule_id: &ScheduleId, snapshot_id: SnapshotId)
        -> Result<()>;

    /// Register one page of schedules. An `Err` means the page was rejected.
    async fn register_schedules(&self, page: &[ScheduleId]) -> Result<()>;

    async fn schedule_title(&self, schedule_id: &ScheduleId) -> Result<String>;
}

/// Metadata of the dataset currently published by the remote service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub snapshot_id: SnapshotId,
    pub download_url: String,
}

/// Source of full dataset snapshots.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_info(&self) -> Result<SnapshotInfo>;

    /// Download the complete dataset into `dest`. Returns the byte count.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Remote handles that share one access token.
#[derive(Clone)]
pub struct RemoteSession {
    pub schedules: Arc<dyn ScheduleService>,
    pub snapshots: Arc<dyn SnapshotSource>,
}

/// Opens a scoped session against the remote service (token + clients).
///
/// Dropping the returned session closes it.
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn open(&self) -> Result<RemoteSession>;
}

/// Locally persisted dataset version counter.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Current counter, `SnapshotId(0)` when nothing was ever installed.
    async fn read(&self) -> Result<SnapshotId>;
    async fn upsert(&self, snapshot_id: SnapshotId) -> Result<()>;
}

/// Read-only view of subscriber subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn all(&self) -> Result<Vec<Subscription>>;
}

/// Enumerates entity ids contained in an installed dataset file.
#[async_trait]
pub trait DatasetCatalog: Send + Sync {
    async fn entity_ids(&self, dataset: &Path) -> Result<Vec<ScheduleId>>;
}
