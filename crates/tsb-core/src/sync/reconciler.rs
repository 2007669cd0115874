//! Snapshot reconciliation: detect a new dataset, install it atomically,
//! re-register every entity with the remote service.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{error, info, warn};

use crate::{
    domain::{ScheduleId, SnapshotId},
    ports::{DatasetCatalog, RemoteSession, ScheduleService, SnapshotStore},
    Result,
};

/// Result of one `check_for_update` call.
#[derive(Clone, Debug, PartialEq)]
pub enum ReconcileOutcome {
    /// Remote version is not newer than the installed one; nothing changed.
    Stale {
        local: SnapshotId,
        remote: SnapshotId,
    },
    Installed {
        previous: SnapshotId,
        snapshot_id: SnapshotId,
        bytes: u64,
        registration: RegistrationReport,
    },
}

/// Outcome of paged registration. Never raised as an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    pub ids_total: usize,
    pub pages_total: usize,
    pub pages_ok: usize,
}

impl RegistrationReport {
    /// Share of pages accepted, `1.0` when there was nothing to send.
    pub fn success_ratio(&self) -> f64 {
        if self.pages_total == 0 {
            return 1.0;
        }
        self.pages_ok as f64 / self.pages_total as f64
    }

    pub fn is_complete(&self) -> bool {
        self.pages_ok == self.pages_total
    }
}

pub struct SnapshotReconciler {
    dataset_path: PathBuf,
    page_size: usize,
    store: Arc<dyn SnapshotStore>,
    catalog: Arc<dyn DatasetCatalog>,
}

impl SnapshotReconciler {
    pub fn new(
        dataset_path: impl Into<PathBuf>,
        page_size: usize,
        store: Arc<dyn SnapshotStore>,
        catalog: Arc<dyn DatasetCatalog>,
    ) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            page_size: page_size.max(1),
            store,
            catalog,
        }
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    pub async fn current_snapshot(&self) -> Result<SnapshotId> {
        self.store.read().await
    }

    /// Install the remote dataset if it is newer than the local one.
    ///
    /// The local counter moves only after the new file is in place.
    pub async fn check_for_update(&self, remote: &RemoteSession) -> Result<ReconcileOutcome> {
        let info = remote.snapshots.fetch_info().await?;
        let local = self.current_snapshot().await?;
        info!(local = %local, remote = %info.snapshot_id, "checked dataset snapshot");

        if info.snapshot_id <= local {
            info!("dataset is up to date");
            return Ok(ReconcileOutcome::Stale {
                local,
                remote: info.snapshot_id,
            });
        }

        info!(snapshot_id = %info.snapshot_id, "downloading new dataset");
        let staged = self.staging_path();
        if let Some(dir) = staged.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        let bytes = match remote.snapshots.download(&info.download_url, &staged).await {
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, "dataset download failed");
                discard(&staged).await;
                return Err(e);
            }
        };

        if let Err(e) = self.install(&staged).await {
            error!(error = %e, "dataset install failed");
            discard(&staged).await;
            return Err(e);
        }
        info!(
            size_mb = %format!("{:.2}", bytes as f64 / (1024.0 * 1024.0)),
            "dataset file replaced"
        );

        self.store.upsert(info.snapshot_id).await?;

        let registration = self.resubscribe(remote.schedules.as_ref()).await;
        info!(snapshot_id = %info.snapshot_id, "dataset update finished");

        Ok(ReconcileOutcome::Installed {
            previous: local,
            snapshot_id: info.snapshot_id,
            bytes,
            registration,
        })
    }

    /// Register every entity of the installed dataset with the remote service.
    pub async fn resubscribe(&self, service: &dyn ScheduleService) -> RegistrationReport {
        let ids = match self.catalog.entity_ids(&self.dataset_path).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "failed to enumerate dataset entities");
                return RegistrationReport::default();
            }
        };
        info!(total = ids.len(), "schedules to register");
        if ids.is_empty() {
            warn!("dataset contains no schedules to register");
        }
        register_in_pages(service, &ids, self.page_size).await
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = OsString::from(self.dataset_path.as_os_str());
        name.push(".temp");
        PathBuf::from(name)
    }

    /// Move a completely written file over the active dataset.
    async fn install(&self, staged: &Path) -> Result<()> {
        match tokio::fs::rename(staged, &self.dataset_path).await {
            Ok(()) => Ok(()),
            // Platforms where rename does not replace an existing file.
            Err(_) if path_exists(&self.dataset_path).await => {
                tokio::fs::remove_file(&self.dataset_path).await?;
                tokio::fs::rename(staged, &self.dataset_path).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Submit `ids` in pages of `page_size`; a rejected page does not stop the rest.
pub async fn register_in_pages(
    service: &dyn ScheduleService,
    ids: &[ScheduleId],
    page_size: usize,
) -> RegistrationReport {
    let page_size = page_size.max(1);
    let pages_total = ids.len().div_ceil(page_size);
    let mut pages_ok = 0usize;

    for (index, page) in ids.chunks(page_size).enumerate() {
        let page_no = index + 1;
        info!(page = page_no, pages = pages_total, size = page.len(), "registering page");
        match service.register_schedules(page).await {
            Ok(()) => pages_ok += 1,
            Err(e) => error!(page = page_no, error = %e, "page registration failed"),
        }
    }

    let report = RegistrationReport {
        ids_total: ids.len(),
        pages_total,
        pages_ok,
    };
    info!(
        ok = report.pages_ok,
        total = report.pages_total,
        ratio = %format!("{:.1}%", report.success_ratio() * 100.0),
        "schedule registration finished"
    );
    report
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove staged dataset");
        }
    }
}
