use std::{path::Path, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::info;
use tsb_core::{
    domain::SnapshotId,
    errors::Error,
    ports::{SnapshotInfo, SnapshotSource},
    Result,
};

use crate::client::request_error;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleInfo {
    snapshot_id: i64,
    db_file_link: String,
}

/// Schedule-info endpoint plus plain HTTP transfer of the dataset file.
pub struct HttpSnapshotSource {
    http: reqwest::Client,
    info_url: String,
    token: String,
    download_timeout: Duration,
}

impl HttpSnapshotSource {
    pub fn new(
        http: reqwest::Client,
        info_url: impl Into<String>,
        token: impl Into<String>,
        download_timeout: Duration,
    ) -> Self {
        Self {
            http,
            info_url: info_url.into(),
            token: token.into(),
            download_timeout,
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch_info(&self) -> Result<SnapshotInfo> {
        let resp = self
            .http
            .get(&self.info_url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| request_error("schedule info", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::transport(status.as_u16(), body));
        }

        let info: ScheduleInfo = resp
            .json()
            .await
            .map_err(|e| Error::Decode(format!("schedule info: {e}")))?;
        info!(snapshot_id = info.snapshot_id, "fetched schedule info");
        Ok(SnapshotInfo {
            snapshot_id: SnapshotId(info.snapshot_id),
            download_url: info.db_file_link,
        })
    }

    /// Stream the body into `dest` and flush it to disk before returning.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut resp = self
            .http
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| request_error("dataset download", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::transport(
                status.as_u16(),
                body.chars().take(200).collect::<String>(),
            ));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| request_error("dataset download", e))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}
