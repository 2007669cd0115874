use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::info;
use tsb_core::{
    config::Config,
    errors::Error,
    ports::{RemoteConnector, RemoteSession},
    Result,
};

use crate::{
    client::GrpcWebClient, framing::FrameMode, service::GrpcScheduleService,
    snapshots::HttpSnapshotSource, token::ClientCredentials,
};

/// Where and how to reach the remote schedule service.
#[derive(Clone, Debug)]
pub struct RemoteSettings {
    pub base_url: String,
    pub service: String,
    pub info_url: String,
    pub rpc_timeout: Duration,
    pub download_timeout: Duration,
    pub frame_mode: FrameMode,
}

impl RemoteSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            base_url: cfg.schedule_base_url.clone(),
            service: cfg.schedule_service.clone(),
            info_url: cfg.schedule_info_url.clone(),
            rpc_timeout: cfg.rpc_timeout,
            download_timeout: cfg.download_timeout,
            frame_mode: if cfg.lenient_frames {
                FrameMode::Lenient
            } else {
                FrameMode::Strict
            },
        }
    }
}

/// Opens one authenticated session per job run.
///
/// Each `open` fetches a fresh token; the RPC client and the dataset source
/// share it and the underlying connection pool.
pub struct GrpcWebConnector {
    http: reqwest::Client,
    credentials: ClientCredentials,
    settings: RemoteSettings,
}

impl GrpcWebConnector {
    pub fn new(credentials: ClientCredentials, settings: RemoteSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.rpc_timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build error: {e}")))?;
        Ok(Self {
            http,
            credentials,
            settings,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            ClientCredentials {
                token_url: cfg.token_url.clone(),
                client_id: cfg.client_id.clone(),
                client_secret: cfg.client_secret.clone(),
            },
            RemoteSettings::from_config(cfg),
        )
    }
}

#[async_trait]
impl RemoteConnector for GrpcWebConnector {
    async fn open(&self) -> Result<RemoteSession> {
        let token = self.credentials.fetch_token(&self.http).await?;
        info!("access token acquired");

        let client = GrpcWebClient::with_http(
            self.http.clone(),
            &self.settings.base_url,
            &self.settings.service,
            token.clone(),
            self.settings.frame_mode,
        );
        let snapshots = HttpSnapshotSource::new(
            self.http.clone(),
            &self.settings.info_url,
            token,
            self.settings.download_timeout,
        );

        Ok(RemoteSession {
            schedules: Arc::new(GrpcScheduleService::new(client)),
            snapshots: Arc::new(snapshots),
        })
    }
}
