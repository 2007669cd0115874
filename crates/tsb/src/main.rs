use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use tsb_core::{
    config::{Config, MessengerKind},
    messaging::{port::MessagingPort, throttled::ThrottledMessenger},
    scheduler::SyncScheduler,
    sync::{
        fanout::SubscriberFanout, pipeline::SyncPipeline, poller::UpdatePoller,
        reconciler::SnapshotReconciler,
    },
};
use tsb_grpcweb::GrpcWebConnector;
use tsb_max::MaxMessenger;
use tsb_store::{SqliteDatasetCatalog, SqliteStateStore};
use tsb_telegram::TelegramMessenger;

fn build_messenger(cfg: &Config) -> anyhow::Result<Arc<dyn MessagingPort>> {
    let inner: Arc<dyn MessagingPort> = match cfg.messenger {
        MessengerKind::Telegram => {
            let token = cfg
                .telegram_bot_token
                .clone()
                .context("TELEGRAM_BOT_TOKEN is not set")?;
            Arc::new(TelegramMessenger::from_token(token))
        }
        MessengerKind::Max => {
            let token = cfg
                .max_bot_token
                .clone()
                .context("MAX_BOT_TOKEN is not set")?;
            Arc::new(MaxMessenger::new(cfg.max_api_url.clone(), token)?)
        }
    };
    Ok(Arc::new(ThrottledMessenger::new(inner, cfg.throttle)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tsb_core::logging::init("tsb")?;

    let cfg = Config::load()?;

    let state = Arc::new(
        SqliteStateStore::open(&cfg.state_db_path)
            .with_context(|| format!("opening state db {}", cfg.state_db_path.display()))?,
    );
    let connector = Arc::new(GrpcWebConnector::from_config(&cfg)?);
    let messenger = build_messenger(&cfg)?;

    let reconciler = SnapshotReconciler::new(
        cfg.dataset_path.clone(),
        cfg.subscribe_page_size,
        state.clone(),
        Arc::new(SqliteDatasetCatalog),
    );
    let poller = UpdatePoller::new(cfg.fetch_concurrency);
    let fanout = SubscriberFanout::new(
        messenger,
        cfg.message_chunk_limit,
        cfg.fanout_concurrency,
        cfg.schedule_tz,
    );
    // The hourly snapshot job owns reconciliation unless it is switched off.
    let pipeline = Arc::new(
        SyncPipeline::new(connector, reconciler, poller, fanout, state)
            .with_cycle_reconcile(cfg.snapshot_cron.is_none()),
    );

    let scheduler = SyncScheduler::new(
        pipeline,
        cfg.schedule_tz,
        &cfg.sync_cron,
        cfg.snapshot_cron.as_deref(),
    );
    let jobs = scheduler.start().await?;
    info!(
        jobs,
        messenger = ?cfg.messenger,
        sync_cron = %cfg.sync_cron,
        snapshot_cron = cfg.snapshot_cron.as_deref().unwrap_or("off"),
        "tsb started"
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutting down");
    scheduler.stop().await;

    Ok(())
}
