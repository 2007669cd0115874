use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::FixedOffset;

use crate::{errors::Error, messaging::throttled::ThrottleConfig, Result};

/// Which messenger delivers notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessengerKind {
    Telegram,
    Max,
}

/// Typed configuration for the sync service.
#[derive(Clone, Debug)]
pub struct Config {
    // Remote schedule service
    pub schedule_base_url: String,
    pub schedule_service: String,
    pub schedule_info_url: String,
    pub rpc_timeout: Duration,
    pub download_timeout: Duration,
    pub lenient_frames: bool,

    // OAuth client credentials
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,

    // Local state
    pub dataset_path: PathBuf,
    pub state_db_path: PathBuf,

    // Delivery
    pub messenger: MessengerKind,
    pub telegram_bot_token: Option<String>,
    pub max_bot_token: Option<String>,
    pub max_api_url: String,
    pub message_chunk_limit: usize,
    pub throttle: ThrottleConfig,

    // Pipeline tuning
    pub subscribe_page_size: usize,
    pub fetch_concurrency: usize,
    pub fanout_concurrency: usize,

    // Scheduling
    pub sync_cron: String,
    /// `None` when the hourly snapshot job is switched off; the sync cycle
    /// then checks the snapshot itself.
    pub snapshot_cron: Option<String>,
    pub schedule_tz: FixedOffset,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let schedule_info_url = required("SCHEDULE_INFO_URL")?;
        let token_url = required("TOKEN_URL")?;
        let client_id = required("CLIENT_ID")?;
        let client_secret = required("CLIENT_SECRET")?;
        let dataset_path = PathBuf::from(required("SQLITE_PATH")?);

        let schedule_base_url = env_str("SCHEDULE_BASE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "https://schedule-of.mirea.ru".to_string());
        let schedule_service = env_str("SCHEDULE_SERVICE")
            .and_then(non_empty)
            .unwrap_or_else(|| "rtu.schedule.api.PersonalScheduleService".to_string());
        let rpc_timeout = Duration::from_millis(env_u64("RPC_TIMEOUT_MS").unwrap_or(30_000));
        let download_timeout =
            Duration::from_millis(env_u64("DOWNLOAD_TIMEOUT_MS").unwrap_or(300_000));
        let lenient_frames = env_bool("LENIENT_FRAMES").unwrap_or(false);

        let state_db_path = env_path("STATE_DB_PATH").unwrap_or_else(|| "tsb-state.db".into());

        let messenger = match env_str("MESSENGER")
            .unwrap_or_default()
            .trim()
            .to_lowercase()
            .as_str()
        {
            "" | "telegram" => MessengerKind::Telegram,
            "max" => MessengerKind::Max,
            other => {
                return Err(Error::Config(format!(
                    "MESSENGER must be `telegram` or `max`, got `{other}`"
                )))
            }
        };
        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").and_then(non_empty);
        let max_bot_token = env_str("MAX_BOT_TOKEN").and_then(non_empty);
        match messenger {
            MessengerKind::Telegram if telegram_bot_token.is_none() => {
                return Err(Error::Config(
                    "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
                ))
            }
            MessengerKind::Max if max_bot_token.is_none() => {
                return Err(Error::Config(
                    "MAX_BOT_TOKEN environment variable is required".to_string(),
                ))
            }
            _ => {}
        }
        let max_api_url = env_str("MAX_API_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "https://platform-api.max.ru/messages".to_string());

        let message_chunk_limit = env_usize("MESSAGE_CHUNK_LIMIT").unwrap_or(4000).max(1);
        let throttle = ThrottleConfig {
            global_min_interval: Duration::from_millis(env_u64("THROTTLE_GLOBAL_MS").unwrap_or(40)),
            per_chat_min_interval: Duration::from_millis(
                env_u64("THROTTLE_PER_CHAT_MS").unwrap_or(1050),
            ),
        };

        let subscribe_page_size = env_usize("SUBSCRIBE_PAGE_SIZE").unwrap_or(10_000).max(1);
        let fetch_concurrency = env_usize("FETCH_CONCURRENCY").unwrap_or(8).max(1);
        let fanout_concurrency = env_usize("FANOUT_CONCURRENCY").unwrap_or(8).max(1);

        let sync_cron = env_str("SYNC_CRON")
            .and_then(non_empty)
            .unwrap_or_else(|| "*/10 7-20 * * *".to_string());
        let snapshot_cron = optional_cron(env_str("SNAPSHOT_CRON"), "0 * * * *");
        let offset_hours = env_i32("SCHEDULE_UTC_OFFSET_HOURS").unwrap_or(3);
        let schedule_tz = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            Error::Config(format!(
                "SCHEDULE_UTC_OFFSET_HOURS out of range: {offset_hours}"
            ))
        })?;

        Ok(Self {
            schedule_base_url,
            schedule_service,
            schedule_info_url,
            rpc_timeout,
            download_timeout,
            lenient_frames,
            token_url,
            client_id,
            client_secret,
            dataset_path,
            state_db_path,
            messenger,
            telegram_bot_token,
            max_bot_token,
            max_api_url,
            message_chunk_limit,
            throttle,
            subscribe_page_size,
            fetch_concurrency,
            fanout_concurrency,
            sync_cron,
            snapshot_cron,
            schedule_tz,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env_str(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }
        out.push((key.to_string(), val));
    }
    out
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_i32(key: &str) -> Option<i32> {
    env_str(key).and_then(|s| s.trim().parse::<i32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

/// Unset or blank falls back to `default`; `off` disables the job.
fn optional_cron(raw: Option<String>, default: &str) -> Option<String> {
    match raw.and_then(non_empty) {
        None => Some(default.to_string()),
        Some(v) if v.trim().eq_ignore_ascii_case("off") => None,
        Some(v) => Some(v),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
