/// Core error type for the sync service.
///
/// Adapter crates map their specific errors into this type so the pipeline can
/// isolate failures per unit of work (one schedule, one subscriber, one page).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Non-2xx answer from a remote HTTP endpoint.
    pub fn transport(status: u16, body: impl Into<String>) -> Self {
        Self::Transport {
            status,
            body: body.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
