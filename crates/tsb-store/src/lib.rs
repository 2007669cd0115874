//! SQLite adapters: persisted snapshot counter, subscription reader and the
//! dataset entity catalog.

pub mod catalog;
mod schema;
pub mod state;

pub use catalog::SqliteDatasetCatalog;
pub use state::SqliteStateStore;

use tsb_core::{errors::Error, Result};

pub(crate) fn store_err(e: rusqlite::Error) -> Error {
    Error::Store(e.to_string())
}

/// Run blocking SQLite work off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::External(format!("blocking task failed: {e}")))?
}
