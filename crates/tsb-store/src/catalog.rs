//! Entity enumeration over the downloaded dataset file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};
use tracing::{info, warn};
use tsb_core::{
    domain::{ScheduleId, ScheduleType},
    ports::DatasetCatalog,
    Result,
};

use crate::{blocking, store_err};

/// Dataset table holding the ids of each schedule type.
pub fn table_for(kind: ScheduleType) -> &'static str {
    match kind {
        ScheduleType::Group => "academic_group",
        ScheduleType::Teacher => "teacher",
        ScheduleType::Place => "place",
    }
}

/// Reads entity ids straight from the dataset's SQLite tables.
#[derive(Clone, Copy, Debug, Default)]
pub struct SqliteDatasetCatalog;

#[async_trait]
impl DatasetCatalog for SqliteDatasetCatalog {
    async fn entity_ids(&self, dataset: &Path) -> Result<Vec<ScheduleId>> {
        let path: PathBuf = dataset.to_path_buf();
        blocking(move || read_entity_ids(&path)).await
    }
}

/// Ids of all three types, groups first. A missing or unreadable table is
/// logged and contributes nothing.
fn read_entity_ids(dataset: &Path) -> Result<Vec<ScheduleId>> {
    let conn = Connection::open_with_flags(dataset, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(store_err)?;

    let mut out = Vec::new();
    for kind in ScheduleType::ALL {
        let table = table_for(kind);
        match ids_from_table(&conn, table) {
            Ok(ids) => {
                info!(table, count = ids.len(), "read dataset ids");
                out.extend(ids.into_iter().map(|id| ScheduleId::new(kind, id)));
            }
            Err(e) => warn!(table, error = %e, "failed to read dataset ids"),
        }
    }
    Ok(out)
}

fn ids_from_table(conn: &Connection, table: &str) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare(&format!("SELECT id FROM \"{table}\" ORDER BY id"))?;
    let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
    rows.collect()
}
