//! Snapshot counter and subscriptions in one SQLite file.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tsb_core::{
    domain::{ChatId, SnapshotId},
    errors::Error,
    ports::{SnapshotStore, SubscriptionStore},
    subscriptions::Subscription,
    Result,
};

use crate::{blocking, schema::apply_schema, store_err};

/// State database shared by the snapshot counter and the subscription reader.
///
/// Every call runs on the blocking pool; the connection is serialized by a mutex.
#[derive(Clone)]
pub struct SqliteStateStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStateStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path).map_err(store_err)?;
        apply_schema(&conn).map_err(store_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| Error::Store(format!("connection lock poisoned: {e}")))?;
            f(&mut guard).map_err(store_err)
        })
        .await
    }
}

#[async_trait]
impl SnapshotStore for SqliteStateStore {
    async fn read(&self) -> Result<SnapshotId> {
        self.with_conn(|conn| {
            conn.query_row("SELECT snapshot_id FROM snapshot_info LIMIT 1", [], |row| {
                row.get::<_, i64>(0)
            })
            .optional()
            .map(|v| SnapshotId(v.unwrap_or(0)))
        })
        .await
    }

    async fn upsert(&self, snapshot_id: SnapshotId) -> Result<()> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let updated = tx.execute(
                "UPDATE snapshot_info SET snapshot_id = ?1",
                params![snapshot_id.0],
            )?;
            if updated == 0 {
                tx.execute(
                    "INSERT INTO snapshot_info (snapshot_id) VALUES (?1)",
                    params![snapshot_id.0],
                )?;
            }
            tx.commit()
        })
        .await
    }
}

#[async_trait]
impl SubscriptionStore for SqliteStateStore {
    async fn all(&self) -> Result<Vec<Subscription>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT chat_id, group_ids, teacher_ids, auditorium_ids FROM subscriptions",
            )?;
            let rows = stmt.query_map([], |row| {
                let chat_id: i64 = row.get(0)?;
                let groups: Option<String> = row.get(1)?;
                let teachers: Option<String> = row.get(2)?;
                let places: Option<String> = row.get(3)?;
                Ok(Subscription::from_legacy(
                    ChatId(chat_id),
                    groups.as_deref(),
                    teachers.as_deref(),
                    places.as_deref(),
                ))
            })?;
            rows.collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsb_core::domain::ScheduleId;

    fn open_temp() -> (tempfile::TempDir, SqliteStateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStateStore::open(&dir.path().join("state.db")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn counter_defaults_to_zero_then_upserts() {
        let (_dir, store) = open_temp();
        assert_eq!(store.read().await.unwrap(), SnapshotId(0));

        store.upsert(SnapshotId(5)).await.unwrap();
        store.upsert(SnapshotId(6)).await.unwrap();
        assert_eq!(store.read().await.unwrap(), SnapshotId(6));

        let rows: i64 = store
            .with_conn(|c| c.query_row("SELECT COUNT(*) FROM snapshot_info", [], |r| r.get(0)))
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn counter_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        SqliteStateStore::open(&path)
            .unwrap()
            .upsert(SnapshotId(9))
            .await
            .unwrap();
        let reopened = SqliteStateStore::open(&path).unwrap();
        assert_eq!(reopened.read().await.unwrap(), SnapshotId(9));
    }

    #[tokio::test]
    async fn legacy_rows_are_parsed_once_into_sets() {
        let (_dir, store) = open_temp();
        store
            .with_conn(|c| {
                c.execute(
                    "INSERT INTO subscriptions (chat_id, teacher_ids, group_ids, auditorium_ids) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![100, "1,2", "15", None::<String>],
                )?;
                c.execute(
                    "INSERT INTO subscriptions (chat_id, teacher_ids, group_ids, auditorium_ids) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![200, "", "x, 7,", "3"],
                )
            })
            .await
            .unwrap();

        let mut subs = store.all().await.unwrap();
        subs.sort_by_key(|s| s.chat_id.0);
        assert_eq!(subs.len(), 2);

        assert!(subs[0].contains(&ScheduleId::teacher(1)));
        assert!(subs[0].contains(&ScheduleId::teacher(2)));
        assert!(subs[0].contains(&ScheduleId::group(15)));
        assert!(!subs[0].contains(&ScheduleId::place(15)));

        assert_eq!(subs[1].schedules.len(), 2);
        assert!(subs[1].contains(&ScheduleId::group(7)));
        assert!(subs[1].contains(&ScheduleId::place(3)));
    }
}
