//! SQLite DDL for the service state database.

use rusqlite::Connection;

/// Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;

-- Single-row counter of the installed dataset version.
CREATE TABLE IF NOT EXISTS snapshot_info (
    snapshot_id INTEGER NOT NULL
);

-- One row per chat. Id lists are comma-joined decimal strings.
CREATE TABLE IF NOT EXISTS subscriptions (
    chat_id        INTEGER PRIMARY KEY,
    teacher_ids    TEXT,
    group_ids      TEXT,
    auditorium_ids TEXT,
    everyday_nots  INTEGER NOT NULL DEFAULT 0
);
"#;

pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(tables, vec!["snapshot_info", "subscriptions"]);
    }
}
