use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::error::ConwatchError;
use crate::kv::{KeyValueStore, Write};

const SCHEMA_V1: &str = "CREATE TABLE IF NOT EXISTS kv (
    key        TEXT PRIMARY KEY NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);";

/// SQLite-backed key-value store for the watchlist and settings.
///
/// Several processes may open the same file; writes go through an
/// `IMMEDIATE` transaction so the read and the write see the same row.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, ConwatchError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, ConwatchError> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ConwatchError> {
        self.conn
            .lock()
            .map_err(|_| ConwatchError::StorageUnavailable("connection lock poisoned".into()))
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConwatchError> {
        let conn = self.lock()?;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(Into::into)
    }

    fn read_modify_write(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&str>) -> Result<Write, ConwatchError>,
    ) -> Result<(), ConwatchError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<String> = tx
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;

        // Dropping `tx` on error rolls back.
        match f(current.as_deref())? {
            Write::Put(value) => {
                tx.execute(
                    "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
                     ON CONFLICT(key) DO UPDATE SET
                       value = excluded.value,
                       updated_at = excluded.updated_at",
                    params![key, value],
                )?;
                tx.commit()?;
            }
            Write::Keep => tx.commit()?,
        }
        Ok(())
    }
}

fn run_migrations(conn: &Connection) -> Result<(), ConwatchError> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::kv::{get_json, update_json};

    #[test]
    fn test_get_missing_key() {
        let db = SqliteStore::open_memory().unwrap();
        assert!(db.get("watchlist").unwrap().is_none());
    }

    #[test]
    fn test_put_and_overwrite() {
        let db = SqliteStore::open_memory().unwrap();
        db.read_modify_write("k", &mut |cur| {
            assert!(cur.is_none());
            Ok(Write::Put("1".into()))
        })
        .unwrap();
        db.read_modify_write("k", &mut |cur| {
            assert_eq!(cur, Some("1"));
            Ok(Write::Put("2".into()))
        })
        .unwrap();
        assert_eq!(db.get("k").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_failed_closure_rolls_back() {
        let db = SqliteStore::open_memory().unwrap();
        db.read_modify_write("k", &mut |_| Ok(Write::Put("kept".into())))
            .unwrap();
        let err = db
            .read_modify_write("k", &mut |_| {
                Err(ConwatchError::StorageUnavailable("boom".into()))
            })
            .unwrap_err();
        assert!(matches!(err, ConwatchError::StorageUnavailable(_)));
        assert_eq!(db.get("k").unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conwatch.db");
        {
            let db = SqliteStore::open(&path).unwrap();
            update_json(&db, "list", |mut v: Vec<String>| {
                v.push("a".into());
                Some((v, ()))
            })
            .unwrap();
        }
        let db = SqliteStore::open(&path).unwrap();
        let v: Vec<String> = get_json(&db, "list").unwrap();
        assert_eq!(v, vec!["a".to_string()]);
    }

    #[test]
    fn test_two_connections_same_file_converge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conwatch.db");
        let a = Arc::new(SqliteStore::open(&path).unwrap());
        let b = Arc::new(SqliteStore::open(&path).unwrap());

        let handles: Vec<_> = [a, b]
            .into_iter()
            .enumerate()
            .map(|(t, db)| {
                std::thread::spawn(move || {
                    for i in 0..20 {
                        update_json(&*db, "list", |mut v: Vec<usize>| {
                            v.push(t * 100 + i);
                            Some((v, ()))
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let db = SqliteStore::open(&path).unwrap();
        let v: Vec<usize> = get_json(&db, "list").unwrap();
        assert_eq!(v.len(), 40);
    }
}
