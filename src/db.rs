use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::storage::{BackendError, KeyValueStore};

/// SQLite file holding one row per collection key.
pub struct Database {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl Database {
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn default_path() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "fachowiec") {
            proj_dirs.data_dir().join("fachowiec.db")
        } else {
            PathBuf::from("fachowiec.db")
        }
    }

    pub fn init(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| anyhow!("database lock poisoned"))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| anyhow!("database lock poisoned"))?;
        let tables: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='kv'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!(
                "Database not initialized. Run 'fachowiec init' first."
            ));
        }
        Ok(())
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, BackendError> {
        let conn = self.conn.lock().map_err(|_| "database lock poisoned")?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> std::result::Result<(), BackendError> {
        let conn = self.conn.lock().map_err(|_| "database lock poisoned")?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> std::result::Result<(), BackendError> {
        let conn = self.conn.lock().map_err(|_| "database lock poisoned")?;
        conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Collection, Storage};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_uninitialized_database_is_rejected() {
        let temp = tempdir().unwrap();
        let db = Database::open_at(&temp.path().join("x.db")).unwrap();
        assert!(db.ensure_initialized().is_err());
        db.init().unwrap();
        assert!(db.ensure_initialized().is_ok());
    }

    #[test]
    fn test_set_overwrites_value() {
        let temp = tempdir().unwrap();
        let db = Database::open_at(&temp.path().join("kv.db")).unwrap();
        db.init().unwrap();

        assert_eq!(db.get("fachowiec_jobs").unwrap(), None);
        db.set("fachowiec_jobs", "[]").unwrap();
        db.set("fachowiec_jobs", "[1]").unwrap();
        assert_eq!(db.get("fachowiec_jobs").unwrap().as_deref(), Some("[1]"));

        db.remove("fachowiec_jobs").unwrap();
        assert_eq!(db.get("fachowiec_jobs").unwrap(), None);
    }

    #[test]
    fn test_missing_table_surfaces_as_write_failure() {
        let temp = tempdir().unwrap();
        let db = Database::open_at(&temp.path().join("bare.db")).unwrap();
        let storage = Storage::new(Arc::new(db));

        // No table yet: reads are empty, writes report the failure.
        assert!(storage.load::<serde_json::Value>(Collection::Jobs).is_empty());
        let err = storage.store::<serde_json::Value>(Collection::Jobs, &[]).unwrap_err();
        assert!(err.is_write_failure());
    }

    #[test]
    fn test_collections_survive_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("fachowiec.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.init().unwrap();
            let storage = Storage::new(Arc::new(db));
            storage
                .store(Collection::Clients, &[serde_json::json!({"id": "c1"})])
                .unwrap();
        }

        let db = Database::open_at(&path).unwrap();
        let storage = Storage::new(Arc::new(db));
        let clients: Vec<serde_json::Value> = storage.load(Collection::Clients);
        assert_eq!(clients.len(), 1);
    }
}
