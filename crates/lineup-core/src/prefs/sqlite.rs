//! Preferences kept in a SQLite database.
//!
//! Pragmas:
//! - `journal_mode = WAL` so readers do not block the writer
//! - `busy_timeout = 5s` to ride out short lock contention

use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::time::Duration;

use super::{PreferenceStore, PrefsError};

/// Busy timeout used for preference DB connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS preferences (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at_us INTEGER NOT NULL
);
";

/// SQLite-backed preference store.
#[derive(Debug)]
pub struct SqlitePreferenceStore {
    conn: Connection,
}

impl SqlitePreferenceStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened or configured.
    pub fn open(path: &Path) -> Result<Self, PrefsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| PrefsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        configure_connection(&conn)?;
        Self::with_connection(conn)
    }

    /// In-memory database, for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, PrefsError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, PrefsError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Microsecond timestamp of the last write to `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn updated_at_us(&self, key: &str) -> Result<Option<i64>, PrefsError> {
        Ok(self
            .conn
            .query_row(
                "SELECT updated_at_us FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

impl PreferenceStore for SqlitePreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PrefsError> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        let now_us = chrono::Utc::now().timestamp_micros();
        self.conn.execute(
            "INSERT INTO preferences (key, value, updated_at_us) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            updated_at_us = excluded.updated_at_us",
            params![key, value, now_us],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PrefsError> {
        self.conn
            .execute("DELETE FROM preferences WHERE key = ?1", params![key])?;
        Ok(())
    }
}
