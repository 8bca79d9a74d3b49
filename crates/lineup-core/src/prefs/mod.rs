//! Key-value preference storage for persisted orders and selection modes.
//!
//! Values are opaque strings (the order and selection blobs are JSON). Any
//! backend implementing [`PreferenceStore`] can be used:
//!
//! - [`MemoryPreferenceStore`]: a `BTreeMap`, for tests and one-shot runs.
//! - [`file::FilePreferenceStore`]: one JSON object on disk, guarded by an
//!   advisory lock and replaced atomically.
//! - [`sqlite::SqlitePreferenceStore`]: a single-table SQLite database.

pub mod file;
pub mod sqlite;

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use crate::error::ErrorCode;
use crate::lock::LockError;

pub use file::FilePreferenceStore;
pub use sqlite::SqlitePreferenceStore;

/// Errors raised by preference backends.
#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("preference file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("preference file {path} is not a JSON object: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("preference database: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Lock(#[from] LockError),
}

impl PrefsError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Lock(err) => err.code(),
            _ => ErrorCode::PreferenceStoreFailed,
        }
    }
}

/// `get` / `set` / `remove` over string keys.
pub trait PreferenceStore {
    /// Read a value; `Ok(None)` when the key was never written.
    ///
    /// # Errors
    ///
    /// Backend failures only; a missing key is not an error.
    fn get(&self, key: &str) -> Result<Option<String>, PrefsError>;

    /// Write or overwrite a value.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError>;

    /// Delete a value. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn remove(&mut self, key: &str) -> Result<(), PrefsError>;
}

impl<T: PreferenceStore + ?Sized> PreferenceStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, PrefsError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), PrefsError> {
        (**self).remove(key)
    }
}

/// Preference key of the hierarchical order saved for `scope`.
#[must_use]
pub fn order_key(scope: &str) -> String {
    format!("lineup.order.{scope}")
}

/// Preference key of the selection mode saved for `target` within `scope`.
#[must_use]
pub fn selection_key(scope: &str, target: &str) -> String {
    format!("lineup.selection.{scope}.{target}")
}

/// In-memory preference store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryPreferenceStore {
    values: BTreeMap<String, String>,
}

impl MemoryPreferenceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PrefsError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PrefsError> {
        self.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &mut dyn PreferenceStore) -> Result<(), PrefsError> {
        assert_eq!(store.get("a")?, None);
        store.set("a", "1")?;
        store.set("a", "2")?;
        assert_eq!(store.get("a")?.as_deref(), Some("2"));
        store.remove("a")?;
        store.remove("a")?;
        assert_eq!(store.get("a")?, None);
        Ok(())
    }

    #[test]
    fn memory_store_contract() -> Result<(), PrefsError> {
        let mut store = MemoryPreferenceStore::new();
        exercise(&mut store)?;
        assert!(store.is_empty());
        Ok(())
    }

    #[test]
    fn boxed_store_delegates() -> Result<(), PrefsError> {
        let mut boxed: Box<dyn PreferenceStore> = Box::new(MemoryPreferenceStore::new());
        boxed.set("k", "v")?;
        assert_eq!(boxed.get("k")?.as_deref(), Some("v"));
        Ok(())
    }

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(order_key("study"), "lineup.order.study");
        assert_eq!(selection_key("study", "L1"), "lineup.selection.study.L1");
    }

    #[test]
    fn lock_errors_keep_their_code() {
        let err = PrefsError::from(LockError::Timeout {
            path: PathBuf::from("/tmp/x.lock"),
            waited: std::time::Duration::from_millis(5),
        });
        assert_eq!(err.code(), ErrorCode::LockContention);
    }
}
