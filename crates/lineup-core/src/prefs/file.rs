//! Preferences kept in a single JSON object file.
//!
//! Reads take a shared lock and writes an exclusive lock on `<file>.lock`.
//! Writes go to `<file>.tmp` and are renamed over the original, so a reader
//! never observes a half-written file.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::{PreferenceStore, PrefsError};
use crate::lock::{DEFAULT_LOCK_TIMEOUT, PrefsReadLock, PrefsWriteLock};

type Values = BTreeMap<String, String>;

/// File-backed preference store.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
    lock_path: PathBuf,
    timeout: Duration,
}

impl FilePreferenceStore {
    /// Use `path` as the preference file. It is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = sibling(&path, "lock");
        Self {
            path,
            lock_path,
            timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Override how long to wait for the lock.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_values(&self) -> Result<Values, PrefsError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Values::new()),
            Err(source) => {
                return Err(PrefsError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.trim().is_empty() {
            return Ok(Values::new());
        }
        serde_json::from_str(&raw).map_err(|source| PrefsError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_values(&self, values: &Values) -> Result<(), PrefsError> {
        let io_err = |source| PrefsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let body = serde_json::to_string_pretty(values)?;
        let tmp = sibling(&self.path, "tmp");
        fs::write(&tmp, body).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Values) -> bool) -> Result<(), PrefsError> {
        let _lock = PrefsWriteLock::acquire(&self.lock_path, self.timeout)?;
        let mut values = self.read_values()?;
        if apply(&mut values) {
            self.write_values(&values)?;
            debug!(path = %self.path.display(), keys = values.len(), "wrote preferences");
        }
        Ok(())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PrefsError> {
        let _lock = PrefsReadLock::acquire(&self.lock_path, self.timeout)?;
        Ok(self.read_values()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), PrefsError> {
        self.update(|values| values.remove(key).is_some())
    }
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    #[test]
    fn values_survive_reopen() -> Result<(), PrefsError> {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("prefs.json");

        let mut store = FilePreferenceStore::new(&path);
        assert_eq!(store.get("a")?, None);
        store.set("a", "1")?;
        store.set("b", "2")?;
        store.remove("b")?;

        let reopened = FilePreferenceStore::new(&path);
        assert_eq!(reopened.get("a")?.as_deref(), Some("1"));
        assert_eq!(reopened.get("b")?, None);
        assert!(!dir.path().join("prefs.json.tmp").exists());
        Ok(())
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("prefs.json");
        fs::write(&path, "[1, 2").expect("write");

        let store = FilePreferenceStore::new(&path);
        let err = store.get("a").expect_err("corrupt");
        assert!(matches!(err, PrefsError::Corrupt { .. }));
        assert_eq!(err.code(), ErrorCode::PreferenceStoreFailed);
    }

    #[test]
    fn held_lock_times_out_writes() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("prefs.json");
        let mut store = FilePreferenceStore::new(&path).with_timeout(Duration::from_millis(20));

        let _held = PrefsWriteLock::acquire(&dir.path().join("prefs.json.lock"), Duration::from_millis(50))
            .expect("hold lock");
        let err = store.set("a", "1").expect_err("locked");
        assert_eq!(err.code(), ErrorCode::LockContention);
    }

    #[test]
    fn sibling_appends_extension() {
        assert_eq!(
            sibling(Path::new("/x/prefs.json"), "lock"),
            PathBuf::from("/x/prefs.json.lock")
        );
    }
}
