//! Advisory file locks guarding the preference file.
//!
//! Readers take a shared lock, writers an exclusive one, on a sibling
//! `.lock` file so the data file itself can be replaced by rename.

use crate::error::ErrorCode;
use fs2::FileExt;
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

/// How long preference operations wait for a lock by default.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Advisory lock errors.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("{}: lock timed out after {waited:?} at {}", ErrorCode::LockContention.code(), path.display())]
    Timeout { path: PathBuf, waited: Duration },

    #[error("{}: {0}", ErrorCode::PreferenceStoreFailed.code())]
    Io(#[from] io::Error),
}

impl LockError {
    /// Machine-readable code associated with this lock error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::LockContention,
            Self::Io(_) => ErrorCode::PreferenceStoreFailed,
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

#[derive(Clone, Copy)]
enum LockKind {
    Shared,
    Exclusive,
}

#[derive(Debug)]
struct FileGuard {
    file: File,
    path: PathBuf,
}

impl FileGuard {
    fn acquire(path: &Path, timeout: Duration, kind: LockKind) -> Result<Self, LockError> {
        let parent = path.parent().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "lock path has no parent")
        })?;
        fs::create_dir_all(parent)?;

        let start = Instant::now();
        loop {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(path)?;

            let acquired = match kind {
                LockKind::Shared => file.try_lock_shared().is_ok(),
                LockKind::Exclusive => file.try_lock_exclusive().is_ok(),
            };

            if acquired {
                return Ok(Self {
                    file,
                    path: path.to_path_buf(),
                });
            }

            if start.elapsed() >= timeout {
                return Err(LockError::Timeout {
                    path: path.to_path_buf(),
                    waited: start.elapsed(),
                });
            }

            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// RAII guard for a shared read lock on the preference file.
#[derive(Debug)]
pub struct PrefsReadLock {
    guard: FileGuard,
}

impl PrefsReadLock {
    /// Acquire a shared advisory lock on `path`.
    ///
    /// # Errors
    ///
    /// Times out if a writer holds the lock longer than `timeout`.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        Ok(Self {
            guard: FileGuard::acquire(path, timeout, LockKind::Shared)?,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.guard.path
    }
}

/// RAII guard for an exclusive write lock on the preference file.
#[derive(Debug)]
pub struct PrefsWriteLock {
    guard: FileGuard,
}

impl PrefsWriteLock {
    /// Acquire an exclusive advisory lock on `path`.
    ///
    /// # Errors
    ///
    /// Times out if any other guard holds the lock longer than `timeout`.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        Ok(Self {
            guard: FileGuard::acquire(path, timeout, LockKind::Exclusive)?,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.guard.path
    }
}

#[cfg(test)]
mod tests {
    use super::{LockError, PrefsReadLock, PrefsWriteLock};
    use crate::error::ErrorCode;
    use std::{
        sync::{Arc, Barrier},
        thread,
        time::Duration,
    };
    use tempfile::TempDir;

    #[test]
    fn write_lock_acquire_and_drop() -> Result<(), LockError> {
        let dir = TempDir::new()?;
        let path = dir.path().join("prefs.lock");
        let lock = PrefsWriteLock::acquire(&path, Duration::from_millis(50))?;
        assert_eq!(lock.path(), path.as_path());
        drop(lock);
        let _again = PrefsWriteLock::acquire(&path, Duration::from_millis(50))?;
        Ok(())
    }

    #[test]
    fn write_lock_times_out_when_held() -> Result<(), LockError> {
        let dir = TempDir::new()?;
        let path = dir.path().join("prefs.lock");
        let _guard = PrefsWriteLock::acquire(&path, Duration::from_millis(50))?;
        let err = PrefsWriteLock::acquire(&path, Duration::from_millis(20)).unwrap_err();

        assert!(matches!(&err, LockError::Timeout { path: p, .. } if *p == path));
        assert_eq!(err.code(), ErrorCode::LockContention);
        assert!(err.hint().is_some());
        Ok(())
    }

    #[test]
    fn read_locks_are_compatible() -> Result<(), LockError> {
        let dir = TempDir::new()?;
        let path = dir.path().join("prefs.lock");
        let _first = PrefsReadLock::acquire(&path, Duration::from_millis(50))?;
        let _second = PrefsReadLock::acquire(&path, Duration::from_millis(50))?;
        Ok(())
    }

    #[test]
    fn writer_blocks_readers_until_released() -> Result<(), LockError> {
        let dir = TempDir::new()?;
        let path = dir.path().join("prefs.lock");

        let held = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));
        let held_thread = Arc::clone(&held);
        let release_thread = Arc::clone(&release);
        let path_in_thread = path.clone();
        let handle = thread::spawn(move || {
            let _writer =
                PrefsWriteLock::acquire(&path_in_thread, Duration::from_millis(200)).unwrap();
            held_thread.wait();
            release_thread.wait();
        });

        held.wait();
        assert!(matches!(
            PrefsReadLock::acquire(&path, Duration::from_millis(20)),
            Err(LockError::Timeout { .. })
        ));
        release.wait();
        handle.join().unwrap();

        let _reader = PrefsReadLock::acquire(&path, Duration::from_millis(50))?;
        Ok(())
    }
}
