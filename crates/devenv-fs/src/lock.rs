//! Path-keyed locks
//!
//! Serializes work on one installation path within this process (condvar over
//! a set of held paths) and, when a lock directory is configured, across
//! processes via an `fs2` advisory lock on a per-path lock file.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};

use fs2::FileExt;

use crate::{Error, Result, checksum};

#[derive(Debug, Default)]
struct Inner {
    held: Mutex<HashSet<PathBuf>>,
    released: Condvar,
}

/// A registry of per-path exclusive locks.
///
/// Cloning is cheap; clones share the same lock table.
#[derive(Debug, Clone, Default)]
pub struct PathLocks {
    inner: Arc<Inner>,
    lock_dir: Option<PathBuf>,
}

impl PathLocks {
    /// In-process locking only.
    pub fn new() -> Self {
        Self::default()
    }

    /// In-process locking plus lock files under `lock_dir`.
    pub fn with_lock_dir(lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::default(),
            lock_dir: Some(lock_dir.into()),
        }
    }

    /// Block until `path` is free, then hold it until the guard drops.
    pub fn lock(&self, path: &Path) -> Result<PathLockGuard> {
        self.acquire(path, true)
    }

    /// Like [`lock`](Self::lock), but never creates the lock directory or a
    /// lock file. Cross-process exclusion applies only once a writer has
    /// created the lock file, which suits read-only checks.
    pub fn lock_existing(&self, path: &Path) -> Result<PathLockGuard> {
        self.acquire(path, false)
    }

    fn acquire(&self, path: &Path, create: bool) -> Result<PathLockGuard> {
        let key = path.to_path_buf();
        {
            let mut held = self.inner.held.lock().unwrap_or_else(|e| e.into_inner());
            while held.contains(&key) {
                held = self
                    .inner
                    .released
                    .wait(held)
                    .unwrap_or_else(|e| e.into_inner());
            }
            held.insert(key.clone());
        }

        let mut guard = PathLockGuard {
            inner: Arc::clone(&self.inner),
            path: key,
            file: None,
        };

        if let Some(dir) = &self.lock_dir {
            guard.file = acquire_file_lock(dir, path, create)?;
        }

        tracing::trace!(path = %path.display(), "Acquired path lock");
        Ok(guard)
    }
}

fn acquire_file_lock(dir: &Path, path: &Path, create: bool) -> Result<Option<File>> {
    let digest = checksum::hash_bytes(path.to_string_lossy().as_bytes());
    let lock_path = dir.join(format!("{}.lock", &digest[..16]));
    if create {
        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    } else if !lock_path.exists() {
        return Ok(None);
    }
    let file = OpenOptions::new()
        .write(true)
        .create(create)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| Error::io(&lock_path, e))?;
    file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;
    Ok(Some(file))
}

/// Exclusive hold on one path. Released on drop.
#[derive(Debug)]
pub struct PathLockGuard {
    inner: Arc<Inner>,
    path: PathBuf,
    file: Option<File>,
}

impl Drop for PathLockGuard {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
        let mut held = self.inner.held.lock().unwrap_or_else(|e| e.into_inner());
        held.remove(&self.path);
        self.inner.released.notify_all();
    }
}
