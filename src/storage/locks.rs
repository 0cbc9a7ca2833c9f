//! Per-path coordination
//!
//! Readers (GET) share a path; writers (PUT, DEL) hold it exclusively.
//! Different files never block each other. Paths are keyed by the file
//! they name, so `x/../a.txt` and `a.txt` share one lock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Registry of one `RwLock` per resolved path.
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<RwLock<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared access; waits for any writer on the same path.
    pub async fn read(&self, path: &Path) -> OwnedRwLockReadGuard<()> {
        self.entry(path).await.read_owned().await
    }

    /// Exclusive access; waits for readers and writers on the same path.
    pub async fn write(&self, path: &Path) -> OwnedRwLockWriteGuard<()> {
        self.entry(path).await.write_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }

    async fn entry(&self, path: &Path) -> Arc<RwLock<()>> {
        let key = lock_key(path).await;
        let mut locks = self.locks.lock().await;
        // Entries only referenced by the map are idle.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(key).or_default())
    }
}

/// The canonical path of the file, or of its parent joined with the file
/// name when the file does not exist yet.
async fn lock_key(path: &Path) -> PathBuf {
    if let Ok(real) = fs::canonicalize(path).await {
        return real;
    }

    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => match fs::canonicalize(parent).await {
            Ok(real_parent) => real_parent.join(name),
            Err(_) => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}
