use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Exclusive access to one mirror directory, released on drop.
#[derive(Debug)]
pub struct MirrorLease {
    workdir: PathBuf,
    _guard: OwnedMutexGuard<()>,
}

impl MirrorLease {
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

/// Per-mirror locks plus the set of mirrors that must be rebuilt.
///
/// Every sequence of git operations on a mirror runs under its lease, so
/// concurrent requests for the same `(url, branch)` are serialized while
/// requests for different mirrors proceed in parallel.
#[derive(Debug, Default)]
pub struct MirrorRegistry {
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
    suspects: Mutex<HashSet<PathBuf>>,
}

impl MirrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `workdir`.
    pub async fn lease(&self, workdir: &Path) -> MirrorLease {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody holds or waits on.
            locks.retain(|path, lock| path == workdir || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(workdir.to_path_buf()).or_default())
        };
        let guard = lock.lock_owned().await;
        MirrorLease { workdir: workdir.to_path_buf(), _guard: guard }
    }

    /// Flag the mirror for rebuilding on its next use.
    pub fn mark_suspect(&self, workdir: &Path) {
        tracing::warn!(workdir = %workdir.display(), "mirror marked suspect");
        self.suspects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(workdir.to_path_buf());
    }

    /// Clear the flag, returning whether it was set.
    pub fn take_suspect(&self, workdir: &Path) -> bool {
        self.suspects.lock().unwrap_or_else(PoisonError::into_inner).remove(workdir)
    }

    pub fn is_suspect(&self, workdir: &Path) -> bool {
        self.suspects.lock().unwrap_or_else(PoisonError::into_inner).contains(workdir)
    }

    /// Number of lock entries currently tracked.
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
