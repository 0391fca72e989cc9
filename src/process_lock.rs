/// Process Lock Module
///
/// Prevents multiple instances of the engine from running simultaneously
/// using file-based locking, backing the single-instance guard required by
/// the concurrency model (two processes binding the same Store file would
/// violate the single-writer invariant).
///
/// **Implementation:**
/// - Uses fslock for advisory file locking (cross-platform)
/// - RAII pattern: lock held for the process lifetime, released on drop
/// - OS automatically releases the lock if the process crashes (no stale locks)
///
/// **Usage:**
/// ```ignore
/// let _lock = ProcessLock::acquire()?;
/// // Lock held until _lock is dropped (end of scope)
/// ```
use crate::logger::{self, LogTag};
use fslock::LockFile;
use std::path::PathBuf;

/// Process lock guard - holds the file lock for the engine's lifetime.
pub struct ProcessLock {
    _lock: LockFile,
    lock_path: PathBuf,
}

impl ProcessLock {
    /// Acquire the process lock.
    ///
    /// Returns an error if another instance is already running or the lock
    /// file cannot be created.
    pub fn acquire() -> Result<Self, String> {
        let lock_path = crate::paths::get_process_lock_path();

        logger::info(
            LogTag::System,
            &format!("Acquiring process lock: {:?}", lock_path),
        );

        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create lock file directory: {}", e))?;
            }
        }

        let mut lock = LockFile::open(&lock_path).map_err(|e| {
            format!(
                "Failed to open lock file {:?}: {}\nHint: check directory permissions for the data folder",
                lock_path, e
            )
        })?;

        if !lock
            .try_lock()
            .map_err(|e| format!("Failed to acquire lock on {:?}: {}", lock_path, e))?
        {
            return Err(format!(
                "Another instance is already running.\n\
                 \n\
                 The process lock file is held by another process:\n\
                   Lock file: {:?}\n\
                 \n\
                 If no other instance is actually running, the lock may be stale.\n\
                 In that case, manually remove: rm {:?}",
                lock_path, lock_path
            ));
        }

        logger::info(
            LogTag::System,
            &format!("Process lock acquired: {:?}", lock_path),
        );

        Ok(Self {
            _lock: lock,
            lock_path,
        })
    }

    pub fn lock_path(&self) -> &PathBuf {
        &self.lock_path
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        logger::info(
            LogTag::System,
            &format!("Releasing process lock: {:?}", self.lock_path),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prevents_duplicate_acquisition() {
        let lock1 = ProcessLock::acquire();
        assert!(lock1.is_ok(), "first lock should succeed");

        let lock2 = ProcessLock::acquire();
        assert!(lock2.is_err(), "second lock should fail");
        assert!(lock2
            .unwrap_err()
            .contains("already running"));

        drop(lock1);

        let lock3 = ProcessLock::acquire();
        assert!(lock3.is_ok(), "lock should succeed after first is dropped");
    }
}
