//! Directory run lock
//!
//! Overlapping runs against the same directory are excluded by an advisory
//! lock on `.wardsync.lock`. The kernel drops the lock when the holding
//! process exits, so a crashed run leaves at most an unlocked file behind.

use crate::domain::errors::IngestError;
use crate::domain::{Result, WardsyncError};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

/// Name of the lock file inside the input directory
pub const LOCK_FILE_NAME: &str = ".wardsync.lock";

/// Held for the duration of one ingest run
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    file: File,
}

impl RunLock {
    /// Take the lock of `directory`
    ///
    /// A lock file left by a previous run is reused when no live process
    /// holds it.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::LockHeld` if another process holds the lock.
    pub fn acquire(directory: &Path) -> Result<Self> {
        let path = directory.join(LOCK_FILE_NAME);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                WardsyncError::Io(format!("Failed to open lock file {}: {e}", path.display()))
            })?;

        if file.try_lock_exclusive().is_err() {
            return Err(IngestError::LockHeld(path).into());
        }

        if let Err(e) = record_owner(&mut file) {
            tracing::debug!(lock = %path.display(), error = %e, "Could not record lock owner");
        }

        tracing::debug!(lock = %path.display(), "Acquired run lock");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn record_owner(file: &mut File) -> std::io::Result<()> {
    file.set_len(0)?;
    file.rewind()?;
    writeln!(file, "{}", std::process::id())
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(lock = %self.path.display(), error = %e, "Failed to release run lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let dir = TempDir::new().unwrap();
        let lock = RunLock::acquire(dir.path()).unwrap();
        assert!(lock.path().exists());

        let err = RunLock::acquire(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            WardsyncError::Ingest(IngestError::LockHeld(_))
        ));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = TempDir::new().unwrap();
        drop(RunLock::acquire(dir.path()).unwrap());
        assert!(RunLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn test_leftover_lock_file_from_dead_run_is_reused() {
        let dir = TempDir::new().unwrap();
        // A killed run leaves its file but not its kernel lock
        std::fs::write(dir.path().join(LOCK_FILE_NAME), "999999\n").unwrap();

        let lock = RunLock::acquire(dir.path()).unwrap();
        let owner = std::fs::read_to_string(lock.path()).unwrap();
        assert_eq!(owner.trim(), std::process::id().to_string());
    }
}
