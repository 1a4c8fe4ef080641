//! Single-instance lock.
//!
//! Cycles must never overlap, whether started by the daemon loop or by an
//! external timer. An exclusive OS-level lock (via fs2) on a lock file
//! guarantees at most one controller process at a time; it is released when
//! the guard is dropped or the process exits.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors acquiring the run lock.
#[derive(Error, Debug)]
pub enum LockError {
    /// Another controller holds the lock.
    #[error("another costgate instance is running (lock: {})", .0.display())]
    AlreadyRunning(PathBuf),

    #[error("lock I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Held run lock; released on drop.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Try to take the lock without blocking.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                // Holder pid, for operators inspecting a stuck lock
                file.set_len(0)?;
                file.seek(SeekFrom::Start(0))?;
                writeln!(file, "{}", std::process::id())?;

                tracing::debug!(lock_path = %path.display(), "Acquired run lock");
                Ok(Self {
                    file,
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(LockError::AlreadyRunning(path.to_path_buf()))
            }
            Err(e) => Err(LockError::Io(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
