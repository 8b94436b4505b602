//! Advisory lockfile for manifest writers.
//!
//! Readers never lock. A writer takes an exclusive lock on
//! `<manifest>.lock`, stamps it with its pid and a local timestamp, and
//! releases on drop.

use crate::Result;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

fn current_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Exclusive advisory file lock. Lock content is
/// `pid=<pid> ts=<iso8601-local>\n`, for humans diagnosing a stuck writer.
#[derive(Debug)]
pub struct Lockfile {
    path: PathBuf,
    file: Option<File>,
}

impl Lockfile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), file: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_locked(&self) -> bool {
        self.file.is_some()
    }

    /// Acquire the lock, blocking until it is available.
    pub fn lock(&mut self) -> Result<()> {
        let file = self.open()?;
        file.lock_exclusive()?;
        self.stamp(file)
    }

    /// Try to acquire the lock without blocking. Returns false when
    /// another process (or handle) holds it.
    pub fn try_lock(&mut self) -> Result<bool> {
        let file = self.open()?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                self.stamp(file)?;
                Ok(true)
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn open(&self) -> Result<File> {
        Ok(OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?)
    }

    fn stamp(&mut self, mut file: File) -> Result<()> {
        let info = format!("pid={} ts={}\n", std::process::id(), current_timestamp());
        file.write_all(info.as_bytes())?;
        file.sync_all()?;
        self.file = Some(file);
        Ok(())
    }

    /// Release the lock. Safe to call when not held.
    pub fn unlock(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(err) = fs2::FileExt::unlock(&file) {
                log::error!("error unlocking '{}': {}", self.path.display(), err);
            }
        }
    }
}

impl Drop for Lockfile {
    fn drop(&mut self) {
        self.unlock();
    }
}
