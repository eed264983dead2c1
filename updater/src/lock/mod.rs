//! Cross-process exclusive lock over the tools directory.
//!
//! Exactly one process at a time may mutate the tools directory. The lock is
//! an OS-level lock tied to an open handle on `<tools_dir>/.lock`: it is
//! released when the [`DirectoryLock`] guard is dropped, or by the OS when the
//! holding process dies. The lock file itself is never deleted, so every
//! process always contends on the same inode.
//!
//! Two platform variants share this contract:
//!
//! - Unix: an advisory `flock` taken through `fs4`. [`acquire`] blocks until
//!   the lock is free.
//! - Windows: the file is opened with a share mode that denies every other
//!   opener. Contention surfaces as a sharing violation, which is reported as
//!   [`LockError::Locked`] by both [`acquire`] and [`try_acquire`]; callers
//!   that need to wait poll instead.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as platform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as platform;

/// Name of the lock file inside the tools directory.
pub const LOCK_FILE_NAME: &str = ".lock";

/// Interval between attempts while waiting for a contended lock.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors arising from lock acquisition.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another process holds the lock.
    #[error("tools directory is locked by another process: {path}")]
    Locked {
        /// The lock file path.
        path: Utf8PathBuf,
    },

    /// Waiting for the lock exceeded the configured bound.
    #[error("timed out after {waited:?} waiting for lock {path}")]
    TimedOut {
        /// The lock file path.
        path: Utf8PathBuf,
        /// How long the caller waited.
        waited: Duration,
    },

    /// The lock file could not be opened or locked.
    #[error("failed to lock {path}: {source}")]
    Io {
        /// The lock file path.
        path: Utf8PathBuf,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },
}

/// Result type for lock operations.
pub type Result<T> = std::result::Result<T, LockError>;

/// A held exclusive lock over a tools directory.
///
/// Dropping the guard releases the lock.
#[derive(Debug)]
pub struct DirectoryLock {
    file: Option<File>,
    path: Utf8PathBuf,
}

impl DirectoryLock {
    /// Return the path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Release the lock explicitly.
    ///
    /// Equivalent to dropping the guard.
    pub fn release(mut self) {
        self.unlock();
    }

    fn unlock(&mut self) {
        if let Some(file) = self.file.take() {
            platform::unlock(&file, &self.path);
            log::debug!("released lock {}", self.path);
        }
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        self.unlock();
    }
}

/// Return the lock file path for `dir`.
#[must_use]
pub fn lock_path(dir: &Utf8Path) -> Utf8PathBuf {
    dir.join(LOCK_FILE_NAME)
}

/// Acquire the exclusive lock over `dir`, creating the lock file if needed.
///
/// On Unix this blocks until the lock is available. On Windows a contended
/// lock fails immediately with [`LockError::Locked`].
///
/// # Errors
///
/// Returns [`LockError::Io`] if the lock file cannot be opened or locked, and
/// [`LockError::Locked`] on Windows when another process holds it.
pub fn acquire(dir: &Utf8Path) -> Result<DirectoryLock> {
    let path = lock_path(dir);
    let file = platform::lock(&path)?;
    log::debug!("acquired lock {path}");
    Ok(DirectoryLock {
        file: Some(file),
        path,
    })
}

/// Attempt to acquire the exclusive lock over `dir` without blocking.
///
/// # Errors
///
/// Returns [`LockError::Locked`] if another holder has the lock, and
/// [`LockError::Io`] on any other failure.
pub fn try_acquire(dir: &Utf8Path) -> Result<DirectoryLock> {
    let path = lock_path(dir);
    let file = platform::try_lock(&path)?;
    log::debug!("acquired lock {path}");
    Ok(DirectoryLock {
        file: Some(file),
        path,
    })
}

/// Acquire the lock over `dir`, polling until it is free or `timeout`
/// elapses. A `timeout` of `None` waits indefinitely.
///
/// # Errors
///
/// Returns [`LockError::TimedOut`] when the bound is exceeded and
/// [`LockError::Io`] on any failure other than contention.
pub fn acquire_with_timeout(dir: &Utf8Path, timeout: Option<Duration>) -> Result<DirectoryLock> {
    let started = Instant::now();
    loop {
        match try_acquire(dir) {
            Err(LockError::Locked { path }) => {
                let waited = started.elapsed();
                if timeout.is_some_and(|bound| waited >= bound) {
                    return Err(LockError::TimedOut { path, waited });
                }
                log::debug!("lock {path} is busy; waiting");
                thread::sleep(POLL_INTERVAL);
            }
            other => return other,
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
