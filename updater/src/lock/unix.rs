//! `flock`-based lock for Unix hosts.

use super::{LockError, Result};
use camino::Utf8Path;
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;

fn open(path: &Utf8Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .append(true)
        .mode(0o666)
        .open(path)
        .map_err(|source| LockError::Io {
            path: path.to_owned(),
            source,
        })
}

pub(super) fn lock(path: &Utf8Path) -> Result<File> {
    let file = open(path)?;
    FileExt::lock_exclusive(&file).map_err(|source| LockError::Io {
        path: path.to_owned(),
        source,
    })?;
    Ok(file)
}

pub(super) fn try_lock(path: &Utf8Path) -> Result<File> {
    let file = open(path)?;
    match FileExt::try_lock_exclusive(&file) {
        Ok(true) => Ok(file),
        Ok(false) => Err(LockError::Locked {
            path: path.to_owned(),
        }),
        Err(source) => Err(LockError::Io {
            path: path.to_owned(),
            source,
        }),
    }
}

pub(super) fn unlock(file: &File, path: &Utf8Path) {
    if let Err(err) = FileExt::unlock(file) {
        // Closing the handle releases the lock regardless.
        log::debug!("failed to unlock {path}: {err}");
    }
}
