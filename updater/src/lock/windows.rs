//! Share-mode lock for Windows hosts.

use super::{LockError, Result};
use camino::Utf8Path;
use std::fs::{File, OpenOptions};
use std::os::windows::fs::OpenOptionsExt;
use std::os::windows::io::AsRawHandle;
use windows_sys::Win32::Foundation::{
    ERROR_SHARING_VIOLATION, HANDLE_FLAG_INHERIT, SetHandleInformation,
};

pub(super) fn lock(path: &Utf8Path) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(true)
        .share_mode(0)
        .open(path)
        .map_err(|source| {
            if is_sharing_violation(&source) {
                LockError::Locked {
                    path: path.to_owned(),
                }
            } else {
                LockError::Io {
                    path: path.to_owned(),
                    source,
                }
            }
        })?;
    mark_inheritable(&file, path);
    Ok(file)
}

pub(super) fn try_lock(path: &Utf8Path) -> Result<File> {
    lock(path)
}

pub(super) fn unlock(_file: &File, _path: &Utf8Path) {
    // Closing the handle when the guard drops the file releases the lock.
}

fn is_sharing_violation(err: &std::io::Error) -> bool {
    err.raw_os_error()
        .and_then(|code| u32::try_from(code).ok())
        .is_some_and(|code| code == ERROR_SHARING_VIOLATION)
}

fn mark_inheritable(file: &File, path: &Utf8Path) {
    // SAFETY: the handle is owned by `file` and stays open for the call.
    let ok = unsafe {
        SetHandleInformation(file.as_raw_handle(), HANDLE_FLAG_INHERIT, HANDLE_FLAG_INHERIT)
    };
    if ok == 0 {
        log::debug!(
            "failed to mark lock handle inheritable for {path}: {}",
            std::io::Error::last_os_error()
        );
    }
}
