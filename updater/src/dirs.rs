//! Directory resolution abstraction for platform-specific paths.
//!
//! The tools directory defaults to `~/.toolup/bin`; resolving `~` goes
//! through [`BaseDirs`] so tests can substitute a temporary home.

use std::path::PathBuf;

/// Platform base directories consulted when resolving default paths.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// Return the current user's home directory, if known.
    fn home_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by `directories-next`.
///
/// # Examples
///
/// ```
/// use toolup_updater::dirs::{BaseDirs, SystemBaseDirs};
///
/// if let Some(dirs) = SystemBaseDirs::new() {
///     assert!(dirs.home_dir().is_some());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SystemBaseDirs {
    home: PathBuf,
}

impl SystemBaseDirs {
    /// Discover the current user's base directories.
    ///
    /// Returns `None` when no home directory can be determined.
    #[must_use]
    pub fn new() -> Option<Self> {
        directories_next::BaseDirs::new().map(|dirs| Self {
            home: dirs.home_dir().to_path_buf(),
        })
    }
}

impl BaseDirs for SystemBaseDirs {
    fn home_dir(&self) -> Option<PathBuf> {
        Some(self.home.clone())
    }
}

/// A [`BaseDirs`] that knows no directories.
///
/// Used when the platform cannot report a home directory, so that an
/// explicit `TOOLUP_HOME` still works.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBaseDirs;

impl BaseDirs for NoBaseDirs {
    fn home_dir(&self) -> Option<PathBuf> {
        None
    }
}
