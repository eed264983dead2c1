//! Installed-version store over the tools directory.
//!
//! The tools directory holds one subdirectory per installed version, the lock
//! file, and the `.current` marker naming the most recently installed
//! policy-required version. A version counts as installed only when every
//! managed tool binary is present in its directory.

use crate::artefact::target::Os;
use crate::artefact::version::ToolsVersion;
use crate::lock::{LOCK_FILE_NAME, lock_path};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::{self, Write};

/// Name of the marker file recording the current version.
pub const CURRENT_MARKER: &str = ".current";
/// Name prefix of staging directories created during installation.
pub const STAGING_PREFIX: &str = ".staging-";
/// Name prefix of directories moved aside during promotion.
pub const TRASH_PREFIX: &str = ".trash-";

/// Errors arising from version store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("{action} {path}: {source}")]
    Io {
        /// What was being attempted.
        action: &'static str,
        /// The path involved.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Result type for version store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Read and write access to the installed versions under a tools directory.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use toolup_updater::artefact::target::Os;
/// use toolup_updater::artefact::version::ToolsVersion;
/// use toolup_updater::store::VersionStore;
///
/// let store = VersionStore::new(
///     Utf8PathBuf::from("/home/alex/.toolup/bin"),
///     vec!["tsh".to_owned()],
///     Os::Darwin,
/// );
/// let version = ToolsVersion::parse("17.1.2").expect("valid version");
///
/// assert_eq!(
///     store.binary_path(&version, "tsh"),
///     "/home/alex/.toolup/bin/17.1.2/tsh.app/Contents/MacOS/tsh"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct VersionStore {
    root: Utf8PathBuf,
    tools: Vec<String>,
    os: Os,
}

impl VersionStore {
    /// Create a store rooted at the tools directory `root`.
    #[must_use]
    pub fn new(root: Utf8PathBuf, tools: Vec<String>, os: Os) -> Self {
        Self { root, tools, os }
    }

    /// Return the tools directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Return the managed tool names.
    #[must_use]
    pub fn tools(&self) -> &[String] {
        &self.tools
    }

    /// Return the operating system the layout follows.
    #[must_use]
    pub fn os(&self) -> Os {
        self.os
    }

    /// Return the lock file path.
    #[must_use]
    pub fn lock_path(&self) -> Utf8PathBuf {
        lock_path(&self.root)
    }

    /// Return the directory holding `version`.
    #[must_use]
    pub fn version_dir(&self, version: &ToolsVersion) -> Utf8PathBuf {
        self.root.join(version.as_str())
    }

    /// Return the archive entry names expected for one installed version.
    #[must_use]
    pub fn expected_entries(&self) -> Vec<String> {
        self.tools
            .iter()
            .map(|tool| self.os.entry_name(tool))
            .collect()
    }

    /// Return the executable path of `tool` within `version`.
    #[must_use]
    pub fn binary_path(&self, version: &ToolsVersion, tool: &str) -> Utf8PathBuf {
        let mut path = self.version_dir(version);
        for component in self.os.binary_components(tool) {
            path.push(component);
        }
        path
    }

    /// Return whether every managed tool binary of `version` is present.
    #[must_use]
    pub fn is_installed(&self, version: &ToolsVersion) -> bool {
        !self.tools.is_empty()
            && self
                .tools
                .iter()
                .all(|tool| self.binary_path(version, tool).is_file())
    }

    /// Read the `.current` marker.
    ///
    /// Returns `Ok(None)` when no marker exists. The raw trimmed contents are
    /// returned unvalidated; callers decide how to treat malformed markers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the marker exists but cannot be read.
    pub fn current(&self) -> Result<Option<String>> {
        let path = self.root.join(CURRENT_MARKER);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let trimmed = contents.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_owned()))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(io_error("read", path, source)),
        }
    }

    /// Atomically record `version` as current.
    ///
    /// The caller must hold the directory lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the marker cannot be written.
    pub fn set_current(&self, version: &ToolsVersion) -> Result<()> {
        let path = self.root.join(CURRENT_MARKER);
        let mut temp = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(&self.root)
            .map_err(|source| io_error("create temp marker in", self.root.clone(), source))?;
        writeln!(temp, "{version}")
            .map_err(|source| io_error("write", path.clone(), source))?;
        temp.persist(&path)
            .map_err(|err| io_error("replace", path.clone(), err.error))?;
        log::debug!("recorded {version} as current in {path}");
        Ok(())
    }

    /// Ensure the tools directory exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .map_err(|source| io_error("create", self.root.clone(), source))
    }

    /// Remove staging and trash entries left behind by crashed runs.
    ///
    /// The caller must hold the directory lock. Returns the number of
    /// entries removed; entries that cannot be removed are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the tools directory cannot be read.
    pub fn sweep_stale(&self) -> Result<usize> {
        let entries = fs::read_dir(&self.root)
            .map_err(|source| io_error("read", self.root.clone(), source))?;
        let mut removed = 0;
        for entry in entries.filter_map(std::result::Result::ok) {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name == LOCK_FILE_NAME
                || !(name.starts_with(STAGING_PREFIX) || name.starts_with(TRASH_PREFIX))
            {
                continue;
            }
            let path = entry.path();
            let outcome = match entry.file_type() {
                Ok(file_type) if file_type.is_dir() => fs::remove_dir_all(&path),
                Ok(_) => fs::remove_file(&path),
                Err(err) => Err(err),
            };
            match outcome {
                Ok(()) => {
                    log::debug!("removed stale {}", path.display());
                    removed += 1;
                }
                Err(err) => log::warn!("could not remove stale {}: {err}", path.display()),
            }
        }
        Ok(removed)
    }
}

fn io_error(action: &'static str, path: Utf8PathBuf, source: io::Error) -> StoreError {
    StoreError::Io {
        action,
        path,
        source,
    }
}
