//! Staged installation and atomic promotion of a verified artefact.
//!
//! Installation always extracts into a fresh `.staging-*` directory inside
//! the tools directory, so staging and the live tree share a filesystem and
//! promotion is a rename. Any failure before promotion drops the staging
//! directory and leaves the live tree untouched.
//!
//! Promotion differs by platform:
//!
//! - [`PromotionStrategy::DirectoryRename`] (Unix): the staged version
//!   directory is renamed into place in one step. A stale directory with the
//!   same name is first moved aside into a `.trash-*` directory and restored
//!   if the swap fails.
//! - [`PromotionStrategy::FileReplace`] (Windows): directories cannot be
//!   swapped while any file inside is open, so each staged file is renamed
//!   over its live counterpart, one file at a time. The directory lock held
//!   by the caller covers the window between files.

use crate::artefact::extraction::{ArtefactExtractor, ExtractionError};
use crate::artefact::version::ToolsVersion;
use crate::store::{STAGING_PREFIX, StoreError, TRASH_PREFIX, VersionStore};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Errors arising from installation.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// The archive could not be extracted.
    #[error("failed to extract {version}: {source}")]
    Extraction {
        /// The version being installed.
        version: String,
        /// The extraction failure.
        #[source]
        source: ExtractionError,
    },

    /// Extraction succeeded but tool binaries are missing from the result.
    #[error("version {version} is missing binaries after extraction: {}", missing.join(", "))]
    Incomplete {
        /// The version being installed.
        version: String,
        /// Paths of the missing binaries, relative to the version directory.
        missing: Vec<String>,
    },

    /// A filesystem operation failed.
    #[error("failed to {action} {path}: {source}")]
    Io {
        /// What was being attempted.
        action: &'static str,
        /// The path involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The version store could not be prepared.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for installation.
pub type Result<T> = std::result::Result<T, InstallError>;

/// How a staged version becomes visible in the tools directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionStrategy {
    /// Rename the whole staged version directory into place.
    DirectoryRename,
    /// Rename each staged file over its live counterpart.
    FileReplace,
}

impl PromotionStrategy {
    /// Return the strategy for the compilation target.
    #[must_use]
    pub fn for_host() -> Self {
        if cfg!(windows) {
            Self::FileReplace
        } else {
            Self::DirectoryRename
        }
    }
}

/// The result of an installation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The version was already complete; nothing was written.
    AlreadyInstalled,
    /// The version was extracted and promoted.
    Installed,
}

/// Installs verified artefacts into a [`VersionStore`].
///
/// The caller must hold the directory lock for the whole call.
pub struct Installer<'a> {
    store: &'a VersionStore,
    extractor: &'a dyn ArtefactExtractor,
    strategy: PromotionStrategy,
}

impl<'a> Installer<'a> {
    /// Create an installer using the host promotion strategy.
    #[must_use]
    pub fn new(store: &'a VersionStore, extractor: &'a dyn ArtefactExtractor) -> Self {
        Self::with_strategy(store, extractor, PromotionStrategy::for_host())
    }

    /// Create an installer using an explicit promotion strategy.
    #[must_use]
    pub fn with_strategy(
        store: &'a VersionStore,
        extractor: &'a dyn ArtefactExtractor,
        strategy: PromotionStrategy,
    ) -> Self {
        Self {
            store,
            extractor,
            strategy,
        }
    }

    /// Install `version` from the verified archive at `archive`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError`] when extraction, permission changes, or
    /// promotion fail. The live tools directory is unchanged on error.
    pub fn install(&self, archive: &Path, version: &ToolsVersion) -> Result<InstallOutcome> {
        if self.store.is_installed(version) {
            log::debug!("{version} is already installed");
            return Ok(InstallOutcome::AlreadyInstalled);
        }
        self.store.ensure_root()?;

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(self.store.root())
            .map_err(|source| io_error("create staging directory in", self.store.root(), source))?;
        let staged = staging.path().join(version.as_str());
        fs::create_dir(&staged).map_err(|source| io_error("create", &staged, source))?;

        self.extractor
            .extract(archive, &staged, &self.store.expected_entries())
            .map_err(|source| InstallError::Extraction {
                version: version.to_string(),
                source,
            })?;
        self.finalize_binaries(&staged, version)?;

        let live = self.store.version_dir(version).into_std_path_buf();
        match self.strategy {
            PromotionStrategy::DirectoryRename => self.promote_directory(&staged, &live)?,
            PromotionStrategy::FileReplace => promote_files(&staged, &live)?,
        }
        log::debug!("installed {version} into {}", live.display());
        Ok(InstallOutcome::Installed)
    }

    /// Check every tool binary exists in the staged tree and mark it
    /// executable.
    fn finalize_binaries(&self, staged: &Path, version: &ToolsVersion) -> Result<()> {
        let mut missing = Vec::new();
        for tool in self.store.tools() {
            let components = self.store.os().binary_components(tool);
            let binary: PathBuf = components.iter().fold(staged.to_path_buf(), |path, part| {
                path.join(part)
            });
            if binary.is_file() {
                make_executable(&binary)?;
            } else {
                missing.push(components.join("/"));
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(InstallError::Incomplete {
                version: version.to_string(),
                missing,
            })
        }
    }

    fn promote_directory(&self, staged: &Path, live: &Path) -> Result<()> {
        if !live.exists() {
            return fs::rename(staged, live).map_err(|source| io_error("promote", live, source));
        }

        let trash = tempfile::Builder::new()
            .prefix(TRASH_PREFIX)
            .tempdir_in(self.store.root())
            .map_err(|source| io_error("create trash directory in", self.store.root(), source))?;
        let aside = trash.path().join("previous");
        fs::rename(live, &aside).map_err(|source| io_error("move aside", live, source))?;

        if let Err(source) = fs::rename(staged, live) {
            if let Err(restore) = fs::rename(&aside, live) {
                log::warn!("could not restore {}: {restore}", live.display());
                // Keep the previous tree for the next sweep to find.
                let _kept = trash.keep();
            }
            return Err(io_error("promote", live, source));
        }
        Ok(())
    }
}

fn promote_files(staged: &Path, live: &Path) -> Result<()> {
    fs::create_dir_all(live).map_err(|source| io_error("create", live, source))?;
    let entries = fs::read_dir(staged).map_err(|source| io_error("read", staged, source))?;
    for entry in entries {
        let entry = entry.map_err(|source| io_error("read", staged, source))?;
        let source_path = entry.path();
        let target = live.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|source| io_error("inspect", &source_path, source))?;
        if file_type.is_dir() {
            promote_files(&source_path, &target)?;
        } else {
            // Rename replaces an existing file on every supported platform.
            fs::rename(&source_path, &target)
                .map_err(|source| io_error("replace", &target, source))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|source| io_error("set permissions on", path, source))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

fn io_error(action: &'static str, path: impl AsRef<Path>, source: io::Error) -> InstallError {
    InstallError::Io {
        action,
        path: path.as_ref().to_path_buf(),
        source,
    }
}

#[cfg(test)]
#[path = "installer_tests.rs"]
mod tests;
