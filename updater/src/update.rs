//! Update orchestration.
//!
//! [`Updater::prepare`] runs the whole flow for one invocation: resolve the
//! required version, reuse it if already installed, otherwise take the tools
//! directory lock, download, verify, install, and record it as current. The
//! caller then either keeps running or hands over to the returned binary.

use crate::artefact::download::ArtefactFetcher;
use crate::artefact::extraction::ArtefactExtractor;
use crate::artefact::naming::ArtefactName;
use crate::artefact::version::ToolsVersion;
use crate::config::Config;
use crate::downloader::Downloader;
use crate::error::Result;
use crate::installer::{InstallOutcome, Installer};
use crate::lock::{self, DirectoryLock};
use crate::output::{updating_message, write_stderr_line};
use crate::resolver::{Resolution, VersionResolver};
use crate::store::{STAGING_PREFIX, VersionStore};
use camino::Utf8PathBuf;
use std::io::Write;

/// What the invoking process should do after [`Updater::prepare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateDecision {
    /// The running binary satisfies policy; continue as usual.
    RunCurrent,
    /// Hand over to `binary`, which belongs to `version`.
    Reexec {
        /// The required version.
        version: ToolsVersion,
        /// The executable to launch.
        binary: Utf8PathBuf,
    },
}

/// Coordinates resolution, locking, download, and installation.
pub struct Updater<'a> {
    config: &'a Config,
    store: VersionStore,
    fetcher: &'a dyn ArtefactFetcher,
    extractor: &'a dyn ArtefactExtractor,
}

impl<'a> Updater<'a> {
    /// Create an updater for `config` using the given network and archive
    /// collaborators.
    #[must_use]
    pub fn new(
        config: &'a Config,
        fetcher: &'a dyn ArtefactFetcher,
        extractor: &'a dyn ArtefactExtractor,
    ) -> Self {
        let store = VersionStore::new(
            config.tools_dir().clone(),
            config.tools().to_vec(),
            config.platform().os(),
        );
        Self {
            config,
            store,
            fetcher,
            extractor,
        }
    }

    /// Return the version store this updater manages.
    #[must_use]
    pub fn store(&self) -> &VersionStore {
        &self.store
    }

    /// Resolve the required version without touching the lock or network.
    ///
    /// Configuration problems fail open: a malformed pin or an unreadable
    /// marker is logged and the running binary is kept.
    #[must_use]
    pub fn check_local(&self) -> Resolution {
        let cached = match self.store.current() {
            Ok(cached) => cached,
            Err(err) => {
                log::warn!("ignoring cached tools version: {err}");
                None
            }
        };
        let resolver = VersionResolver::new(
            self.config.running_version(),
            self.config.pinned_version(),
            cached.as_deref(),
        );
        match resolver.resolve() {
            Ok(resolution) => resolution,
            Err(err) => {
                log::warn!("{err}; continuing with the running version");
                Resolution::run_current()
            }
        }
    }

    /// Decide how the invocation of `tool` should proceed, installing the
    /// required version first when it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error only when a different version is required, it is not
    /// installed, and it could not be installed.
    pub fn prepare(&self, tool: &str, stderr: &mut dyn Write) -> Result<UpdateDecision> {
        if !self.config.tools().iter().any(|managed| managed == tool) {
            log::debug!("{tool} is not a managed tool; skipping update");
            return Ok(UpdateDecision::RunCurrent);
        }
        let resolution = self.check_local();
        let Some(version) = resolution.required.filter(|_| resolution.needs_reexec) else {
            return Ok(UpdateDecision::RunCurrent);
        };

        if !self.store.is_installed(&version) {
            write_stderr_line(stderr, updating_message(&version));
            if let Err(err) = self.ensure_installed(&version) {
                if !self.store.is_installed(&version) {
                    return Err(err);
                }
                log::warn!("update failed but {version} is installed: {err}");
            }
        }

        let binary = self.store.binary_path(&version, tool);
        Ok(UpdateDecision::Reexec { version, binary })
    }

    /// Install `version` under the directory lock unless it is already
    /// installed.
    ///
    /// The installed check is repeated after the lock is taken, so that
    /// concurrent invocations download at most once.
    ///
    /// # Errors
    ///
    /// Returns an error when the lock cannot be taken or the download,
    /// verification, or installation fails.
    pub fn ensure_installed(&self, version: &ToolsVersion) -> Result<InstallOutcome> {
        self.store.ensure_root()?;
        let _lock = self.lock()?;
        if self.store.is_installed(version) {
            log::debug!("{version} was installed while waiting for the lock");
            return Ok(InstallOutcome::AlreadyInstalled);
        }
        match self.store.sweep_stale() {
            Ok(0) => {}
            Ok(removed) => log::debug!("swept {removed} stale directories"),
            Err(err) => log::warn!("could not sweep stale directories: {err}"),
        }

        let artefact = ArtefactName::new(
            self.config.product(),
            version.clone(),
            self.config.platform(),
        );
        let download_dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(self.store.root())
            .map_err(|source| crate::installer::InstallError::Io {
                action: "create download directory in",
                path: self.store.root().as_std_path().to_path_buf(),
                source,
            })?;
        let archive = download_dir.path().join(artefact.filename());
        Downloader::new(self.fetcher).fetch(&artefact, &archive)?;

        let outcome = Installer::new(&self.store, self.extractor).install(&archive, version)?;
        self.store.set_current(version)?;
        Ok(outcome)
    }

    fn lock(&self) -> Result<DirectoryLock> {
        let root = self.store.root();
        let guard = match self.config.lock_timeout() {
            None if cfg!(unix) => lock::acquire(root)?,
            timeout => lock::acquire_with_timeout(root, timeout)?,
        };
        Ok(guard)
    }
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;
