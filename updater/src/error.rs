//! Error types for the update engine.
//!
//! Each component reports its own error enum; [`UpdateError`] folds them
//! together for the orchestrator and the binary. [`UpdateError::category`]
//! maps every failure onto the engine's error taxonomy, which decides
//! whether the caller may fail open.

use crate::artefact::error::ArtefactError;
use crate::config::ConfigError;
use crate::downloader::FetchError;
use crate::installer::InstallError;
use crate::lock::LockError;
use crate::reexec::ReexecError;
use crate::resolver::ResolveError;
use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

/// Broad classes of update failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or missing configuration; the caller fails open.
    Configuration,
    /// The tools directory lock could not be taken.
    Lock,
    /// A request to the artefact server failed.
    Network,
    /// A downloaded artefact failed verification and was discarded.
    Integrity,
    /// Extraction or promotion failed; the previous install is preserved.
    Install,
    /// The resolved binary could not be launched.
    Launch,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Lock => "lock",
            Self::Network => "network",
            Self::Integrity => "integrity",
            Self::Install => "install",
            Self::Launch => "launch",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while updating or launching client tools.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The configuration could not be built.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An artefact-domain value was invalid.
    #[error(transparent)]
    Artefact(#[from] ArtefactError),

    /// The required version could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The tools directory lock could not be taken.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Downloading or verifying the artefact failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Installing the artefact failed.
    #[error(transparent)]
    Install(#[from] InstallError),

    /// The version store could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The resolved binary could not be launched.
    #[error(transparent)]
    Reexec(#[from] ReexecError),
}

impl UpdateError {
    /// Return the taxonomy class of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use toolup_updater::error::{ErrorCategory, UpdateError};
    /// use toolup_updater::reexec::ReexecError;
    ///
    /// let err = UpdateError::from(ReexecError::NotFound { path: "tsh".into() });
    /// assert_eq!(err.category(), ErrorCategory::Launch);
    /// ```
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::Artefact(_) | Self::Resolve(_) => ErrorCategory::Configuration,
            Self::Lock(_) => ErrorCategory::Lock,
            Self::Fetch(FetchError::Transport(_)) => ErrorCategory::Network,
            Self::Fetch(FetchError::InvalidChecksum { .. } | FetchError::ChecksumMismatch { .. }) => {
                ErrorCategory::Integrity
            }
            Self::Fetch(FetchError::Io { .. }) | Self::Install(_) | Self::Store(_) => {
                ErrorCategory::Install
            }
            Self::Reexec(_) => ErrorCategory::Launch,
        }
    }
}

/// Result type alias using [`UpdateError`].
pub type Result<T> = std::result::Result<T, UpdateError>;
