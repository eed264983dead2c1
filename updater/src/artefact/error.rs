//! Error types for versions, platforms, and published digests.
//!
//! Each variant provides a descriptive message identifying the invalid input
//! and the constraint that was violated.

use thiserror::Error;

/// Errors arising from invalid artefact-related values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtefactError {
    /// A version string is empty or is not a semantic version.
    #[error("invalid tools version \"{value}\": {reason}")]
    InvalidVersion {
        /// The rejected version string.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// The host operating system or architecture has no published artefact.
    #[error("unsupported platform {os}/{arch}")]
    UnsupportedPlatform {
        /// The operating system name as reported by the standard library.
        os: String,
        /// The architecture name as reported by the standard library.
        arch: String,
    },

    /// A SHA-256 digest is not a valid 64-character hex string.
    #[error("invalid SHA-256 digest: {reason}")]
    InvalidSha256Digest {
        /// Description of the validation failure.
        reason: String,
    },
}

/// Result type alias using [`ArtefactError`].
pub type Result<T> = std::result::Result<T, ArtefactError>;
