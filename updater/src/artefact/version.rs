//! Client-tool version newtype.
//!
//! Versions are semantic versions such as `17.1.2`; a leading `v` is accepted
//! and stripped. Only equality is ever used: policy either pins an exact
//! version or pins nothing.

use super::error::{ArtefactError, Result};
use std::fmt;

/// A validated client-tool version.
///
/// # Examples
///
/// ```
/// use toolup_updater::artefact::version::ToolsVersion;
///
/// let version = ToolsVersion::parse("v17.1.2").expect("valid version");
/// assert_eq!(version.as_str(), "17.1.2");
/// assert!(version.matches("17.1.2"));
/// assert!(!version.matches("16.1.1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolsVersion {
    raw: String,
    parsed: semver::Version,
}

impl ToolsVersion {
    /// Parse and validate a version string.
    ///
    /// # Errors
    ///
    /// Returns [`ArtefactError::InvalidVersion`] when the value is empty or is
    /// not a semantic version.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let stripped = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if stripped.is_empty() {
            return Err(ArtefactError::InvalidVersion {
                value: value.to_owned(),
                reason: "version is empty".to_owned(),
            });
        }
        let parsed =
            semver::Version::parse(stripped).map_err(|e| ArtefactError::InvalidVersion {
                value: value.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            raw: stripped.to_owned(),
            parsed,
        })
    }

    /// Return the normalized version string (no `v` prefix).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Return whether `other` names this exact version.
    ///
    /// `other` is typically the running binary's embedded version, which may
    /// not be a semantic version at all (for example `development`); such
    /// values never match.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        Self::parse(other).is_ok_and(|candidate| candidate.parsed == self.parsed)
    }
}

impl fmt::Display for ToolsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
