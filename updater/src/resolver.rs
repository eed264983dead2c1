//! Required-version resolution at process start.
//!
//! Policy is an explicit pin (`TOOLUP_TOOLS_VERSION`) or, failing that, the
//! locally cached `.current` marker. The running binary needs to re-exec only
//! when a required version exists and differs from its own.

use crate::artefact::error::ArtefactError;
use crate::artefact::version::ToolsVersion;

/// Errors arising from version resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The version pin is not a valid version.
    #[error("invalid version pin: {0}")]
    InvalidPin(#[source] ArtefactError),
}

/// Result type for version resolution.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// The outcome of version resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The version policy requires, if any.
    pub required: Option<ToolsVersion>,
    /// Whether the running binary must hand over to `required`.
    pub needs_reexec: bool,
}

impl Resolution {
    /// A resolution that keeps the running binary.
    #[must_use]
    pub fn run_current() -> Self {
        Self {
            required: None,
            needs_reexec: false,
        }
    }
}

/// Decides whether the running binary satisfies version policy.
///
/// # Examples
///
/// ```
/// use toolup_updater::resolver::VersionResolver;
///
/// let resolution = VersionResolver::new("16.1.1", Some("17.1.2"), None)
///     .resolve()
///     .expect("valid pin");
///
/// assert!(resolution.needs_reexec);
/// assert_eq!(
///     resolution.required.map(|v| v.to_string()).as_deref(),
///     Some("17.1.2")
/// );
/// ```
#[derive(Debug, Clone)]
pub struct VersionResolver<'a> {
    running: &'a str,
    pinned: Option<&'a str>,
    cached: Option<&'a str>,
}

impl<'a> VersionResolver<'a> {
    /// Create a resolver from the running version, the optional pin, and
    /// the optional cached marker contents.
    #[must_use]
    pub fn new(running: &'a str, pinned: Option<&'a str>, cached: Option<&'a str>) -> Self {
        Self {
            running,
            pinned: pinned.filter(|value| !value.trim().is_empty()),
            cached: cached.filter(|value| !value.trim().is_empty()),
        }
    }

    /// Resolve the required version.
    ///
    /// The pin takes precedence over the cached marker. A malformed marker is
    /// ignored with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidPin`] when the pin is malformed; callers
    /// are expected to fail open and keep the running binary.
    pub fn resolve(&self) -> Result<Resolution> {
        let required = match (self.pinned, self.cached) {
            (Some(pin), _) => Some(ToolsVersion::parse(pin).map_err(ResolveError::InvalidPin)?),
            (None, Some(cached)) => match ToolsVersion::parse(cached) {
                Ok(version) => Some(version),
                Err(err) => {
                    log::warn!("ignoring cached tools version: {err}");
                    None
                }
            },
            (None, None) => None,
        };

        let Some(required) = required else {
            return Ok(Resolution::run_current());
        };
        let needs_reexec = !required.matches(self.running);
        log::debug!(
            "required tools version {required}, running {}, re-exec: {needs_reexec}",
            self.running
        );
        Ok(Resolution {
            required: Some(required),
            needs_reexec,
        })
    }
}
