//! Update engine configuration.
//!
//! Every path, URL, and policy input the engine consults is carried in a
//! [`Config`] value built once at process start by [`Config::from_env`]. The
//! environment and the user's home directory are read through the
//! [`EnvSource`] and [`BaseDirs`] seams so tests can inject both.

use crate::artefact::error::ArtefactError;
use crate::artefact::naming::DEFAULT_PRODUCT;
use crate::artefact::target::Platform;
use crate::dirs::BaseDirs;
use camino::Utf8PathBuf;
use std::time::Duration;

/// Environment variable pinning the required client-tool version.
pub const TOOLS_VERSION_ENV: &str = "TOOLUP_TOOLS_VERSION";
/// Environment variable overriding the toolup home directory.
pub const HOME_ENV: &str = "TOOLUP_HOME";
/// Environment variable overriding the artefact base URL.
pub const CDN_BASE_URL_ENV: &str = "TOOLUP_CDN_BASE_URL";
/// Environment variable bounding the lock wait, in seconds.
pub const LOCK_TIMEOUT_ENV: &str = "TOOLUP_LOCK_TIMEOUT";
/// Environment variable setting the HTTP transport timeout, in seconds.
pub const DOWNLOAD_TIMEOUT_ENV: &str = "TOOLUP_DOWNLOAD_TIMEOUT";

/// Default artefact base URL.
pub const DEFAULT_CDN_BASE_URL: &str = "https://cdn.toolup.dev";
/// Default HTTP transport timeout.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);
/// Name of the home directory created under the user's home.
const DEFAULT_HOME_DIR: &str = ".toolup";
/// Client tools managed by default.
const DEFAULT_TOOLS: [&str; 2] = ["tsh", "tctl"];

/// Source of environment variables.
#[cfg_attr(test, mockall::automock)]
pub trait EnvSource {
    /// Return the value of `key`, or `None` if unset or not valid Unicode.
    fn var(&self, key: &str) -> Option<String>;
}

/// [`EnvSource`] reading the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl EnvSource for SystemEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Errors arising while building a [`Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Neither `TOOLUP_HOME` nor a user home directory is available.
    #[error("cannot determine the tools directory: set {HOME_ENV}")]
    NoHomeDirectory,

    /// A configured path is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },

    /// A duration variable does not hold a whole number of seconds.
    #[error("{var} must be a whole number of seconds, got {value:?}")]
    InvalidDuration {
        /// The environment variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The host platform has no published artefacts.
    #[error(transparent)]
    Platform(#[from] ArtefactError),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Resolved configuration for one process invocation.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use toolup_updater::artefact::target::Platform;
/// use toolup_updater::config::Config;
///
/// let platform = Platform::from_std("linux", "x86_64").expect("supported");
/// let config = Config::new(Utf8PathBuf::from("/tmp/toolup/bin"), platform, "16.1.1")
///     .with_pinned_version(Some("17.1.2"));
///
/// assert_eq!(config.pinned_version(), Some("17.1.2"));
/// assert_eq!(config.tools(), ["tsh", "tctl"]);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    tools_dir: Utf8PathBuf,
    base_url: String,
    product: String,
    tools: Vec<String>,
    platform: Platform,
    running_version: String,
    pinned_version: Option<String>,
    lock_timeout: Option<Duration>,
    download_timeout: Duration,
}

impl Config {
    /// Create a configuration with defaults for everything but the tools
    /// directory, platform, and running version.
    #[must_use]
    pub fn new(tools_dir: Utf8PathBuf, platform: Platform, running_version: &str) -> Self {
        Self {
            tools_dir,
            base_url: DEFAULT_CDN_BASE_URL.to_owned(),
            product: DEFAULT_PRODUCT.to_owned(),
            tools: DEFAULT_TOOLS.iter().map(|tool| (*tool).to_owned()).collect(),
            platform,
            running_version: running_version.to_owned(),
            pinned_version: None,
            lock_timeout: None,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }

    /// Build the configuration from the environment and base directories.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when no tools directory can be determined,
    /// a duration variable is malformed, or the host platform is unsupported.
    pub fn from_env(
        env: &dyn EnvSource,
        dirs: &dyn BaseDirs,
        running_version: &str,
    ) -> Result<Self> {
        let tools_dir = tools_dir(env, dirs)?;
        let platform = Platform::host()?;
        let base_url = non_empty(env.var(CDN_BASE_URL_ENV))
            .unwrap_or_else(|| DEFAULT_CDN_BASE_URL.to_owned());
        let lock_timeout = seconds(env, LOCK_TIMEOUT_ENV)?;
        let download_timeout =
            seconds(env, DOWNLOAD_TIMEOUT_ENV)?.unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT);

        Ok(Self::new(tools_dir, platform, running_version)
            .with_base_url(&base_url)
            .with_pinned_version(non_empty(env.var(TOOLS_VERSION_ENV)).as_deref())
            .with_lock_timeout(lock_timeout)
            .with_download_timeout(download_timeout))
    }

    /// Replace the artefact base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        base_url.clone_into(&mut self.base_url);
        self
    }

    /// Replace the version pin.
    #[must_use]
    pub fn with_pinned_version(mut self, pinned: Option<&str>) -> Self {
        self.pinned_version = pinned.map(str::to_owned);
        self
    }

    /// Replace the set of managed tools.
    #[must_use]
    pub fn with_tools(mut self, tools: &[&str]) -> Self {
        self.tools = tools.iter().map(|tool| (*tool).to_owned()).collect();
        self
    }

    /// Replace the lock wait bound.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Replace the HTTP transport timeout.
    #[must_use]
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Return the tools directory.
    #[must_use]
    pub fn tools_dir(&self) -> &Utf8PathBuf {
        &self.tools_dir
    }

    /// Return the artefact base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Return the product name used in artefact filenames.
    #[must_use]
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Return the managed tool names.
    #[must_use]
    pub fn tools(&self) -> &[String] {
        &self.tools
    }

    /// Return the host platform.
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Return the version embedded in the running binary.
    #[must_use]
    pub fn running_version(&self) -> &str {
        &self.running_version
    }

    /// Return the version pin, if any.
    #[must_use]
    pub fn pinned_version(&self) -> Option<&str> {
        self.pinned_version.as_deref()
    }

    /// Return the lock wait bound, if any.
    #[must_use]
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout
    }

    /// Return the HTTP transport timeout.
    #[must_use]
    pub fn download_timeout(&self) -> Duration {
        self.download_timeout
    }
}

fn tools_dir(env: &dyn EnvSource, dirs: &dyn BaseDirs) -> Result<Utf8PathBuf> {
    let home = match non_empty(env.var(HOME_ENV)) {
        Some(home) => Utf8PathBuf::from(home),
        None => {
            let user_home = dirs.home_dir().ok_or(ConfigError::NoHomeDirectory)?;
            let utf8 = Utf8PathBuf::try_from(user_home).map_err(|err| ConfigError::NonUtf8Path {
                path: err.into_path_buf().display().to_string(),
            })?;
            utf8.join(DEFAULT_HOME_DIR)
        }
    };
    Ok(home.join("bin"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_owned())
        .filter(|trimmed| !trimmed.is_empty())
}

fn seconds(env: &dyn EnvSource, var: &'static str) -> Result<Option<Duration>> {
    non_empty(env.var(var))
        .map(|value| {
            value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidDuration { var, value })
        })
        .transpose()
}
