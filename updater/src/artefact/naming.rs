//! Artefact naming policy for published client-tool packages.
//!
//! Constructs deterministic archive names in the release format:
//! `<product>-v<version>-<os>-<arch>-bin.<ext>`. The published checksum lives
//! next to the archive under the same URL with a `.sha256` suffix.

use super::target::Platform;
use super::version::ToolsVersion;
use std::fmt;

/// The product name used for all published client-tool artefacts.
pub const DEFAULT_PRODUCT: &str = "toolup";

/// The suffix appended to an artefact URL to locate its checksum.
const CHECKSUM_SUFFIX: &str = ".sha256";

/// A fully-qualified artefact archive name.
///
/// # Examples
///
/// ```
/// use toolup_updater::artefact::naming::ArtefactName;
/// use toolup_updater::artefact::target::Platform;
/// use toolup_updater::artefact::version::ToolsVersion;
///
/// let version = ToolsVersion::parse("17.1.2").expect("valid version");
/// let platform = Platform::from_std("linux", "x86_64").expect("supported");
/// let name = ArtefactName::new("toolup", version, platform);
///
/// assert_eq!(name.filename(), "toolup-v17.1.2-linux-amd64-bin.tar.gz");
/// assert_eq!(
///     name.checksum_url("https://cdn.example.test/"),
///     "https://cdn.example.test/toolup-v17.1.2-linux-amd64-bin.tar.gz.sha256"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtefactName {
    product: String,
    version: ToolsVersion,
    platform: Platform,
}

impl ArtefactName {
    /// Create an artefact name from validated components.
    #[must_use]
    pub fn new(product: &str, version: ToolsVersion, platform: Platform) -> Self {
        Self {
            product: product.to_owned(),
            version,
            platform,
        }
    }

    /// Return the archive filename.
    #[must_use]
    pub fn filename(&self) -> String {
        format!(
            "{}-v{}-{}-{}-bin.{}",
            self.product,
            self.version,
            self.platform.os().as_str(),
            self.platform.arch().as_str(),
            self.platform.os().package_format().extension()
        )
    }

    /// Return the archive URL below `base_url`.
    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.filename())
    }

    /// Return the URL of the published checksum for this archive.
    #[must_use]
    pub fn checksum_url(&self, base_url: &str) -> String {
        format!("{}{CHECKSUM_SUFFIX}", self.url(base_url))
    }
}

impl fmt::Display for ArtefactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.filename())
    }
}
