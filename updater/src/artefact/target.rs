//! Host platform detection for published client-tool artefacts.
//!
//! Artefacts are published per operating system and architecture using the
//! release naming scheme (`linux`, `darwin`, `windows` and `amd64`, `arm64`,
//! `386`, `arm`). Each operating system also fixes the package format and the
//! on-disk layout of an installed tool binary.

use super::error::{ArtefactError, Result};
use std::fmt;

/// Operating systems with published client-tool artefacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    /// Linux distributions; artefacts are `.tar.gz` archives.
    Linux,
    /// macOS; artefacts are `.pkg` installers containing `.app` bundles.
    Darwin,
    /// Windows; artefacts are `.zip` archives containing `.exe` files.
    Windows,
}

impl Os {
    /// Map a standard library OS name (`std::env::consts::OS`).
    ///
    /// # Errors
    ///
    /// Returns [`ArtefactError::UnsupportedPlatform`] for any other OS.
    pub fn from_std(os: &str, arch: &str) -> Result<Self> {
        match os {
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::Darwin),
            "windows" => Ok(Self::Windows),
            other => Err(unsupported(other, arch)),
        }
    }

    /// Return the name used in artefact filenames.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        }
    }

    /// Return the package format published for this OS.
    #[must_use]
    pub fn package_format(self) -> PackageFormat {
        match self {
            Self::Linux => PackageFormat::TarGz,
            Self::Darwin => PackageFormat::Pkg,
            Self::Windows => PackageFormat::Zip,
        }
    }

    /// Return the archive entry name that carries `tool`.
    ///
    /// This is the top-level name that lands inside a version directory:
    /// `tsh` on Linux, `tsh.exe` on Windows, and the `tsh.app` bundle on macOS.
    #[must_use]
    pub fn entry_name(self, tool: &str) -> String {
        match self {
            Self::Linux => tool.to_owned(),
            Self::Darwin => format!("{tool}.app"),
            Self::Windows => format!("{tool}.exe"),
        }
    }

    /// Return the path of the executable for `tool`, relative to a version
    /// directory, as `/`-separated components.
    ///
    /// # Examples
    ///
    /// ```
    /// use toolup_updater::artefact::target::Os;
    ///
    /// assert_eq!(Os::Linux.binary_components("tsh"), vec!["tsh"]);
    /// assert_eq!(
    ///     Os::Darwin.binary_components("tsh"),
    ///     vec!["tsh.app", "Contents", "MacOS", "tsh"]
    /// );
    /// ```
    #[must_use]
    pub fn binary_components(self, tool: &str) -> Vec<String> {
        match self {
            Self::Linux | Self::Windows => vec![self.entry_name(tool)],
            Self::Darwin => vec![
                self.entry_name(tool),
                "Contents".to_owned(),
                "MacOS".to_owned(),
                tool.to_owned(),
            ],
        }
    }
}

/// CPU architectures with published client-tool artefacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// 64-bit x86.
    Amd64,
    /// 64-bit ARM.
    Arm64,
    /// 32-bit x86.
    I386,
    /// 32-bit ARM.
    Arm,
}

impl Arch {
    /// Map a standard library architecture name (`std::env::consts::ARCH`).
    ///
    /// # Errors
    ///
    /// Returns [`ArtefactError::UnsupportedPlatform`] for any other
    /// architecture.
    pub fn from_std(os: &str, arch: &str) -> Result<Self> {
        match arch {
            "x86_64" => Ok(Self::Amd64),
            "aarch64" => Ok(Self::Arm64),
            "x86" => Ok(Self::I386),
            "arm" => Ok(Self::Arm),
            other => Err(unsupported(os, other)),
        }
    }

    /// Return the name used in artefact filenames.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
            Self::I386 => "386",
            Self::Arm => "arm",
        }
    }
}

/// Package formats used by published artefacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageFormat {
    /// Gzip-compressed tarball.
    TarGz,
    /// Zip archive.
    Zip,
    /// macOS installer package.
    Pkg,
}

impl PackageFormat {
    /// Return the filename extension without a leading dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
            Self::Pkg => "pkg",
        }
    }
}

/// A supported operating system and architecture pair.
///
/// # Examples
///
/// ```
/// use toolup_updater::artefact::target::{Arch, Os, Platform};
///
/// let platform = Platform::from_std("linux", "x86_64").expect("supported");
/// assert_eq!(platform, Platform::new(Os::Linux, Arch::Amd64));
/// assert_eq!(platform.to_string(), "linux-amd64");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    os: Os,
    arch: Arch,
}

impl Platform {
    /// Create a platform from validated components.
    #[must_use]
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Map standard library OS and architecture names.
    ///
    /// # Errors
    ///
    /// Returns [`ArtefactError::UnsupportedPlatform`] when either component
    /// has no published artefact.
    pub fn from_std(os: &str, arch: &str) -> Result<Self> {
        Ok(Self {
            os: Os::from_std(os, arch)?,
            arch: Arch::from_std(os, arch)?,
        })
    }

    /// Detect the platform this binary was compiled for.
    ///
    /// # Errors
    ///
    /// Returns [`ArtefactError::UnsupportedPlatform`] on hosts without
    /// published artefacts.
    pub fn host() -> Result<Self> {
        Self::from_std(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Return the operating system component.
    #[must_use]
    pub fn os(&self) -> Os {
        self.os
    }

    /// Return the architecture component.
    #[must_use]
    pub fn arch(&self) -> Arch {
        self.arch
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

fn unsupported(os: &str, arch: &str) -> ArtefactError {
    ArtefactError::UnsupportedPlatform {
        os: os.to_owned(),
        arch: arch.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("linux", "x86_64", "linux-amd64")]
    #[case("linux", "aarch64", "linux-arm64")]
    #[case("linux", "arm", "linux-arm")]
    #[case("macos", "aarch64", "darwin-arm64")]
    #[case("windows", "x86", "windows-386")]
    fn maps_std_names_to_release_names(
        #[case] os: &str,
        #[case] arch: &str,
        #[case] expected: &str,
    ) {
        let platform = Platform::from_std(os, arch).expect("supported platform");
        assert_eq!(platform.to_string(), expected);
    }

    #[rstest]
    #[case("freebsd", "x86_64")]
    #[case("linux", "riscv64")]
    fn rejects_unsupported_platforms(#[case] os: &str, #[case] arch: &str) {
        let result = Platform::from_std(os, arch);
        assert!(matches!(
            result,
            Err(ArtefactError::UnsupportedPlatform { .. })
        ));
    }

    #[rstest]
    #[case(Os::Linux, PackageFormat::TarGz, "tar.gz")]
    #[case(Os::Darwin, PackageFormat::Pkg, "pkg")]
    #[case(Os::Windows, PackageFormat::Zip, "zip")]
    fn package_format_follows_os(
        #[case] os: Os,
        #[case] format: PackageFormat,
        #[case] extension: &str,
    ) {
        assert_eq!(os.package_format(), format);
        assert_eq!(format.extension(), extension);
    }

    #[test]
    fn windows_binaries_carry_exe_suffix() {
        assert_eq!(Os::Windows.entry_name("tctl"), "tctl.exe");
        assert_eq!(Os::Windows.binary_components("tctl"), vec!["tctl.exe"]);
    }

    #[test]
    fn host_platform_is_detected_on_supported_hosts() {
        if let Ok(platform) = Platform::host() {
            assert!(!platform.to_string().is_empty());
        }
    }
}
