//! Archive extraction for client-tool artefacts.
//!
//! Extracts only the expected tool entries from `.tar.gz`, `.zip`, and macOS
//! `.pkg` artefacts into a staging directory. Archive entry paths are all
//! validated in a first pass before anything is written, so an archive that
//! attempts path traversal is rejected as a whole. Expected entries are
//! written flat, by base name, directly below the destination directory.

use super::target::PackageFormat;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Output};

/// Trait for extracting artefact archives, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ArtefactExtractor {
    /// Extract the entries named in `expected` from the archive at
    /// `archive_path` into `dest_dir`.
    ///
    /// Returns the names that were extracted, in the order of `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry attempts to
    /// escape the destination directory, [`ExtractionError::MissingEntries`]
    /// if an expected entry is absent, [`ExtractionError::Malformed`] if the
    /// archive cannot be decoded, and [`ExtractionError::Io`] on I/O failures.
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
        expected: &[String],
    ) -> Result<Vec<String>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive could not be decoded.
    #[error("malformed archive: {reason}")]
    Malformed {
        /// Description of the decoding failure.
        reason: String,
    },

    /// The archive lacks one or more expected tool entries.
    #[error("archive is missing expected entries: {}", missing.join(", "))]
    MissingEntries {
        /// The expected entry names that were not found.
        missing: Vec<String>,
    },

    /// An external unpacking command failed.
    #[error("{command} failed: {reason}")]
    CommandFailed {
        /// The command that was run.
        command: String,
        /// Captured stderr or a description of the failure.
        reason: String,
    },
}

/// Return the extractor for a package format.
#[must_use]
pub fn extractor_for(format: PackageFormat) -> Box<dyn ArtefactExtractor> {
    match format {
        PackageFormat::TarGz => Box::new(TarGzExtractor),
        PackageFormat::Zip => Box::new(ZipExtractor),
        PackageFormat::Pkg => Box::new(PkgExtractor::new(SystemCommandRunner)),
    }
}

/// Extractor for `.tar.gz` artefacts using the `tar` and `flate2` crates.
pub struct TarGzExtractor;

impl ArtefactExtractor for TarGzExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
        expected: &[String],
    ) -> Result<Vec<String>, ExtractionError> {
        for entry_result in open_tar_gz(archive_path)?.entries().map_err(malformed)? {
            let entry = entry_result.map_err(malformed)?;
            validate_entry_path(&entry.path().map_err(malformed)?)?;
        }

        let mut archive = open_tar_gz(archive_path)?;
        let mut found = BTreeSet::new();
        for entry_result in archive.entries().map_err(malformed)? {
            let mut entry = entry_result.map_err(malformed)?;
            let entry_path = entry.path().map_err(malformed)?.into_owned();

            if !entry.header().entry_type().is_file() {
                continue;
            }
            let Some(name) = expected_name(&entry_path, expected) else {
                continue;
            };
            if !found.insert(name.clone()) {
                log::debug!("ignoring duplicate archive entry {}", entry_path.display());
                continue;
            }
            let mut out = fs::File::create(dest_dir.join(&name))?;
            io::copy(&mut entry, &mut out)?;
        }

        ensure_complete(expected, &found)
    }
}

/// Extractor for `.zip` artefacts using the `zip` crate.
pub struct ZipExtractor;

impl ArtefactExtractor for ZipExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
        expected: &[String],
    ) -> Result<Vec<String>, ExtractionError> {
        let file = fs::File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(malformed)?;
        for index in 0..archive.len() {
            let entry = archive.by_index(index).map_err(malformed)?;
            enclosed_path(entry.name(), entry.enclosed_name())?;
        }

        let mut found = BTreeSet::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(malformed)?;
            let entry_path = enclosed_path(entry.name(), entry.enclosed_name())?;

            if !entry.is_file() {
                continue;
            }
            let Some(name) = expected_name(&entry_path, expected) else {
                continue;
            };
            if !found.insert(name.clone()) {
                log::debug!("ignoring duplicate archive entry {}", entry_path.display());
                continue;
            }
            let mut out = fs::File::create(dest_dir.join(&name))?;
            io::copy(&mut entry, &mut out)?;
        }

        ensure_complete(expected, &found)
    }
}

fn open_tar_gz(
    archive_path: &Path,
) -> Result<tar::Archive<flate2::read::GzDecoder<fs::File>>, ExtractionError> {
    let file = fs::File::open(archive_path)?;
    Ok(tar::Archive::new(flate2::read::GzDecoder::new(file)))
}

/// Resolve a zip entry's path, given its raw name and the `zip` crate's
/// sanitized form, rejecting entries that would escape the destination.
fn enclosed_path(name: &str, enclosed: Option<PathBuf>) -> Result<PathBuf, ExtractionError> {
    let path = enclosed.ok_or_else(|| ExtractionError::PathTraversal {
        path: name.to_owned(),
    })?;
    validate_entry_path(&path)?;
    Ok(path)
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    /// Run `program` with `args` and capture its output.
    ///
    /// # Errors
    ///
    /// Returns any I/O error encountered while spawning the command.
    fn run(&self, program: &str, args: &[String]) -> io::Result<Output>;
}

/// Runs commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<Output> {
        Command::new(program).args(args).output()
    }
}

/// Extractor for macOS `.pkg` artefacts.
///
/// The package is expanded with `pkgutil --expand-full` into a scratch
/// directory, then the expected `.app` bundles are located anywhere in the
/// expanded payload and copied into the destination.
pub struct PkgExtractor<R> {
    runner: R,
}

impl<R: CommandRunner> PkgExtractor<R> {
    /// Create a package extractor using `runner` to invoke `pkgutil`.
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> ArtefactExtractor for PkgExtractor<R> {
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
        expected: &[String],
    ) -> Result<Vec<String>, ExtractionError> {
        let scratch = tempfile::Builder::new()
            .prefix(".pkg-expand-")
            .tempdir_in(dest_dir)?;
        // pkgutil refuses to expand into an existing directory.
        let expanded = scratch.path().join("expanded");
        let args = vec![
            "--expand-full".to_owned(),
            archive_path.display().to_string(),
            expanded.display().to_string(),
        ];
        let output = self.runner.run("pkgutil", &args)?;
        if !output.status.success() {
            return Err(ExtractionError::CommandFailed {
                command: "pkgutil --expand-full".to_owned(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let mut found = BTreeSet::new();
        collect_bundles(&expanded, dest_dir, expected, &mut found)?;
        ensure_complete(expected, &found)
    }
}

/// Walk `dir` looking for expected bundle directories and copy each one
/// found into `dest_dir`.
fn collect_bundles(
    dir: &Path,
    dest_dir: &Path,
    expected: &[String],
    found: &mut BTreeSet<String>,
) -> Result<(), ExtractionError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if !file_type.is_dir() {
            continue;
        }
        let path = entry.path();
        match expected_name(&path, expected) {
            Some(name) if !found.contains(&name) => {
                copy_tree(&path, &dest_dir.join(&name))?;
                found.insert(name);
            }
            _ => collect_bundles(&path, dest_dir, expected, found)?,
        }
    }
    Ok(())
}

/// Recursively copy a directory tree, skipping symlinks.
fn copy_tree(source: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dest.join(entry.file_name());
        if file_type.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Return the expected entry name matching the base name of `path`.
fn expected_name(path: &Path, expected: &[String]) -> Option<String> {
    let base = path.file_name()?.to_str()?;
    expected.iter().find(|name| name.as_str() == base).cloned()
}

/// Check that every expected entry was found and return them in order.
fn ensure_complete(
    expected: &[String],
    found: &BTreeSet<String>,
) -> Result<Vec<String>, ExtractionError> {
    let missing: Vec<String> = expected
        .iter()
        .filter(|name| !found.contains(*name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ExtractionError::MissingEntries { missing });
    }
    Ok(expected.to_vec())
}

/// Validate that an archive entry path does not escape the destination
/// directory via `..` components or absolute paths.
pub fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path.components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

fn malformed(err: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::Malformed {
        reason: err.to_string(),
    }
}

#[cfg(test)]
#[path = "extraction_tests.rs"]
mod tests;
