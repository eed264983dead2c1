//! Shared test utilities for the updater crate.

use crate::artefact::download::{ArtefactFetcher, DownloadError};
use crate::artefact::naming::ArtefactName;
use sha2::{Digest, Sha256};
use std::io::{Cursor, Read, Write};
use std::process::{ExitStatus, Output};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Computes the lowercase hex SHA-256 digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Builds an in-memory `.tar.gz` archive from `(path, contents)` pairs.
///
/// Entry paths are written verbatim into the header so that tests can build
/// archives containing unsafe paths.
///
/// # Panics
///
/// Panics if an entry path does not fit in a tar header or the archive
/// cannot be written.
pub fn tar_gz_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        let name = &mut header.as_gnu_mut().expect("GNU header").name;
        assert!(path.len() < name.len(), "entry path too long: {path}");
        name[..path.len()].copy_from_slice(path.as_bytes());
        header.set_size(contents.len() as u64);
        header.set_mode(0o755);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder
            .append(&header, contents.as_bytes())
            .expect("append tar entry");
    }
    let encoder = builder.into_inner().expect("finish tar archive");
    encoder.finish().expect("finish gzip stream")
}

/// Builds an in-memory `.zip` archive from `(path, contents)` pairs.
///
/// # Panics
///
/// Panics if the archive cannot be written.
pub fn zip_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (path, contents) in entries {
        writer.start_file(*path, options).expect("start zip entry");
        writer.write_all(contents.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip archive").into_inner()
}

/// A stub implementation of `ArtefactFetcher` serving a fixed archive.
///
/// Clones share the same request counters, so a test can hand one clone to
/// the code under test and keep another for assertions.
#[derive(Debug, Clone)]
pub struct StubFetcher {
    archive: Arc<Vec<u8>>,
    checksum: Option<String>,
    checksum_requests: Arc<AtomicUsize>,
    archive_requests: Arc<AtomicUsize>,
}

impl StubFetcher {
    /// Serves `archive` with its correct checksum as a bare hex digest.
    pub fn new(archive: Vec<u8>) -> Self {
        let checksum = sha256_hex(&archive);
        Self::with_checksum(archive, Some(checksum))
    }

    /// Serves `archive` with an arbitrary checksum body, or a 404 for the
    /// checksum when `checksum` is `None`.
    pub fn with_checksum(archive: Vec<u8>, checksum: Option<String>) -> Self {
        Self {
            archive: Arc::new(archive),
            checksum,
            checksum_requests: Arc::new(AtomicUsize::new(0)),
            archive_requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns the number of archive downloads started.
    pub fn archive_requests(&self) -> usize {
        self.archive_requests.load(Ordering::SeqCst)
    }

    /// Returns the number of checksum requests made.
    pub fn checksum_requests(&self) -> usize {
        self.checksum_requests.load(Ordering::SeqCst)
    }
}

impl ArtefactFetcher for StubFetcher {
    fn fetch_checksum(&self, artefact: &ArtefactName) -> Result<String, DownloadError> {
        self.checksum_requests.fetch_add(1, Ordering::SeqCst);
        self.checksum
            .clone()
            .ok_or_else(|| DownloadError::NotFound {
                url: format!("stub://{}.sha256", artefact.filename()),
            })
    }

    fn open_artefact(&self, _artefact: &ArtefactName) -> Result<Box<dyn Read>, DownloadError> {
        self.archive_requests.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Cursor::new(self.archive.as_ref().clone())))
    }
}

/// A stub fetcher whose every request fails with a transport error.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreachableFetcher;

impl ArtefactFetcher for UnreachableFetcher {
    fn fetch_checksum(&self, artefact: &ArtefactName) -> Result<String, DownloadError> {
        Err(unreachable_error(artefact))
    }

    fn open_artefact(&self, artefact: &ArtefactName) -> Result<Box<dyn Read>, DownloadError> {
        Err(unreachable_error(artefact))
    }
}

fn unreachable_error(artefact: &ArtefactName) -> DownloadError {
    DownloadError::HttpError {
        url: format!("stub://{}", artefact.filename()),
        reason: "connection refused".to_owned(),
    }
}
