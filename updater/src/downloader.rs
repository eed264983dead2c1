//! Verified artefact download.
//!
//! Fetches the published checksum, streams the archive into a temporary file
//! beside the destination while hashing it, and only moves the file into
//! place once the digests agree. On any failure the temporary file is
//! removed and nothing exists at the destination.

use crate::artefact::download::{ArtefactFetcher, DownloadError};
use crate::artefact::error::ArtefactError;
use crate::artefact::naming::ArtefactName;
use crate::artefact::sha256_digest::Sha256Digest;
use sha2::{Digest, Sha256};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Errors arising from a verified download.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The checksum or archive request failed.
    #[error(transparent)]
    Transport(#[from] DownloadError),

    /// The published checksum body is not a SHA-256 digest.
    #[error("invalid published checksum for {artefact}: {source}")]
    InvalidChecksum {
        /// The artefact filename.
        artefact: String,
        /// The validation failure.
        #[source]
        source: ArtefactError,
    },

    /// The downloaded archive does not match the published checksum.
    #[error("checksum mismatch for {artefact}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The artefact filename.
        artefact: String,
        /// The published digest.
        expected: String,
        /// The digest of the downloaded bytes.
        actual: String,
    },

    /// Writing the downloaded archive failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// The file being written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Result type for verified downloads.
pub type Result<T> = std::result::Result<T, FetchError>;

/// Downloads artefacts through an [`ArtefactFetcher`] and verifies them.
pub struct Downloader<'a> {
    fetcher: &'a dyn ArtefactFetcher,
}

impl<'a> Downloader<'a> {
    /// Create a downloader using `fetcher` for network access.
    #[must_use]
    pub fn new(fetcher: &'a dyn ArtefactFetcher) -> Self {
        Self { fetcher }
    }

    /// Download `artefact` to `dest`, verifying it against the published
    /// checksum. Returns the verified digest.
    ///
    /// The checksum is fetched first so that an unpublished version fails
    /// before any payload is transferred.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] when a request fails,
    /// [`FetchError::InvalidChecksum`] when the published checksum is
    /// malformed, [`FetchError::ChecksumMismatch`] when the digests differ,
    /// and [`FetchError::Io`] when the file cannot be written.
    pub fn fetch(&self, artefact: &ArtefactName, dest: &Path) -> Result<Sha256Digest> {
        let body = self.fetcher.fetch_checksum(artefact)?;
        let expected =
            Sha256Digest::parse_published(&body).map_err(|source| FetchError::InvalidChecksum {
                artefact: artefact.filename(),
                source,
            })?;

        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(parent)
            .map_err(|source| FetchError::Io {
                path: parent.to_path_buf(),
                source,
            })?;

        let temp_path = temp.path().to_path_buf();
        let mut reader = self.fetcher.open_artefact(artefact)?;
        let mut writer = HashingWriter::new(temp.as_file_mut());
        copy_body(&mut reader, &mut writer, artefact, &temp_path)?;
        let actual = writer.finish();

        if actual != expected {
            log::warn!("discarding {artefact}: checksum mismatch");
            return Err(FetchError::ChecksumMismatch {
                artefact: artefact.filename(),
                expected: expected.into_inner(),
                actual: actual.into_inner(),
            });
        }

        temp.persist(dest).map_err(|err| FetchError::Io {
            path: dest.to_path_buf(),
            source: err.error,
        })?;
        log::debug!("downloaded {artefact} to {} ({actual})", dest.display());
        Ok(actual)
    }
}

/// Copy the response body, attributing read errors to the transport and
/// write errors to the local file.
fn copy_body(
    reader: &mut dyn Read,
    writer: &mut HashingWriter<'_>,
    artefact: &ArtefactName,
    temp_path: &Path,
) -> Result<()> {
    let mut buffer = [0_u8; 64 * 1024];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => return writer.flush().map_err(|source| write_error(temp_path, source)),
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(FetchError::Transport(DownloadError::Stream {
                    artefact: artefact.filename(),
                    source,
                }));
            }
        };
        let chunk = buffer.get(..read).unwrap_or_default();
        writer
            .write_all(chunk)
            .map_err(|source| write_error(temp_path, source))?;
    }
}

fn write_error(path: &Path, source: io::Error) -> FetchError {
    FetchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A writer that hashes every byte it forwards.
struct HashingWriter<'a> {
    inner: &'a mut std::fs::File,
    hasher: Sha256,
}

impl<'a> HashingWriter<'a> {
    fn new(inner: &'a mut std::fs::File) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    fn finish(self) -> Sha256Digest {
        Sha256Digest::from_bytes(&self.hasher.finalize())
    }
}

impl Write for HashingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher
            .update(buf.get(..written).unwrap_or_default());
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
