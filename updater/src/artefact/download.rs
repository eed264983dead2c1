//! Artefact fetching for published client-tool packages.
//!
//! Provides a trait-based abstraction over the HTTP client that retrieves
//! artefact archives and their published checksums, enabling dependency
//! injection for testing. The update engine only consumes the trait.

use super::naming::ArtefactName;
use std::io::Read;
use std::time::Duration;

/// Trait for fetching artefacts and their published checksums.
///
/// The archive and its checksum are always requested separately so that the
/// checksum is never taken from the same response body as the payload.
#[cfg_attr(test, mockall::automock)]
pub trait ArtefactFetcher {
    /// Fetch the body of the published `.sha256` resource for `artefact`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the resource is not found.
    fn fetch_checksum(&self, artefact: &ArtefactName) -> Result<String, DownloadError>;

    /// Open a byte stream over the archive for `artefact`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the archive is not found.
    fn open_artefact(&self, artefact: &ArtefactName) -> Result<Box<dyn Read>, DownloadError>;
}

/// Errors arising from artefact fetch operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested artefact was not found (HTTP 404).
    #[error("artefact not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error while streaming an artefact body.
    #[error("I/O error while downloading {artefact}: {source}")]
    Stream {
        /// The filename of the artefact being read.
        artefact: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// HTTP-based fetcher using `ureq`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use toolup_updater::artefact::download::HttpFetcher;
///
/// let fetcher = HttpFetcher::new("https://cdn.example.test", Duration::from_secs(30));
/// assert_eq!(fetcher.base_url(), "https://cdn.example.test");
/// ```
pub struct HttpFetcher {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// Create a fetcher rooted at `base_url` with a global request timeout.
    #[must_use]
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            base_url: base_url.to_owned(),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    /// Return the base URL artefacts are fetched from.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl ArtefactFetcher for HttpFetcher {
    fn fetch_checksum(&self, artefact: &ArtefactName) -> Result<String, DownloadError> {
        let url = artefact.checksum_url(&self.base_url);
        log::debug!("fetching checksum from {url}");
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| map_ureq_error(&url, &e))?;
        response
            .into_body()
            .read_to_string()
            .map_err(|e| DownloadError::HttpError {
                url: url.clone(),
                reason: e.to_string(),
            })
    }

    fn open_artefact(&self, artefact: &ArtefactName) -> Result<Box<dyn Read>, DownloadError> {
        let url = artefact.url(&self.base_url);
        log::debug!("fetching artefact from {url}");
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| map_ureq_error(&url, &e))?;
        Ok(Box::new(BodyReader {
            url,
            inner: response.into_body().into_reader(),
        }))
    }
}

/// Response body reader that names the URL in its read errors.
struct BodyReader<R> {
    url: String,
    inner: R,
}

impl<R: Read> Read for BodyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf).map_err(|err| {
            if err.kind() == std::io::ErrorKind::Interrupted {
                err
            } else {
                std::io::Error::new(err.kind(), format!("reading {}: {err}", self.url))
            }
        })
    }
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
