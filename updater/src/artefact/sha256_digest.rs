//! SHA-256 digest newtype for artefact verification.
//!
//! Digests are stored as 64-character lowercase hexadecimal strings. Parsing
//! a published checksum accepts either case and normalizes it, so comparison
//! against a computed digest is effectively case-insensitive.

use super::error::{ArtefactError, Result};
use std::fmt;

/// Expected length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// A validated hex-encoded SHA-256 digest string.
///
/// # Examples
///
/// ```
/// use toolup_updater::artefact::sha256_digest::Sha256Digest;
///
/// let hex = "A".repeat(64);
/// let digest: Sha256Digest = hex.as_str().try_into().unwrap();
/// assert_eq!(digest.as_str(), "a".repeat(64));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Return the digest as a lowercase hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Build a digest from the raw output of a SHA-256 hasher.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let hex = bytes.iter().fold(String::with_capacity(DIGEST_HEX_LEN), |mut acc, byte| {
            acc.push_str(&format!("{byte:02x}"));
            acc
        });
        Self(hex)
    }

    /// Parse the body of a published `.sha256` resource.
    ///
    /// The body is either a bare hex digest or a `sha256sum` line of the form
    /// `<digest>  <filename>`; surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ArtefactError::InvalidSha256Digest`] when the first token is
    /// missing or is not a 64-character hex string.
    ///
    /// # Examples
    ///
    /// ```
    /// use toolup_updater::artefact::sha256_digest::Sha256Digest;
    ///
    /// let body = format!("{}  toolup-v17.1.2-linux-amd64-bin.tar.gz\n", "b".repeat(64));
    /// let digest = Sha256Digest::parse_published(&body).unwrap();
    /// assert_eq!(digest.as_str(), "b".repeat(64));
    /// ```
    pub fn parse_published(body: &str) -> Result<Self> {
        let token = body
            .split_whitespace()
            .next()
            .ok_or_else(|| ArtefactError::InvalidSha256Digest {
                reason: "checksum resource is empty".to_owned(),
            })?;
        Self::try_from(token)
    }
}

impl TryFrom<&str> for Sha256Digest {
    type Error = ArtefactError;

    fn try_from(value: &str) -> Result<Self> {
        validate_sha256(value)?;
        Ok(Self(value.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for Sha256Digest {
    type Error = ArtefactError;

    fn try_from(value: String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate that `value` is a well-formed hex-encoded SHA-256 digest.
fn validate_sha256(value: &str) -> Result<()> {
    if value.len() != DIGEST_HEX_LEN {
        return Err(ArtefactError::InvalidSha256Digest {
            reason: format!(
                "expected {DIGEST_HEX_LEN} hex characters, got {}",
                value.len()
            ),
        });
    }
    if let Some(bad) = value.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ArtefactError::InvalidSha256Digest {
            reason: format!("non-hex character '{bad}'"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn valid_digest() -> String {
        "a".repeat(64)
    }

    #[test]
    fn accepts_valid_sixty_four_char_hex() {
        let digest = Sha256Digest::try_from(valid_digest().as_str());
        assert!(digest.is_ok());
    }

    #[rstest]
    #[case::too_short("abcdef")]
    #[case::too_long(&"a".repeat(65))]
    #[case::non_hex(&format!("{}g", "a".repeat(63)))]
    fn rejects_malformed_digests(#[case] value: &str) {
        let result = Sha256Digest::try_from(value);
        assert!(matches!(
            result,
            Err(ArtefactError::InvalidSha256Digest { .. })
        ));
    }

    #[test]
    fn uppercase_is_normalized_to_lowercase() {
        let digest = Sha256Digest::try_from("AB".repeat(32)).expect("valid digest");
        assert_eq!(digest.as_str(), "ab".repeat(32));
    }

    #[rstest]
    #[case::bare("c".repeat(64))]
    #[case::trailing_newline(format!("{}\n", "c".repeat(64)))]
    #[case::sha256sum_line(format!("{}  toolup.tar.gz\n", "c".repeat(64)))]
    fn parses_published_checksum_bodies(#[case] body: String) {
        let digest = Sha256Digest::parse_published(&body).expect("published digest");
        assert_eq!(digest.as_str(), "c".repeat(64));
    }

    #[test]
    fn empty_published_body_is_rejected() {
        let result = Sha256Digest::parse_published("  \n");
        assert!(result.is_err());
    }

    #[test]
    fn from_bytes_encodes_lowercase_hex() {
        let digest = Sha256Digest::from_bytes(&[0xAB; 32]);
        assert_eq!(digest.as_str(), "ab".repeat(32));
    }

    #[test]
    fn display_shows_full_digest() {
        let hex = valid_digest();
        let digest = Sha256Digest::try_from(hex.as_str()).expect("known good");
        assert_eq!(format!("{digest}"), hex);
    }
}
