//! Published client-tool artefacts: naming, platforms, fetching, and
//! extraction.
//!
//! # Sub-modules
//!
//! - [`download`] - Artefact fetch trait and HTTP implementation.
//! - [`error`] - Validation errors for artefact domain types.
//! - [`extraction`] - Archive extraction with path traversal protection.
//! - [`naming`] - Artefact archive naming policy (`ArtefactName`).
//! - [`sha256_digest`] - SHA-256 digest newtype (`Sha256Digest`).
//! - [`target`] - Host OS, architecture, and package format.
//! - [`version`] - Client-tool version newtype (`ToolsVersion`).

pub mod download;
pub mod error;
pub mod extraction;
pub mod naming;
pub mod sha256_digest;
pub mod target;
pub mod version;
