//! Toolup update engine.
//!
//! This crate decides whether the running client tool matches the version
//! required by policy and, when it does not, fetches, verifies, installs, and
//! hands over to the correct version. It is used by the `toolup` binary and
//! can be driven programmatically for testing.
//!
//! # Modules
//!
//! - [`artefact`] - Artefact naming, platforms, fetching, and extraction
//! - [`config`] - Configuration built from the environment
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`downloader`] - Checksum-verified artefact download
//! - [`error`] - Crate-level error type and error taxonomy
//! - [`installer`] - Staged installation and atomic promotion
//! - [`lock`] - Cross-process lock over the tools directory
//! - [`output`] - User-facing progress lines
//! - [`reexec`] - Launching the resolved binary
//! - [`resolver`] - Required-version resolution
//! - [`store`] - Installed versions and the current-version marker
//! - [`update`] - Orchestration of the whole update flow

pub mod artefact;
pub mod config;
pub mod dirs;
pub mod downloader;
pub mod error;
pub mod installer;
pub mod lock;
pub mod output;
pub mod reexec;
pub mod resolver;
pub mod store;
pub mod update;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
