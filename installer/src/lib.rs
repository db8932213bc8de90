//! clang-format installer library.
//!
//! This crate downloads LLVM release archives, checks them against the size
//! upstream declares and against a proof of authenticity, extracts the
//! `clang-format` binary, and installs it. It is used by the
//! `asdf-clang-format` CLI binary and can be consumed programmatically for
//! testing or custom installation workflows.
//!
//! # Modules
//!
//! - [`artefact`] - Asset naming, platform detection, resolution, extraction
//! - [`catalog`] - Release listing retrieval and decoding
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Endpoint, credential, and verifier settings
//! - [`download`] - Size-checked downloads with signature verification
//! - [`error`] - Unified error type for the operation surface
//! - [`install`] - Atomic placement of the binary into an install root
//! - [`pipeline`] - The list, download, and install operations
//! - [`progress`] - Progress observers for downloads and extraction
//! - [`scratch`] - Ephemeral and persistent scratch directories
//! - [`transport`] - HTTP access to release metadata and assets
//! - [`verification`] - Bundle and detached signature verifiers

pub mod artefact;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod install;
pub mod pipeline;
pub mod progress;
pub mod scratch;
pub mod transport;
pub mod verification;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
