//! Release artefacts: naming, platform selection, and extraction.
//!
//! # Sub-modules
//!
//! - [`error`] - Resolution error types.
//! - [`naming`] - Asset name grammar (`AssetNameGrammar`, `ArchiveName`).
//! - [`target`] - Host platform table (`Platform`).
//! - [`resolver`] - Version, asset, and artifact resolution.
//! - [`extraction`] - Single-file extraction from `.tar.xz` archives.

pub mod error;
pub mod extraction;
pub mod naming;
pub mod resolver;
pub mod target;
