//! Error types for release, asset, and artifact resolution.
//!
//! Each variant names the value that failed to resolve and, where useful,
//! how many candidates were found instead of exactly one.

use thiserror::Error;

/// Errors arising from resolving a version to a platform artifact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No release carries the requested version.
    #[error("clang-format version not found: {version}")]
    VersionNotFound {
        /// The requested version.
        version: String,
    },

    /// More than one release carries the requested version.
    #[error("{count} releases found for version {version}, but expected exactly 1")]
    MultipleVersionsFound {
        /// The requested version.
        version: String,
        /// Number of releases with that version.
        count: usize,
    },

    /// The running host has no entry in the platform table.
    #[error("unsupported platform: system={system} machine={machine}")]
    UnsupportedPlatform {
        /// Operating system reported by the host.
        system: String,
        /// CPU architecture reported by the host.
        machine: String,
    },

    /// No verifiable artifact exists for the platform.
    #[error("no artifact found for platform {os}/{arch}")]
    ArtifactNotFound {
        /// Normalised operating system.
        os: String,
        /// Normalised CPU architecture.
        arch: String,
    },

    /// More than one artifact exists for the platform.
    #[error("{count} artifacts found for platform {os}/{arch}, but expected exactly 1")]
    AmbiguousArtifact {
        /// Normalised operating system.
        os: String,
        /// Normalised CPU architecture.
        arch: String,
        /// Number of matching artifacts.
        count: usize,
    },

    /// No asset carries the requested name.
    #[error("asset not found: {name} (existing asset names: {existing})")]
    AssetNotFound {
        /// The requested asset name.
        name: String,
        /// Sorted, comma-separated names of the assets that do exist.
        existing: String,
    },

    /// More than one asset carries the requested name.
    #[error("found {count} assets with name {name}, but expected exactly 1")]
    MultipleAssetsFound {
        /// The requested asset name.
        name: String,
        /// Number of assets with that name.
        count: usize,
    },

    /// An asset name matched both the archive and the signature grammar.
    #[error("internal error: asset {name} matches both the archive and the signature grammar")]
    AmbiguousAssetClassification {
        /// The offending asset name.
        name: String,
    },
}
