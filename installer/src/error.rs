//! Error types for the clang-format installer.
//!
//! Each pipeline stage has its own error enum; [`InstallerError`] wraps
//! them so the operation surface returns one type while callers can still
//! branch on the exact cause.

use thiserror::Error;

use crate::artefact::error::ResolveError;
use crate::artefact::extraction::ExtractionError;
use crate::catalog::CatalogError;
use crate::download::DownloadError;
use crate::install::InstallError;

/// Errors that can occur while listing, downloading, or installing.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The release listing could not be fetched or decoded.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A version, asset, platform, or artifact did not resolve.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// An asset download or its verification failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The binary could not be extracted from the archive.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The binary could not be installed.
    #[error(transparent)]
    Install(#[from] InstallError),

    /// I/O error outside any single stage, such as preparing directories.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for installer operations.
pub type Result<T> = std::result::Result<T, InstallerError>;
