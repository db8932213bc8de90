//! Release catalog retrieval from the upstream release host.
//!
//! The release listing is decoded into an explicit schema at the boundary:
//! a release without a display name, or an asset without a name, size, or
//! download URL, is rejected as malformed metadata rather than surfacing
//! later as a missing field during resolution.

use std::io::Read;

use log::{debug, info};
use serde::Deserialize;

use crate::transport::{Transport, TransportError};

/// Number of characters stripped from a release display name to obtain
/// its version (`"LLVM 18.1.8"` → `"18.1.8"`).
pub const RELEASE_NAME_PREFIX_LEN: usize = 5;

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// File name of the asset, e.g. `LLVM-18.1.8-Linux-X64.tar.xz`.
    pub name: String,
    /// Declared size of the asset in bytes.
    pub size: u64,
    /// URL the asset bytes are served from.
    pub download_url: String,
}

/// A published release and its assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    /// Version derived from the release display name.
    pub version: String,
    /// Assets in upstream order.
    pub assets: Vec<ReleaseAsset>,
}

/// Errors arising from fetching or decoding the release listing.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The release host could not be reached or answered with an error.
    #[error("release listing unavailable from {url}: {reason}")]
    UpstreamUnavailable {
        /// The release-listing URL.
        url: String,
        /// Description of the transport failure.
        reason: String,
    },

    /// The release listing did not match the expected shape.
    #[error("malformed release metadata from {url}: {reason}")]
    MalformedMetadata {
        /// The release-listing URL.
        url: String,
        /// Description of the decoding failure.
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawRelease {
    name: String,
    #[serde(default)]
    assets: Option<Vec<RawAsset>>,
}

#[derive(Debug, Deserialize)]
struct RawAsset {
    name: String,
    size: u64,
    browser_download_url: String,
}

/// Client for the release-listing endpoint.
pub struct ReleaseCatalog<'a> {
    transport: &'a dyn Transport,
    url: String,
}

impl<'a> ReleaseCatalog<'a> {
    /// Create a catalog reading from `url` through `transport`.
    #[must_use]
    pub fn new(transport: &'a dyn Transport, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
        }
    }

    /// Fetch every release on the host's default page.
    ///
    /// Issues exactly one metadata request; nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UpstreamUnavailable`] if the request or the
    /// body read fails, and [`CatalogError::MalformedMetadata`] if the body
    /// does not decode into the release schema.
    pub fn fetch_releases(&self) -> Result<Vec<ReleaseInfo>, CatalogError> {
        info!("Getting releases from {}", self.url);
        let body = self
            .transport
            .fetch_metadata(&self.url)
            .map_err(|e| self.unavailable(&e))?;
        let releases = parse_releases(body, &self.url)?;
        debug!("Found {} releases", releases.len());
        Ok(releases)
    }

    fn unavailable(&self, err: &TransportError) -> CatalogError {
        CatalogError::UpstreamUnavailable {
            url: self.url.clone(),
            reason: err.to_string(),
        }
    }
}

/// Decode a release listing read from `body`.
///
/// # Errors
///
/// Returns [`CatalogError::UpstreamUnavailable`] when reading `body` fails
/// and [`CatalogError::MalformedMetadata`] when the JSON has the wrong shape.
pub fn parse_releases(body: impl Read, url: &str) -> Result<Vec<ReleaseInfo>, CatalogError> {
    let raw: Vec<RawRelease> = serde_json::from_reader(body).map_err(|e| {
        if e.is_io() {
            CatalogError::UpstreamUnavailable {
                url: url.to_owned(),
                reason: e.to_string(),
            }
        } else {
            CatalogError::MalformedMetadata {
                url: url.to_owned(),
                reason: e.to_string(),
            }
        }
    })?;

    Ok(raw.into_iter().map(ReleaseInfo::from).collect())
}

/// Strip the fixed display-name prefix from a release name.
///
/// Names shorter than the prefix yield an empty version.
#[must_use]
pub fn version_from_release_name(name: &str) -> String {
    name.chars().skip(RELEASE_NAME_PREFIX_LEN).collect()
}

impl From<RawRelease> for ReleaseInfo {
    fn from(raw: RawRelease) -> Self {
        Self {
            version: version_from_release_name(&raw.name),
            assets: raw
                .assets
                .unwrap_or_default()
                .into_iter()
                .map(|asset| ReleaseAsset {
                    name: asset.name,
                    size: asset.size,
                    download_url: asset.browser_download_url,
                })
                .collect(),
        }
    }
}
