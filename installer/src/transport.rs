//! Blocking HTTP transport for release metadata and asset downloads.
//!
//! Provides a trait-based abstraction over the upstream release host so
//! that the catalog and the secure downloader can be exercised without
//! network access.

use std::io::Read;

use crate::config::Settings;

/// Media type requested from the release-listing API.
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// API version pinned for the release-listing API.
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Trait for opening byte streams from the upstream release host.
///
/// Both methods return a blocking reader positioned at the start of the
/// response body; callers own all validation of what they read.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Open the release-listing document at `url`, requesting JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server answers with a
    /// non-success status.
    fn fetch_metadata(&self, url: &str) -> Result<Box<dyn Read>, TransportError>;

    /// Open the raw bytes of a release asset at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server answers with a
    /// non-success status.
    fn fetch_asset(&self, url: &str) -> Result<Box<dyn Read>, TransportError>;
}

/// Errors arising from HTTP requests.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTP request failed.
    #[error("request failed for {url}: {reason}")]
    Http {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested resource was not found (HTTP 404).
    #[error("not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },
}

/// HTTP transport backed by a `ureq` agent.
pub struct UreqTransport {
    agent: ureq::Agent,
    token: Option<String>,
}

impl UreqTransport {
    /// Create a transport from the configured settings.
    ///
    /// Only connection and response-header timeouts are set; asset bodies
    /// may be gigabytes and must not be cut off by a global deadline.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_connect(Some(settings.http_timeout()))
            .timeout_recv_response(Some(settings.http_timeout()))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            token: settings.github_token().map(str::to_owned),
        }
    }
}

impl Transport for UreqTransport {
    fn fetch_metadata(&self, url: &str) -> Result<Box<dyn Read>, TransportError> {
        let mut request = self
            .agent
            .get(url)
            .header("Accept", GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        let response = request.call().map_err(|e| map_ureq_error(url, &e))?;
        Ok(Box::new(response.into_body().into_reader()))
    }

    fn fetch_asset(&self, url: &str) -> Result<Box<dyn Read>, TransportError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        Ok(Box::new(response.into_body().into_reader()))
    }
}

/// Map a ureq error to a [`TransportError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> TransportError {
    match err {
        ureq::Error::StatusCode(404) => TransportError::NotFound {
            url: url.to_owned(),
        },
        other => TransportError::Http {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
