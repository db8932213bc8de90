//! Runtime configuration for the installer.
//!
//! Settings default to the LLVM release host and the stock verifier
//! programs. Environment variables may override individual values; empty
//! values are treated as unset.

use std::time::Duration;

/// Release-listing endpoint for the LLVM project.
pub const DEFAULT_RELEASES_URL: &str = "https://api.github.com/repos/llvm/llvm-project/releases";

/// Environment variable overriding the release-listing endpoint.
pub const RELEASES_URL_ENV: &str = "ASDF_CLANG_FORMAT_RELEASES_URL";

/// Environment variable holding an optional GitHub API token.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Environment variable overriding the bundle verifier program.
pub const SIGSTORE_PROGRAM_ENV: &str = "ASDF_CLANG_FORMAT_SIGSTORE";

/// Environment variable overriding the detached-signature verifier program.
pub const GPGV_PROGRAM_ENV: &str = "ASDF_CLANG_FORMAT_GPGV";

const DEFAULT_SIGSTORE_PROGRAM: &str = "sigstore";
const DEFAULT_GPGV_PROGRAM: &str = "gpgv";

/// Upper bound on a single verifier process run (5 minutes).
const DEFAULT_VERIFIER_TIMEOUT: Duration = Duration::from_secs(300);

/// Connect and response-header timeout for HTTP requests.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Installer settings.
///
/// # Examples
///
/// ```
/// use clang_format_installer::config::{DEFAULT_RELEASES_URL, Settings};
///
/// let settings = Settings::from_lookup(|_| None);
/// assert_eq!(settings.releases_url(), DEFAULT_RELEASES_URL);
/// assert_eq!(settings.sigstore_program(), "sigstore");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    releases_url: String,
    github_token: Option<String>,
    sigstore_program: String,
    gpgv_program: String,
    verifier_timeout: Duration,
    http_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            releases_url: DEFAULT_RELEASES_URL.to_owned(),
            github_token: None,
            sigstore_program: DEFAULT_SIGSTORE_PROGRAM.to_owned(),
            gpgv_program: DEFAULT_GPGV_PROGRAM.to_owned(),
            verifier_timeout: DEFAULT_VERIFIER_TIMEOUT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl Settings {
    /// Build settings from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    ///
    /// Keys that are absent or map to an empty (or whitespace-only) value
    /// keep their defaults.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        Self {
            releases_url: read(RELEASES_URL_ENV).unwrap_or(defaults.releases_url),
            github_token: read(GITHUB_TOKEN_ENV),
            sigstore_program: read(SIGSTORE_PROGRAM_ENV).unwrap_or(defaults.sigstore_program),
            gpgv_program: read(GPGV_PROGRAM_ENV).unwrap_or(defaults.gpgv_program),
            ..defaults
        }
    }

    /// Replace the release-listing endpoint.
    #[must_use]
    pub fn with_releases_url(mut self, url: impl Into<String>) -> Self {
        self.releases_url = url.into();
        self
    }

    /// Replace the GitHub API token.
    #[must_use]
    pub fn with_github_token(mut self, token: impl Into<String>) -> Self {
        self.github_token = Some(token.into());
        self
    }

    /// Replace the verifier process timeout.
    #[must_use]
    pub const fn with_verifier_timeout(mut self, timeout: Duration) -> Self {
        self.verifier_timeout = timeout;
        self
    }

    /// The release-listing endpoint.
    #[must_use]
    pub fn releases_url(&self) -> &str {
        &self.releases_url
    }

    /// The GitHub API token, if one was configured.
    #[must_use]
    pub fn github_token(&self) -> Option<&str> {
        self.github_token.as_deref()
    }

    /// Program used for bundle verification.
    #[must_use]
    pub fn sigstore_program(&self) -> &str {
        &self.sigstore_program
    }

    /// Program used for detached-signature verification.
    #[must_use]
    pub fn gpgv_program(&self) -> &str {
        &self.gpgv_program
    }

    /// Upper bound on a single verifier process run.
    #[must_use]
    pub const fn verifier_timeout(&self) -> Duration {
        self.verifier_timeout
    }

    /// Connect and response-header timeout for HTTP requests.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        self.http_timeout
    }
}
