//! Platform detection for artifact selection.
//!
//! The running host is mapped through a fixed table onto the lower-cased
//! `(os, arch)` tokens used in upstream asset names. Hosts missing from the
//! table are rejected rather than guessed.

use super::error::ResolveError;
use super::naming::PlatformKey;
use std::fmt;

/// Host `(os, arch)` pairs and the upstream tokens they map to.
///
/// Host values are in Rust's `std::env::consts` spelling after alias
/// normalisation (see [`normalise_host`]).
const PLATFORM_TABLE: &[((&str, &str), (&str, &str))] = &[
    (("linux", "x86_64"), ("linux", "x64")),
    (("linux", "aarch64"), ("linux", "arm64")),
    (("macos", "aarch64"), ("macos", "arm64")),
    (("macos", "x86_64"), ("macos", "x64")),
];

/// A normalised platform in upstream asset-name tokens.
///
/// # Examples
///
/// ```
/// use clang_format_installer::artefact::target::Platform;
///
/// let platform = Platform::from_host("Darwin", "arm64").expect("supported");
/// assert_eq!(platform.to_string(), "macos/arm64");
/// assert!(Platform::from_host("windows", "x86_64").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    os: &'static str,
    arch: &'static str,
}

impl Platform {
    /// The platform of the running process.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnsupportedPlatform`] if the host is not in
    /// the platform table.
    pub fn current() -> Result<Self, ResolveError> {
        Self::from_host(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map a host operating system and machine name onto a platform.
    ///
    /// Both `uname`-style (`darwin`, `arm64`, `amd64`) and Rust-style
    /// (`macos`, `aarch64`, `x86_64`) spellings are accepted, in any case.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnsupportedPlatform`] for combinations that
    /// are not in the platform table.
    pub fn from_host(system: &str, machine: &str) -> Result<Self, ResolveError> {
        let lower_system = system.to_lowercase();
        let lower_machine = machine.to_lowercase();
        let host = normalise_host(&lower_system, &lower_machine);

        PLATFORM_TABLE
            .iter()
            .find(|(candidate, _)| *candidate == host)
            .map(|(_, (os, arch))| Self { os: *os, arch: *arch })
            .ok_or(ResolveError::UnsupportedPlatform {
                system: lower_system,
                machine: lower_machine,
            })
    }

    /// Operating system token, e.g. `linux`.
    #[must_use]
    pub const fn os(&self) -> &'static str {
        self.os
    }

    /// CPU architecture token, e.g. `x64`.
    #[must_use]
    pub const fn arch(&self) -> &'static str {
        self.arch
    }

    /// Whether `key` names this platform.
    #[must_use]
    pub fn matches(&self, key: &PlatformKey) -> bool {
        key.os == self.os && key.arch == self.arch
    }
}

/// Fold host aliases onto the spelling used in [`PLATFORM_TABLE`].
fn normalise_host<'a>(system: &'a str, machine: &'a str) -> (&'a str, &'a str) {
    let os = match system {
        "darwin" => "macos",
        other => other,
    };
    let cpu = match machine {
        "arm64" => "aarch64",
        "amd64" => "x86_64",
        other => other,
    };
    (os, cpu)
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
