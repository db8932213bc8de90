//! Release asset naming grammar.
//!
//! Upstream publishes one archive per platform named
//! `<Product>-<version>-<OS>-<Arch>.tar.xz`, and one proof of authenticity
//! per archive named like the archive plus a scheme-specific suffix
//! (`.sig` for detached signatures, `.jsonl` for signature bundles).
//!
//! Matching is an explicit tokenizer rather than a pattern library:
//!
//! 1. the name must start with the literal `"<Product>-<version>-"`;
//! 2. it must end with the literal suffix for its kind;
//! 3. what remains must be exactly two non-empty word tokens (ASCII or
//!    Unicode alphanumerics and `_`) joined by a single `-`.
//!
//! The two tokens are the operating system and CPU architecture, and are
//! lower-cased to form the platform key.

use std::fmt;

/// Product literal that prefixes every release asset name.
pub const PRODUCT: &str = "LLVM";

/// File extension of distributable archives.
pub const ARCHIVE_SUFFIX: &str = ".tar.xz";

/// The lower-cased `(os, arch)` pair parsed from an asset name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlatformKey {
    /// Operating system token, lower-cased.
    pub os: String,
    /// CPU architecture token, lower-cased.
    pub arch: String,
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// One filename grammar: literal prefix, two tokens, literal suffix.
///
/// # Examples
///
/// ```
/// use clang_format_installer::artefact::naming::AssetNameGrammar;
///
/// let grammar = AssetNameGrammar::new("LLVM", "18.1.8", ".tar.xz");
/// let key = grammar.parse("LLVM-18.1.8-Linux-X64.tar.xz").expect("matches");
/// assert_eq!((key.os.as_str(), key.arch.as_str()), ("linux", "x64"));
/// assert!(grammar.parse("LLVM-18.1.8-Linux-X64.tar.xz.jsonl").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetNameGrammar {
    prefix: String,
    suffix: String,
}

impl AssetNameGrammar {
    /// Build the grammar for `product` at `version` with the given suffix.
    #[must_use]
    pub fn new(product: &str, version: &str, suffix: &str) -> Self {
        Self {
            prefix: format!("{product}-{version}-"),
            suffix: suffix.to_owned(),
        }
    }

    /// Match `name` exactly, returning its platform key on success.
    #[must_use]
    pub fn parse(&self, name: &str) -> Option<PlatformKey> {
        let middle = name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        let (os, arch) = middle.split_once('-')?;
        if !is_word(os) || !is_word(arch) {
            return None;
        }
        Some(PlatformKey {
            os: os.to_lowercase(),
            arch: arch.to_lowercase(),
        })
    }
}

/// A non-empty run of alphanumerics and underscores.
fn is_word(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// The archive name for a product, version, and upstream platform tokens.
///
/// # Examples
///
/// ```
/// use clang_format_installer::artefact::naming::ArchiveName;
///
/// let name = ArchiveName::new("18.1.8", "Linux", "X64");
/// assert_eq!(name.to_string(), "LLVM-18.1.8-Linux-X64.tar.xz");
/// assert_eq!(name.with_suffix(".jsonl"), "LLVM-18.1.8-Linux-X64.tar.xz.jsonl");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    version: String,
    os: String,
    arch: String,
}

impl ArchiveName {
    /// Create an archive name from its components as published upstream.
    #[must_use]
    pub fn new(version: &str, os: &str, arch: &str) -> Self {
        Self {
            version: version.to_owned(),
            os: os.to_owned(),
            arch: arch.to_owned(),
        }
    }

    /// The archive name with a proof-of-authenticity suffix appended.
    #[must_use]
    pub fn with_suffix(&self, suffix: &str) -> String {
        format!("{self}{suffix}")
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PRODUCT}-{}-{}-{}{ARCHIVE_SUFFIX}",
            self.version, self.os, self.arch
        )
    }
}
