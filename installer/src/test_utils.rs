//! Shared test utilities for the installer crate.
//!
//! Stub collaborators for the transport and signature-verification seams,
//! plus builders for release listings and `.tar.xz` archives. Enabled for
//! unit tests and, through the `test-support` feature, for the crate's
//! integration tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use serde_json::json;
use xz2::write::XzEncoder;

use crate::transport::{Transport, TransportError};
use crate::verification::{SignatureVerifier, VerificationError, VerifierFactory};

/// Base URL under which stub release assets are served.
pub const ASSET_BASE_URL: &str = "https://example.test/llvm/releases/download";

/// Release-listing URL served by [`StubTransport`] fixtures.
pub const RELEASES_URL: &str = "https://example.test/llvm/releases";

/// The download URL of a stub asset named `name`.
#[must_use]
pub fn asset_url(name: &str) -> String {
    format!("{ASSET_BASE_URL}/{name}")
}

/// One release in a stub release listing.
#[derive(Debug, Clone)]
pub struct ReleaseFixture {
    name: String,
    assets: Vec<(String, u64)>,
}

impl ReleaseFixture {
    /// A release whose display name is `"LLVM <version>"`.
    #[must_use]
    pub fn new(version: &str) -> Self {
        Self {
            name: format!("LLVM {version}"),
            assets: Vec::new(),
        }
    }

    /// Add an asset named `name` declaring `size` bytes.
    #[must_use]
    pub fn asset(mut self, name: &str, size: u64) -> Self {
        self.assets.push((name.to_owned(), size));
        self
    }
}

/// Serialise releases into the upstream listing format.
#[must_use]
pub fn release_listing(releases: &[ReleaseFixture]) -> Vec<u8> {
    let listing: Vec<_> = releases
        .iter()
        .map(|release| {
            let assets: Vec<_> = release
                .assets
                .iter()
                .map(|(name, size)| {
                    json!({
                        "name": name,
                        "size": size,
                        "browser_download_url": asset_url(name),
                    })
                })
                .collect();
            json!({ "name": release.name, "assets": assets })
        })
        .collect();
    serde_json::Value::Array(listing).to_string().into_bytes()
}

/// A transport serving fixed bodies by URL and counting requests.
#[derive(Debug, Default)]
pub struct StubTransport {
    bodies: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl StubTransport {
    /// Create a transport that serves nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`, replacing any previous body.
    pub fn serve(&mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.bodies.insert(url.into(), body.into());
    }

    /// Number of requests made for `url`.
    #[must_use]
    pub fn request_count(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|u| *u == url).count()
    }

    fn open(&self, url: &str) -> Result<Box<dyn Read>, TransportError> {
        self.requests.borrow_mut().push(url.to_owned());
        self.bodies
            .get(url)
            .map(|body| Box::new(Cursor::new(body.clone())) as Box<dyn Read>)
            .ok_or_else(|| TransportError::NotFound {
                url: url.to_owned(),
            })
    }
}

impl Transport for StubTransport {
    fn fetch_metadata(&self, url: &str) -> Result<Box<dyn Read>, TransportError> {
        self.open(url)
    }

    fn fetch_asset(&self, url: &str) -> Result<Box<dyn Read>, TransportError> {
        self.open(url)
    }
}

/// A verifier replaying scripted outcomes, then accepting.
#[derive(Debug, Default)]
pub struct StubVerifier {
    outcomes: RefCell<VecDeque<bool>>,
    calls: Cell<usize>,
}

impl StubVerifier {
    /// A verifier that accepts every file.
    #[must_use]
    pub fn accepting() -> Self {
        Self::default()
    }

    /// A verifier returning `outcomes` in order (`true` accepts), then
    /// accepting.
    #[must_use]
    pub fn scripted(outcomes: impl IntoIterator<Item = bool>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into_iter().collect()),
            calls: Cell::new(0),
        }
    }

    /// Number of verifications performed.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl SignatureVerifier for StubVerifier {
    fn verify(&self, file: &Path, _signature: &Path) -> Result<(), VerificationError> {
        self.calls.set(self.calls.get() + 1);
        if self.outcomes.borrow_mut().pop_front().unwrap_or(true) {
            Ok(())
        } else {
            Err(VerificationError::SignatureVerificationFailed {
                file: file.to_path_buf(),
                problems: vec!["stub rejection".to_owned()],
                output: String::new(),
            })
        }
    }
}

/// A verifier factory handing out one shared [`StubVerifier`].
#[derive(Debug)]
pub struct StubVerifierFactory {
    suffix: String,
    verifier: StubVerifier,
    versions: RefCell<Vec<String>>,
}

impl StubVerifierFactory {
    /// A factory for proof assets with `suffix` backed by `verifier`.
    #[must_use]
    pub fn new(suffix: &str, verifier: StubVerifier) -> Self {
        Self {
            suffix: suffix.to_owned(),
            verifier,
            versions: RefCell::new(Vec::new()),
        }
    }

    /// The shared verifier.
    #[must_use]
    pub const fn verifier(&self) -> &StubVerifier {
        &self.verifier
    }

    /// Versions verifiers were requested for, in order.
    #[must_use]
    pub fn versions(&self) -> Vec<String> {
        self.versions.borrow().clone()
    }
}

impl VerifierFactory for StubVerifierFactory {
    fn signature_suffix(&self) -> &str {
        &self.suffix
    }

    fn verifier_for(&self, version: &str) -> Box<dyn SignatureVerifier + '_> {
        self.versions.borrow_mut().push(version.to_owned());
        Box::new(&self.verifier)
    }
}

/// One entry of a test archive.
#[derive(Debug, Clone)]
pub enum ArchiveEntry {
    /// A regular file.
    File {
        /// Path inside the archive.
        path: PathBuf,
        /// File contents.
        contents: Vec<u8>,
        /// Permission bits recorded in the header.
        mode: u32,
    },
    /// A directory.
    Dir {
        /// Path inside the archive.
        path: PathBuf,
    },
    /// A symbolic link.
    Symlink {
        /// Path inside the archive.
        path: PathBuf,
        /// Link target.
        target: PathBuf,
    },
}

impl ArchiveEntry {
    /// A regular, executable file.
    #[must_use]
    pub fn file(path: &str, contents: &[u8]) -> Self {
        Self::file_with_mode(path, contents, 0o755)
    }

    /// A regular file with the given permission bits.
    #[must_use]
    pub fn file_with_mode(path: &str, contents: &[u8], mode: u32) -> Self {
        Self::File {
            path: PathBuf::from(path),
            contents: contents.to_vec(),
            mode,
        }
    }

    /// A directory.
    #[must_use]
    pub fn dir(path: &str) -> Self {
        Self::Dir {
            path: PathBuf::from(path),
        }
    }

    /// A symbolic link to `target`.
    #[must_use]
    pub fn symlink(path: &str, target: &str) -> Self {
        Self::Symlink {
            path: PathBuf::from(path),
            target: PathBuf::from(target),
        }
    }
}

/// Build an xz-compressed tarball of `entries` in memory.
///
/// # Errors
///
/// Returns any error from the tar builder or the xz encoder.
pub fn tar_xz_bytes(entries: &[ArchiveEntry]) -> io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(XzEncoder::new(Vec::new(), 6));

    for entry in entries {
        let mut header = tar::Header::new_gnu();
        header.set_mtime(1_700_000_000);
        match entry {
            ArchiveEntry::File {
                path,
                contents,
                mode,
            } => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(*mode);
                header.set_size(contents.len() as u64);
                header.set_cksum();
                builder.append_data(&mut header, path, contents.as_slice())?;
            }
            ArchiveEntry::Dir { path } => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                header.set_cksum();
                builder.append_data(&mut header, path, io::empty())?;
            }
            ArchiveEntry::Symlink { path, target } => {
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_mode(0o777);
                header.set_size(0);
                builder.append_link(&mut header, path, target)?;
            }
        }
    }

    builder.into_inner()?.finish()
}

/// Write an xz-compressed tarball of `entries` to `path`.
///
/// # Errors
///
/// Returns any error from building the archive or writing the file.
pub fn write_tar_xz(path: &Path, entries: &[ArchiveEntry]) -> io::Result<()> {
    std::fs::write(path, tar_xz_bytes(entries)?)
}
