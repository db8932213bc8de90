//! Byte-exact asset downloads with signature verification.
//!
//! A download streams the asset body to its destination while counting
//! bytes against the size the release host declared. Receiving more than
//! declared aborts immediately; receiving less fails once the stream ends.
//! A download always restarts from byte zero; there is no partial resume.

use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::catalog::ReleaseAsset;
use crate::progress::ProgressSink;
use crate::transport::{Transport, TransportError};
use crate::verification::{SignatureVerifier, VerificationError};

/// Size of each read from the response body.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Errors arising from downloading or verifying an asset.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The asset could not be requested.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server sent more bytes than the asset's declared size.
    #[error("downloaded more than the expected {expected} bytes from {url}")]
    TooManyBytesDownloaded {
        /// The asset URL.
        url: String,
        /// The declared size.
        expected: u64,
    },

    /// The stream ended before the asset's declared size was reached.
    #[error("downloaded {received} bytes from {url}, but expected {expected}")]
    TooFewBytesDownloaded {
        /// The asset URL.
        url: String,
        /// The declared size.
        expected: u64,
        /// Bytes actually received.
        received: u64,
    },

    /// The downloaded file failed verification.
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// I/O error reading the body or writing the destination.
    #[error("download I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Whether the error is a rejected signature.
    #[must_use]
    pub const fn is_signature_rejection(&self) -> bool {
        matches!(self, Self::Verification(err) if err.is_rejection())
    }
}

/// How [`SecureDownloader::download_if_needed_and_verify`] obtained a
/// verified file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The asset was downloaded and verified.
    Downloaded,
    /// A previously downloaded file verified and was kept.
    ReusedCache,
}

struct Verification<'a> {
    verifier: &'a dyn SignatureVerifier,
    signature_file: PathBuf,
}

/// Downloads one asset to one destination, optionally verifying it.
pub struct SecureDownloader<'a> {
    transport: &'a dyn Transport,
    progress: &'a dyn ProgressSink,
    asset: &'a ReleaseAsset,
    dest: PathBuf,
    verification: Option<Verification<'a>>,
}

impl<'a> SecureDownloader<'a> {
    /// Create a downloader for `asset` writing to `dest`.
    #[must_use]
    pub fn new(
        transport: &'a dyn Transport,
        progress: &'a dyn ProgressSink,
        asset: &'a ReleaseAsset,
        dest: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            progress,
            asset,
            dest: dest.into(),
            verification: None,
        }
    }

    /// Verify downloads with `verifier` against the proof at
    /// `signature_file`.
    #[must_use]
    pub fn with_verification(
        mut self,
        verifier: &'a dyn SignatureVerifier,
        signature_file: impl Into<PathBuf>,
    ) -> Self {
        self.verification = Some(Verification {
            verifier,
            signature_file: signature_file.into(),
        });
        self
    }

    /// The destination path.
    #[must_use]
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Stream the asset to the destination, enforcing its declared size.
    ///
    /// The destination's parent directory is created if absent and any
    /// existing file is truncated.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::TooManyBytesDownloaded`] as soon as the
    /// running count exceeds the declared size,
    /// [`DownloadError::TooFewBytesDownloaded`] if the stream ends short,
    /// and transport or I/O errors otherwise.
    pub fn download(&self) -> Result<(), DownloadError> {
        let url = self.asset.download_url.as_str();
        info!("Downloading {url} to {}", self.dest.display());

        if let Some(parent) = self.dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut body = self.transport.fetch_asset(url)?;
        let mut file = File::create(&self.dest)?;

        self.progress.begin(&self.asset.name, self.asset.size);
        let copied = self.copy_exact(&mut body, &mut file);
        self.progress.finish();
        let received = copied?;

        if received < self.asset.size {
            return Err(DownloadError::TooFewBytesDownloaded {
                url: url.to_owned(),
                expected: self.asset.size,
                received,
            });
        }
        file.flush()?;
        debug!("Downloaded {received} bytes to {}", self.dest.display());
        Ok(())
    }

    fn copy_exact(&self, body: &mut dyn Read, file: &mut File) -> Result<u64, DownloadError> {
        let expected = self.asset.size;
        let mut buffer = vec![0_u8; CHUNK_SIZE];
        let mut received: u64 = 0;

        loop {
            let read = match body.read(&mut buffer) {
                Ok(0) => return Ok(received),
                Ok(read) => read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            received = received.saturating_add(read as u64);
            if received > expected {
                return Err(DownloadError::TooManyBytesDownloaded {
                    url: self.asset.download_url.clone(),
                    expected,
                });
            }
            let (chunk, _) = buffer.split_at(read);
            file.write_all(chunk)?;
            self.progress.advance(read as u64);
        }
    }

    /// Verify the destination file against its paired proof.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::MissingSignatureFile`] if no proof was
    /// paired with this download, otherwise the verifier's error.
    pub fn verify(&self) -> Result<(), DownloadError> {
        let Some(verification) = &self.verification else {
            return Err(VerificationError::MissingSignatureFile {
                file: self.dest.clone(),
            }
            .into());
        };
        verification
            .verifier
            .verify(&self.dest, &verification.signature_file)?;
        info!("Verified {}", self.dest.display());
        Ok(())
    }

    /// Download the asset, then verify it.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Self::download`] or [`Self::verify`].
    pub fn download_and_verify(&self) -> Result<(), DownloadError> {
        self.download()?;
        self.verify()
    }

    /// Reuse a previously downloaded file if it still verifies, otherwise
    /// download and verify from scratch.
    ///
    /// Only three outcomes lead to a fresh download: the cached file's size
    /// differs from the declared size, its metadata cannot be read, or the
    /// verifier rejects its signature. Any other verification error, such as
    /// a missing verifier program or a timeout, is returned as is and the
    /// cached file is left alone.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Self::download_and_verify`], or a
    /// non-rejection verification error from checking the cached file.
    pub fn download_if_needed_and_verify(&self) -> Result<DownloadOutcome, DownloadError> {
        match std::fs::metadata(&self.dest) {
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                "Unable to inspect cached {}: {err}; downloading it again",
                self.dest.display()
            ),
            Ok(metadata) if metadata.len() != self.asset.size => warn!(
                "Cached {} has {} bytes, but expected {}; downloading it again",
                self.dest.display(),
                metadata.len(),
                self.asset.size
            ),
            Ok(_) => match self.verify() {
                Ok(()) => {
                    info!("Using cached {}", self.dest.display());
                    return Ok(DownloadOutcome::ReusedCache);
                }
                Err(err) if err.is_signature_rejection() => warn!(
                    "Cached {} failed verification; downloading it again: {err}",
                    self.dest.display()
                ),
                Err(err) => return Err(err),
            },
        }

        self.download_and_verify()?;
        Ok(DownloadOutcome::Downloaded)
    }
}

#[cfg(test)]
#[path = "download_tests.rs"]
mod tests;
