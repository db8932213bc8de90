//! The operation surface: listing, downloading, and installing.
//!
//! Every operation runs its stages strictly in sequence: fetch the release
//! listing, resolve the current platform's artifact, download and verify,
//! extract, and move into place. Nothing is retried except the single
//! cache re-download inside the secure downloader.

use std::fs;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};

use crate::artefact::error::ResolveError;
use crate::artefact::extraction::ArchiveExtractor;
use crate::artefact::resolver::{
    PlatformArtifact, artifacts_for_version, find_release, select_for_platform,
};
use crate::artefact::target::Platform;
use crate::catalog::{ReleaseCatalog, ReleaseInfo};
use crate::download::SecureDownloader;
use crate::error::Result;
use crate::install::{Installer, TOOL_NAME};
use crate::progress::ProgressSink;
use crate::scratch::ScratchSpace;
use crate::transport::Transport;
use crate::verification::VerifierFactory;

/// Name of the scratch subdirectory the binary is extracted into.
const EXTRACTION_SUBDIR: &str = "clang_format_bin";

/// Collaborators for a pipeline run.
pub struct PipelineContext<'a> {
    /// Source of release metadata and asset bytes.
    pub transport: &'a dyn Transport,
    /// Release-listing endpoint.
    pub releases_url: &'a str,
    /// Signature scheme and its verifiers.
    pub verifiers: &'a dyn VerifierFactory,
    /// Archive extractor.
    pub extractor: &'a dyn ArchiveExtractor,
    /// The platform to resolve artifacts for.
    pub platform: &'a Platform,
    /// Where downloads and extraction are staged.
    pub scratch: &'a ScratchSpace,
    /// Observer for download and extraction progress.
    pub progress: &'a dyn ProgressSink,
}

/// How far [`download`] goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopAfter {
    /// Extract the binary into the download directory.
    #[default]
    Extract,
    /// Stop once the archive's signature has been verified.
    Verify,
}

/// What [`download`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadReport {
    /// The archive was verified; nothing was extracted.
    ///
    /// The archive stays in scratch space, which only outlives the call
    /// when it is persistent.
    Verified {
        /// The release version whose archive was verified.
        version: String,
    },
    /// The binary was extracted into the download directory.
    Extracted {
        /// The extracted binary.
        binary: Utf8PathBuf,
    },
}

/// Versions whose current-platform artifact resolves, in upstream order.
///
/// Releases without a usable artifact for the platform are skipped.
///
/// # Errors
///
/// Returns catalog errors, and resolution errors other than a missing or
/// ambiguous platform artifact.
pub fn list_all(context: &PipelineContext<'_>) -> Result<Vec<String>> {
    let releases = fetch_releases(context)?;
    let mut versions = Vec::new();

    for release in &releases {
        match artifact_for_release(context, release) {
            Ok(_) => versions.push(release.version.clone()),
            Err(
                err @ (ResolveError::ArtifactNotFound { .. }
                | ResolveError::AmbiguousArtifact { .. }),
            ) => debug!("Skipping version {}: {err}", release.version),
            Err(err) => return Err(err.into()),
        }
    }

    Ok(versions)
}

/// Download, verify, and extract `version` into `download_dir`.
///
/// The signature asset is always fetched fresh. The archive is reused from
/// scratch space when it still verifies. The extracted binary is moved to
/// `download_dir/clang-format`.
///
/// # Errors
///
/// Returns the first error of any stage.
pub fn download(
    context: &PipelineContext<'_>,
    version: &str,
    download_dir: &Utf8Path,
    stop_after: StopAfter,
) -> Result<DownloadReport> {
    info!("Downloading clang-format version {version}");
    let releases = fetch_releases(context)?;
    let release = find_release(&releases, version)?;
    let artifact = artifact_for_release(context, release)?;

    let scratch = context.scratch.dir_for(&format!("v{version}"))?;
    let signature_path = scratch
        .path()
        .join(local_file_name(&artifact.signature_asset.name));
    SecureDownloader::new(
        context.transport,
        context.progress,
        &artifact.signature_asset,
        &signature_path,
    )
    .download()?;

    let archive_path = scratch
        .path()
        .join(local_file_name(&artifact.archive_asset.name));
    let verifier = context.verifiers.verifier_for(&release.version);
    SecureDownloader::new(
        context.transport,
        context.progress,
        &artifact.archive_asset,
        &archive_path,
    )
    .with_verification(verifier.as_ref(), &signature_path)
    .download_if_needed_and_verify()?;

    if stop_after == StopAfter::Verify {
        info!(
            "Stopping after verifying the signature of {}, as requested",
            archive_path.display()
        );
        return Ok(DownloadReport::Verified {
            version: release.version.clone(),
        });
    }

    // Emptied on every run; persistent scratch keeps only the latest extraction.
    let extracted = context.extractor.extract_single_file(
        &archive_path,
        &scratch.subdir(EXTRACTION_SUBDIR)?,
        TOOL_NAME,
        context.progress,
    )?;

    let binary = download_dir.join(TOOL_NAME);
    info!("Moving {} to {binary}", extracted.display());
    fs::create_dir_all(download_dir)?;
    move_file(&extracted, binary.as_std_path())?;
    Ok(DownloadReport::Extracted { binary })
}

/// Install the previously downloaded binary into `install_dir/bin`.
///
/// # Errors
///
/// Returns [`crate::install::InstallError::SourceFileMissing`] (wrapped) if
/// [`download`] has not completed for `download_dir`.
pub fn install(
    version: &str,
    download_dir: &Utf8Path,
    install_dir: &Utf8Path,
) -> Result<Utf8PathBuf> {
    info!("Installing clang-format version {version}");
    Installer::default()
        .install(&download_dir.join(TOOL_NAME), install_dir)
        .map_err(Into::into)
}

fn fetch_releases(context: &PipelineContext<'_>) -> Result<Vec<ReleaseInfo>> {
    ReleaseCatalog::new(context.transport, context.releases_url)
        .fetch_releases()
        .map_err(Into::into)
}

fn artifact_for_release(
    context: &PipelineContext<'_>,
    release: &ReleaseInfo,
) -> std::result::Result<PlatformArtifact, ResolveError> {
    let artifacts = artifacts_for_version(
        &release.version,
        &release.assets,
        context.verifiers.signature_suffix(),
    )?;
    select_for_platform(&artifacts, context.platform)
}

/// The final path component of an asset name, so that a name can never
/// place a file outside the scratch directory.
fn local_file_name(asset_name: &str) -> &str {
    match asset_name.rsplit('/').next() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => name,
        _ => "asset",
    }
}

/// Rename `from` to `to`, copying when they are on different filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Err(err) = fs::rename(from, to) {
        debug!("Rename failed ({err}); copying instead");
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
