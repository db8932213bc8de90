//! Single-file extraction from `.tar.xz` release archives.
//!
//! The archive is streamed through an xz decoder; it is never loaded into
//! memory as a whole. Only regular files whose base name equals the target
//! are candidates, and every entry is scanned so that a second candidate
//! is reported rather than silently ignored.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use log::debug;
use xz2::read::XzDecoder;

use crate::progress::ProgressSink;

/// Estimated number of entries in an upstream release archive, used as the
/// progress total.
pub const ESTIMATED_ENTRY_COUNT: u64 = 11_000;

/// Permission bits kept on an extracted file: no setuid, setgid, or sticky
/// bit, and no write access for group or others.
pub const EXTRACTED_MODE_MASK: u32 = 0o755;

/// Extracts exactly one named file from an archive.
pub trait ArchiveExtractor {
    /// Extract the single regular file named `target_name` from the
    /// archive at `archive_path` into `dest_dir`.
    ///
    /// The entry keeps its in-archive path below `dest_dir`; the full path
    /// of the written file is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::FileNotFoundInArchive`] when no entry
    /// matches, [`ExtractionError::MultipleFilesFoundInArchive`] when more
    /// than one does (the first is still written), and
    /// [`ExtractionError::PathTraversal`] for a matching entry that would
    /// land outside `dest_dir`.
    fn extract_single_file(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
        target_name: &str,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error while reading the archive or writing the entry.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// No regular file with the target name exists in the archive.
    #[error("file {name} not found in archive {archive}")]
    FileNotFoundInArchive {
        /// The target file name.
        name: String,
        /// The archive that was scanned.
        archive: PathBuf,
    },

    /// More than one regular file with the target name exists.
    #[error("found {count} files named {name} in archive, but expected exactly 1")]
    MultipleFilesFoundInArchive {
        /// The target file name.
        name: String,
        /// Number of matching entries.
        count: usize,
        /// Where the first match was written.
        extracted: PathBuf,
    },
}

/// Extractor for xz-compressed tarballs.
#[derive(Debug, Default, Clone, Copy)]
pub struct XzTarExtractor;

impl ArchiveExtractor for XzTarExtractor {
    fn extract_single_file(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
        target_name: &str,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, ExtractionError> {
        debug!("Extracting {target_name} from {}", archive_path.display());
        std::fs::create_dir_all(dest_dir)?;
        let file = File::open(archive_path)?;
        let mut archive = tar::Archive::new(XzDecoder::new(BufReader::new(file)));
        archive.set_preserve_permissions(true);
        archive.set_preserve_mtime(true);

        progress.begin(&format!("Extracting {target_name}"), ESTIMATED_ENTRY_COUNT);
        let scanned = scan_for_single_file(&mut archive, dest_dir, target_name, progress);
        progress.finish();

        let Scan { first, count } = scanned?;
        match first {
            None => Err(ExtractionError::FileNotFoundInArchive {
                name: target_name.to_owned(),
                archive: archive_path.to_path_buf(),
            }),
            Some(extracted) if count > 1 => Err(ExtractionError::MultipleFilesFoundInArchive {
                name: target_name.to_owned(),
                count,
                extracted,
            }),
            Some(extracted) => Ok(extracted),
        }
    }
}

struct Scan {
    first: Option<PathBuf>,
    count: usize,
}

fn scan_for_single_file<R: Read>(
    archive: &mut tar::Archive<R>,
    dest_dir: &Path,
    target_name: &str,
    progress: &dyn ProgressSink,
) -> Result<Scan, ExtractionError> {
    let mut scan = Scan {
        first: None,
        count: 0,
    };

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        progress.advance(1);

        // Links and special files are never candidates.
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let entry_path = entry.path()?.into_owned();
        if entry_path.file_name() != Some(OsStr::new(target_name)) {
            continue;
        }
        validate_entry_path(&entry_path)?;
        scan.count += 1;

        if scan.first.is_none() {
            if !entry.unpack_in(dest_dir)? {
                return Err(traversal(&entry_path));
            }
            let extracted = dest_dir.join(&entry_path);
            restrict_mode(&extracted)?;
            scan.first = Some(extracted);
        } else {
            debug!("Another {target_name} at {}", entry_path.display());
        }
    }

    Ok(scan)
}

#[cfg(unix)]
fn restrict_mode(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() & EXTRACTED_MODE_MASK);
    std::fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
const fn restrict_mode(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Validate that a tar entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    if path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(traversal(path));
    }
    Ok(())
}

fn traversal(path: &Path) -> ExtractionError {
    ExtractionError::PathTraversal {
        path: path.display().to_string(),
    }
}
