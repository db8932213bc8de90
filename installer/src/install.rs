//! Final installation of the acquired binary.
//!
//! The binary is copied next to its destination under a temporary name,
//! given the source's permission bits and timestamps, and then renamed over
//! `<install_root>/bin/<tool>`. A reader of the destination sees either the
//! old binary or the new one, never a partial copy.

use std::fs::{self, File, FileTimes, Metadata};
use std::io::ErrorKind;

use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use tempfile::NamedTempFile;

/// Name of the installed tool.
pub const TOOL_NAME: &str = "clang-format";

/// Errors arising from installing the binary.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// The file to install does not exist; the download step has not run.
    #[error("file to install not found: {path} (was the download step completed?)")]
    SourceFileMissing {
        /// The expected source path.
        path: Utf8PathBuf,
    },

    /// Copying into the install directory failed.
    #[error("failed to install {from} to {to}: {source}")]
    CopyFailed {
        /// The source file.
        from: Utf8PathBuf,
        /// The destination file.
        to: Utf8PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
}

/// Copies a binary into `<install_root>/bin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installer {
    tool_name: String,
}

impl Default for Installer {
    fn default() -> Self {
        Self::new(TOOL_NAME)
    }
}

impl Installer {
    /// Create an installer placing files at `bin/<tool_name>`.
    #[must_use]
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
        }
    }

    /// The path `install` writes for `install_root`.
    #[must_use]
    pub fn destination(&self, install_root: &Utf8Path) -> Utf8PathBuf {
        install_root.join("bin").join(&self.tool_name)
    }

    /// Install `source` under `install_root`, replacing any previous file.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::SourceFileMissing`] if `source` is not an
    /// existing file and [`InstallError::CopyFailed`] if the copy or the
    /// final rename fails.
    pub fn install(
        &self,
        source: &Utf8Path,
        install_root: &Utf8Path,
    ) -> Result<Utf8PathBuf, InstallError> {
        let metadata = match fs::metadata(source) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(missing(source)),
            Err(err) if err.kind() == ErrorKind::NotFound => return Err(missing(source)),
            Err(err) => return Err(copy_failed(source, source, err)),
        };

        let dest = self.destination(install_root);
        info!("Installing {source} to {dest}");
        let fail = |err| copy_failed(source, &dest, err);

        let bin_dir = dest.parent().unwrap_or(install_root);
        fs::create_dir_all(bin_dir).map_err(fail)?;
        let staged = stage_copy(source, bin_dir, &metadata).map_err(fail)?;
        staged.persist(&dest).map_err(|err| fail(err.error))?;
        Ok(dest)
    }
}

/// Copy `source` into a temporary file in `dir`, carrying its permissions
/// and timestamps.
fn stage_copy(
    source: &Utf8Path,
    dir: &Utf8Path,
    metadata: &Metadata,
) -> std::io::Result<NamedTempFile> {
    let mut staged = tempfile::Builder::new()
        .prefix(".install-")
        .tempfile_in(dir)?;
    std::io::copy(&mut File::open(source)?, staged.as_file_mut())?;

    let file = staged.as_file();
    file.set_permissions(metadata.permissions())?;
    let mut times = FileTimes::new();
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    file.set_times(times)?;
    Ok(staged)
}

fn missing(source: &Utf8Path) -> InstallError {
    InstallError::SourceFileMissing {
        path: source.to_owned(),
    }
}

fn copy_failed(from: &Utf8Path, to: &Utf8Path, source: std::io::Error) -> InstallError {
    InstallError::CopyFailed {
        from: from.to_owned(),
        to: to.to_owned(),
        source,
    }
}
