//! Scratch directories for downloads and extraction.
//!
//! An ephemeral scratch space lives in the system temporary directory and
//! is removed when dropped. A persistent one lives under a caller-chosen
//! root, keyed by name, and survives the process so that a later run can
//! reuse a verified download.

use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::TempDir;

/// Where scratch directories are created.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScratchSpace {
    /// A fresh temporary directory per use, removed on drop.
    #[default]
    Ephemeral,
    /// A stable directory per name below the given root, never removed.
    Persistent(PathBuf),
}

impl ScratchSpace {
    /// Open the scratch directory for `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn dir_for(&self, name: &str) -> io::Result<ScratchDir> {
        let scrubbed = scrubbed_file_name(name);
        match self {
            Self::Ephemeral => {
                let guard = tempfile::Builder::new()
                    .prefix(&format!("{scrubbed}_"))
                    .tempdir()?;
                Ok(ScratchDir {
                    path: guard.path().to_path_buf(),
                    _guard: Some(guard),
                })
            }
            Self::Persistent(root) => {
                let path = root.join(scrubbed);
                std::fs::create_dir_all(&path)?;
                debug!("Using persistent scratch directory {}", path.display());
                Ok(ScratchDir { path, _guard: None })
            }
        }
    }
}

/// An open scratch directory.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    _guard: Option<TempDir>,
}

impl ScratchDir {
    /// The directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// An empty subdirectory for `name`.
    ///
    /// The path is the same on every call, and whatever an earlier run left
    /// there is removed first.
    ///
    /// # Errors
    ///
    /// Returns an error if stale contents cannot be removed or the
    /// subdirectory cannot be created.
    pub fn subdir(&self, name: &str) -> io::Result<PathBuf> {
        let path = self.path.join(scrubbed_file_name(name));
        match std::fs::remove_dir_all(&path) {
            Ok(()) => debug!("Removed stale {}", path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }
}

/// Replace every character that is not alphanumeric or `_` with `_`.
///
/// # Examples
///
/// ```
/// use clang_format_installer::scratch::scrubbed_file_name;
///
/// assert_eq!(scrubbed_file_name("v18.1.8"), "v18_1_8");
/// assert_eq!(scrubbed_file_name("../x"), "___x");
/// ```
#[must_use]
pub fn scrubbed_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
