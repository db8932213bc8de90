//! CLI argument definitions for the clang-format installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::pipeline::StopAfter;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

/// Download, verify, and install clang-format release binaries.
#[derive(Parser, Debug)]
#[command(name = "asdf-clang-format")]
#[command(version, about)]
#[command(long_about = concat!(
    "Download, verify, and install clang-format release binaries.\n\n",
    "Binaries are taken from the LLVM project's release archives. Every ",
    "archive is checked against the size upstream declares and against its ",
    "proof of authenticity before anything is extracted from it.\n\n",
    "By default, archives are verified with sigstore bundles. Supply ",
    "--trusted-keyring to verify detached OpenPGP signatures with gpgv ",
    "instead.",
))]
#[command(after_help = concat!(
    "ENVIRONMENT:\n",
    "  ASDF_CLANG_FORMAT_RELEASES_URL  Override the release-listing endpoint\n",
    "  GITHUB_TOKEN                    Authenticate release-listing requests\n",
    "  ASDF_CLANG_FORMAT_SIGSTORE      Program used to check sigstore bundles\n",
    "  ASDF_CLANG_FORMAT_GPGV          Program used to check detached signatures\n\n",
    "EXAMPLES:\n",
    "  List installable versions:\n",
    "    $ asdf-clang-format list-all\n\n",
    "  Download and install a version:\n",
    "    $ asdf-clang-format download --clang-format-version 18.1.8 --download-dir dl\n",
    "    $ asdf-clang-format install --clang-format-version 18.1.8 \\\n",
    "        --download-dir dl --install-dir ~/.local/clang-format",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Logging threshold.
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    /// Shorthand for `--log-level debug`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Shorthand for `--log-level warn`.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Keep downloads in this directory so later runs can reuse them
    /// [default: a temporary directory removed on exit].
    #[arg(long, value_name = "DIR", global = true)]
    pub temp_dir: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the versions installable on this platform.
    ListAll,

    /// Download, verify, and extract a version.
    Download(DownloadArgs),

    /// Install a previously downloaded version.
    Install(InstallArgs),
}

/// Arguments for the download command.
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Version to download, e.g. `18.1.8`.
    #[arg(long, value_name = "VERSION")]
    pub clang_format_version: String,

    /// Directory that receives the extracted `clang-format` binary.
    #[arg(long, value_name = "DIR")]
    pub download_dir: Utf8PathBuf,

    /// Stop after the given stage.
    #[arg(long, value_enum, value_name = "STAGE")]
    pub stop_after: Option<Stage>,

    /// Verify detached signatures against this keyring (can be repeated).
    #[arg(long, value_name = "KEYRING")]
    pub trusted_keyring: Vec<PathBuf>,
}

/// Arguments for the install command.
#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    /// Version to install.
    #[arg(long, value_name = "VERSION")]
    pub clang_format_version: String,

    /// Directory the download command extracted the binary into.
    #[arg(long, value_name = "DIR")]
    pub download_dir: Utf8PathBuf,

    /// Installation root; the binary is placed in its `bin` directory.
    #[arg(long, value_name = "DIR")]
    pub install_dir: Utf8PathBuf,
}

/// Logging thresholds accepted by `--log-level`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Step details, including verifier invocations.
    Debug,
    /// Pipeline steps.
    Info,
    /// Warnings and errors only.
    Warn,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Self::Debug,
            LogLevel::Info => Self::Info,
            LogLevel::Warn => Self::Warn,
        }
    }
}

/// Stages the download command can stop after.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// After the archive's signature has been verified.
    Verify,
}

impl DownloadArgs {
    /// How far the download pipeline should run.
    #[must_use]
    pub const fn stop_after(&self) -> StopAfter {
        match self.stop_after {
            Some(Stage::Verify) => StopAfter::Verify,
            None => StopAfter::Extract,
        }
    }
}

impl Cli {
    /// The effective logging threshold.
    ///
    /// `-v` and `-q` take precedence over `--log-level`.
    ///
    /// # Examples
    ///
    /// ```
    /// use clang_format_installer::cli::Cli;
    /// use clap::Parser;
    /// use log::LevelFilter;
    ///
    /// let cli = Cli::parse_from(["asdf-clang-format", "-q", "list-all"]);
    /// assert_eq!(cli.level_filter(), LevelFilter::Warn);
    /// ```
    #[must_use]
    pub fn level_filter(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Warn
        } else {
            self.log_level.into()
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
