//! Detached OpenPGP signature verification through `gpgv`.
//!
//! `gpgv` is run with `--status-fd 1` so that its machine-readable status
//! lines land in the captured output. A signature is accepted only when
//! the process succeeds, both `GOODSIG` and `VALIDSIG` are reported, and
//! no problem status appears.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};

use super::process::CommandRunner;
use super::{SignatureVerifier, VerificationError};

/// Prefix of every `gpgv` status line.
pub const STATUS_PREFIX: &str = "[GNUPG:] ";

const REQUIRED_STATUSES: &[&str] = &["GOODSIG", "VALIDSIG"];

const PROBLEM_STATUSES: &[&str] = &[
    "BADSIG",
    "ERRSIG",
    "EXPSIG",
    "EXPKEYSIG",
    "REVKEYSIG",
    "NO_PUBKEY",
];

/// Verifies a file against a detached signature using trusted keyrings.
pub struct DetachedSignatureVerifier<'a> {
    runner: &'a dyn CommandRunner,
    program: String,
    keyrings: Vec<PathBuf>,
    timeout: Duration,
}

impl<'a> DetachedSignatureVerifier<'a> {
    /// Create a verifier running `program` against `keyrings`.
    ///
    /// Relative keyring paths are resolved against the current directory
    /// here, because `gpgv` looks up a bare keyring name in its home
    /// directory instead.
    #[must_use]
    pub fn new(
        runner: &'a dyn CommandRunner,
        program: impl Into<String>,
        keyrings: Vec<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            keyrings: keyrings.into_iter().map(absolute_keyring).collect(),
            timeout,
        }
    }

    fn args(&self, file: &Path, signature: &Path) -> Vec<String> {
        let mut args = vec!["--status-fd".to_owned(), "1".to_owned()];
        for keyring in &self.keyrings {
            args.push("--keyring".to_owned());
            args.push(keyring.display().to_string());
        }
        args.push(signature.display().to_string());
        args.push(file.display().to_string());
        args
    }
}

impl SignatureVerifier for DetachedSignatureVerifier<'_> {
    fn verify(&self, file: &Path, signature: &Path) -> Result<(), VerificationError> {
        if self.keyrings.is_empty() {
            return Err(VerificationError::NoTrustedKeys);
        }
        info!(
            "Verifying signature of file {} using signature from file {}",
            file.display(),
            signature.display()
        );

        let captured = self
            .runner
            .run(&self.program, &self.args(file, signature), self.timeout)?;
        let statuses = status_keywords(&captured.output);
        let reported = signature_problems(&statuses);

        if captured.success() && reported.is_empty() {
            return Ok(());
        }

        let problems = if reported.is_empty() {
            vec![format!(
                "{} exited with code {}",
                self.program,
                captured.code.map_or_else(|| "none".to_owned(), |c| c.to_string())
            )]
        } else {
            reported
        };
        warn!("{}", captured.output.trim());
        Err(VerificationError::SignatureVerificationFailed {
            file: file.to_path_buf(),
            problems,
            output: captured.output,
        })
    }
}

fn absolute_keyring(keyring: PathBuf) -> PathBuf {
    std::path::absolute(&keyring).unwrap_or_else(|err| {
        warn!("Cannot resolve keyring {}: {err}", keyring.display());
        keyring
    })
}

/// Extract the keyword of every `[GNUPG:]` status line in `output`.
///
/// # Examples
///
/// ```
/// use clang_format_installer::verification::detached::status_keywords;
///
/// let output = "[GNUPG:] NEWSIG\ngpgv: Good signature\n[GNUPG:] GOODSIG ABCD Alice\n";
/// assert_eq!(status_keywords(output), vec!["NEWSIG", "GOODSIG"]);
/// ```
#[must_use]
pub fn status_keywords(output: &str) -> Vec<&str> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix(STATUS_PREFIX))
        .filter_map(|rest| rest.split_whitespace().next())
        .collect()
}

/// The problem codes implied by a set of status keywords.
///
/// Problem statuses are reported as-is; a missing required status is
/// reported as `MISSING_<STATUS>`. An empty result means the signature is
/// good.
#[must_use]
pub fn signature_problems(statuses: &[&str]) -> Vec<String> {
    let reported = statuses
        .iter()
        .filter(|status| PROBLEM_STATUSES.contains(status))
        .map(|status| (*status).to_owned());
    let missing = REQUIRED_STATUSES
        .iter()
        .filter(|required| !statuses.contains(required))
        .map(|required| format!("MISSING_{required}"));
    reported.chain(missing).collect()
}
