//! Sigstore bundle verification through an external `sigstore` client.
//!
//! The certificate identity pins the signature to the upstream release
//! workflow run for the exact release tag being installed.

use std::path::Path;
use std::time::Duration;

use log::{Level, info, log_enabled, warn};

use super::process::CommandRunner;
use super::{SignatureVerifier, VerificationError};

const IDENTITY_WORKFLOW: &str =
    "https://github.com/llvm/llvm-project/.github/workflows/release-binaries.yml";

const IDENTITY_TAG_PREFIX: &str = "llvmorg-";

/// The certificate identity expected on the bundle for `version`.
///
/// # Examples
///
/// ```
/// use clang_format_installer::verification::bundle::certificate_identity;
///
/// assert_eq!(
///     certificate_identity("18.1.8"),
///     "https://github.com/llvm/llvm-project/.github/workflows/release-binaries.yml@refs/tags/llvmorg-18.1.8",
/// );
/// ```
#[must_use]
pub fn certificate_identity(version: &str) -> String {
    format!("{IDENTITY_WORKFLOW}@refs/tags/{IDENTITY_TAG_PREFIX}{version}")
}

/// Verifies a file against a sigstore bundle.
pub struct BundleVerifier<'a> {
    runner: &'a dyn CommandRunner,
    program: String,
    identity: String,
    timeout: Duration,
}

impl<'a> BundleVerifier<'a> {
    /// Create a verifier expecting the bundle to carry `identity`.
    #[must_use]
    pub fn new(
        runner: &'a dyn CommandRunner,
        program: impl Into<String>,
        identity: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            identity: identity.into(),
            timeout,
        }
    }

    fn args(&self, file: &Path, bundle: &Path) -> Vec<String> {
        let mut args = vec![
            "verify".to_owned(),
            "github".to_owned(),
            "--bundle".to_owned(),
            bundle.display().to_string(),
            "--cert-identity".to_owned(),
            self.identity.clone(),
            file.display().to_string(),
        ];
        if log_enabled!(Level::Debug) {
            args.push("--verbose".to_owned());
        }
        args
    }
}

impl SignatureVerifier for BundleVerifier<'_> {
    fn verify(&self, file: &Path, signature: &Path) -> Result<(), VerificationError> {
        info!(
            "Verifying signature of file {} using sigstore bundle from file {}",
            file.display(),
            signature.display()
        );

        let captured = self
            .runner
            .run(&self.program, &self.args(file, signature), self.timeout)?;
        if captured.success() {
            return Ok(());
        }

        let diagnostics = captured.output.trim();
        if !diagnostics.is_empty() {
            warn!("{diagnostics}");
        }
        Err(VerificationError::SignatureVerificationFailed {
            file: file.to_path_buf(),
            problems: vec![format!(
                "{} exited with code {}",
                self.program,
                captured.code.map_or_else(|| "none".to_owned(), |c| c.to_string())
            )],
            output: captured.output,
        })
    }
}
