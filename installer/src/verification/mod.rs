//! Authenticity verification of downloaded archives.
//!
//! Two generations of upstream proof coexist: detached OpenPGP signatures
//! (`.sig`) checked against trusted keyrings, and sigstore bundles
//! (`.jsonl`) checked against a certificate identity derived from the
//! release version. Both are [`SignatureVerifier`] implementations chosen
//! once from a [`SignatureScheme`]; the download path never branches on
//! the scheme itself.
//!
//! # Sub-modules
//!
//! - [`process`] - Bounded-output external command runner.
//! - [`detached`] - `gpgv` status parsing and verifier.
//! - [`bundle`] - sigstore certificate identity and verifier.

pub mod bundle;
pub mod detached;
pub mod process;

use std::path::{Path, PathBuf};

use crate::config::Settings;
use bundle::{BundleVerifier, certificate_identity};
use detached::DetachedSignatureVerifier;
use process::CommandRunner;

/// Suffix appended to an archive name for a sigstore bundle.
pub const BUNDLE_SUFFIX: &str = ".jsonl";

/// Suffix appended to an archive name for a detached signature.
pub const DETACHED_SUFFIX: &str = ".sig";

/// Checks a file against its proof of authenticity.
#[cfg_attr(test, mockall::automock)]
pub trait SignatureVerifier {
    /// Verify `file` using the proof stored at `signature`.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::SignatureVerificationFailed`] when the
    /// proof does not vouch for the file, and other variants when the
    /// check could not be carried out at all.
    fn verify(&self, file: &Path, signature: &Path) -> Result<(), VerificationError>;
}

impl<T: SignatureVerifier + ?Sized> SignatureVerifier for &T {
    fn verify(&self, file: &Path, signature: &Path) -> Result<(), VerificationError> {
        (**self).verify(file, signature)
    }
}

/// Errors arising from signature verification.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// The proof was checked and rejected.
    #[error("signature verification of {file} failed: {}", .problems.join(", "))]
    SignatureVerificationFailed {
        /// The file whose signature was checked.
        file: PathBuf,
        /// Problem codes reported by the verifier.
        problems: Vec<String>,
        /// Captured verifier output, possibly truncated.
        output: String,
    },

    /// Verification was requested without a paired signature file.
    #[error("cannot verify {file} because no signature file was downloaded")]
    MissingSignatureFile {
        /// The file that was to be verified.
        file: PathBuf,
    },

    /// Detached verification was requested with no trusted keyrings.
    #[error("no trusted keyrings were supplied for detached signature verification")]
    NoTrustedKeys,

    /// The verifier program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// The program that failed to start.
        program: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The verifier program did not finish in time and was killed.
    #[error("{program} timed out after {seconds} seconds")]
    TimedOut {
        /// The program that was killed.
        program: String,
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// I/O error while capturing verifier output.
    #[error("verification I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VerificationError {
    /// Whether the proof itself was rejected, as opposed to the check being
    /// impossible to carry out.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::SignatureVerificationFailed { .. })
    }
}

/// Which generation of upstream proof to download and check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SignatureScheme {
    /// Sigstore bundles checked against the release workflow identity.
    #[default]
    Bundle,
    /// Detached OpenPGP signatures checked against trusted keyrings.
    Detached {
        /// Keyring files holding the trusted public keys.
        keyrings: Vec<PathBuf>,
    },
}

impl SignatureScheme {
    /// Select the scheme implied by the supplied trust material.
    ///
    /// Keyrings select detached signatures; no keyrings select bundles.
    #[must_use]
    pub fn from_keyrings(keyrings: Vec<PathBuf>) -> Self {
        if keyrings.is_empty() {
            Self::Bundle
        } else {
            Self::Detached { keyrings }
        }
    }

    /// The suffix appended to an archive name to name its proof.
    #[must_use]
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Bundle => BUNDLE_SUFFIX,
            Self::Detached { .. } => DETACHED_SUFFIX,
        }
    }
}

/// Produces the verifier for a release version.
pub trait VerifierFactory {
    /// Suffix of the proof assets this factory's verifiers consume.
    fn signature_suffix(&self) -> &str;

    /// A verifier for archives of `version`.
    fn verifier_for(&self, version: &str) -> Box<dyn SignatureVerifier + '_>;
}

/// Builds verifiers for a [`SignatureScheme`] backed by external programs.
pub struct SchemeVerifierFactory<'a> {
    scheme: SignatureScheme,
    settings: &'a Settings,
    runner: &'a dyn CommandRunner,
}

impl<'a> SchemeVerifierFactory<'a> {
    /// Create a factory for `scheme`, running programs named in `settings`
    /// through `runner`.
    #[must_use]
    pub fn new(
        scheme: SignatureScheme,
        settings: &'a Settings,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            scheme,
            settings,
            runner,
        }
    }
}

impl VerifierFactory for SchemeVerifierFactory<'_> {
    fn signature_suffix(&self) -> &str {
        self.scheme.suffix()
    }

    fn verifier_for(&self, version: &str) -> Box<dyn SignatureVerifier + '_> {
        match &self.scheme {
            SignatureScheme::Bundle => Box::new(BundleVerifier::new(
                self.runner,
                self.settings.sigstore_program(),
                certificate_identity(version),
                self.settings.verifier_timeout(),
            )),
            SignatureScheme::Detached { keyrings } => Box::new(DetachedSignatureVerifier::new(
                self.runner,
                self.settings.gpgv_program(),
                keyrings.clone(),
                self.settings.verifier_timeout(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::process::{CapturedOutput, MockCommandRunner};
    use rstest::rstest;

    #[rstest]
    #[case::none(Vec::new(), ".jsonl")]
    #[case::some(vec![PathBuf::from("trusted.kbx")], ".sig")]
    fn keyrings_select_scheme(#[case] keyrings: Vec<PathBuf>, #[case] suffix: &str) {
        assert_eq!(SignatureScheme::from_keyrings(keyrings).suffix(), suffix);
    }

    #[test]
    fn bundle_factory_runs_configured_sigstore_program() {
        let settings = Settings::from_lookup(|key| {
            (key == crate::config::SIGSTORE_PROGRAM_ENV).then(|| "/opt/sigstore".to_owned())
        });
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|program, args, _| {
                program == "/opt/sigstore" && args.iter().any(|a| a.ends_with("llvmorg-17.0.6"))
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(CapturedOutput {
                    code: Some(0),
                    output: String::new(),
                })
            });

        let factory = SchemeVerifierFactory::new(SignatureScheme::Bundle, &settings, &runner);
        assert_eq!(factory.signature_suffix(), BUNDLE_SUFFIX);
        factory
            .verifier_for("17.0.6")
            .verify(Path::new("a.tar.xz"), Path::new("a.tar.xz.jsonl"))
            .expect("verified");
    }

    #[test]
    fn detached_factory_runs_gpgv_with_keyrings() {
        let settings = Settings::default();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|program, args, _| {
                program == "gpgv" && args.iter().any(|a| a == "trusted.kbx")
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(CapturedOutput {
                    code: Some(0),
                    output: "[GNUPG:] GOODSIG K\n[GNUPG:] VALIDSIG K\n".to_owned(),
                })
            });

        let scheme = SignatureScheme::Detached {
            keyrings: vec![PathBuf::from("trusted.kbx")],
        };
        let factory = SchemeVerifierFactory::new(scheme, &settings, &runner);
        assert_eq!(factory.signature_suffix(), DETACHED_SUFFIX);
        factory
            .verifier_for("17.0.6")
            .verify(Path::new("a.tar.xz"), Path::new("a.tar.xz.sig"))
            .expect("verified");
    }

    #[test]
    fn only_rejections_are_rejections() {
        let rejected = VerificationError::SignatureVerificationFailed {
            file: PathBuf::from("f"),
            problems: vec!["BADSIG".to_owned()],
            output: String::new(),
        };
        assert!(rejected.is_rejection());
        assert!(!VerificationError::NoTrustedKeys.is_rejection());
        assert!(
            !VerificationError::TimedOut {
                program: "sigstore".to_owned(),
                seconds: 1
            }
            .is_rejection()
        );
    }
}
