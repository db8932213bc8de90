//! Running external verifier programs with bounded output capture.
//!
//! Standard output and standard error share one anonymous temporary file,
//! so interleaving matches what a terminal would show and neither pipe can
//! fill up and stall the child. Only a fixed-size prefix is read back.

use std::io::{Read, Seek, SeekFrom};
use std::process::{Command, Stdio};
use std::time::Duration;

use log::debug;
use wait_timeout::ChildExt;

use super::VerificationError;

/// Maximum number of bytes of combined output kept for diagnostics.
pub const OUTPUT_CAPTURE_LIMIT: u64 = 128 * 1024;

/// Exit status and captured output of a finished verifier process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Exit code, or `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    /// Combined stdout and stderr, lossily decoded and truncated to
    /// [`OUTPUT_CAPTURE_LIMIT`] bytes.
    pub output: String,
}

impl CapturedOutput {
    /// Whether the process exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Abstraction for running verifier programs, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    /// Run `program` with `args`, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Spawn`] if the program cannot be
    /// started, [`VerificationError::TimedOut`] if it outlives `timeout`
    /// (it is killed), and [`VerificationError::Io`] if the output cannot
    /// be read back.
    fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CapturedOutput, VerificationError>;
}

/// Runs verifier programs on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CapturedOutput, VerificationError> {
        debug!("Running command: {program} {}", args.join(" "));
        let mut capture = tempfile::tempfile()?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(capture.try_clone()?))
            .stderr(Stdio::from(capture.try_clone()?))
            .spawn()
            .map_err(|source| VerificationError::Spawn {
                program: program.to_owned(),
                source,
            })?;

        let Some(status) = child.wait_timeout(timeout)? else {
            if let Err(err) = child.kill() {
                debug!("Failed to kill {program}: {err}");
            }
            if let Err(err) = child.wait() {
                debug!("Failed to reap {program}: {err}");
            }
            return Err(VerificationError::TimedOut {
                program: program.to_owned(),
                seconds: timeout.as_secs(),
            });
        };

        capture.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::new();
        capture.take(OUTPUT_CAPTURE_LIMIT).read_to_end(&mut bytes)?;

        Ok(CapturedOutput {
            code: status.code(),
            output: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}
