//! Scanner capture step.
//!
//! The scanner itself is driven by a separate vendor executable.  The
//! orchestrator only needs to start it, wait for it, and learn how it exited,
//! which is what [`CaptureRunner`] abstracts.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use scanbridge_types::ScanError;
use tokio::process::Command;
use tracing::debug;

/// How a capture run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOutcome {
    /// Process exit code; `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

impl CaptureOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Something that performs one scanner capture and reports its outcome.
#[async_trait]
pub trait CaptureRunner: Send {
    /// Run one capture to completion.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Capture`] if the capture could not be started at
    /// all.  A capture that starts and then fails is reported through
    /// [`CaptureOutcome::exit_code`] instead.
    async fn capture(&mut self) -> Result<CaptureOutcome, ScanError>;
}

/// Runs an external capture executable as a child process and waits for it.
#[derive(Debug, Clone)]
pub struct ProcessCapture {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessCapture {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

#[async_trait]
impl CaptureRunner for ProcessCapture {
    async fn capture(&mut self) -> Result<CaptureOutcome, ScanError> {
        debug!(program = %self.program.display(), args = ?self.args, "spawning capture process");
        let started = Instant::now();
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .await
            .map_err(|e| ScanError::Capture(format!("{}: {e}", self.program.display())))?;
        Ok(CaptureOutcome {
            exit_code: status.code(),
            elapsed: started.elapsed(),
        })
    }
}
