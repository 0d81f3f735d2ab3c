//! Traits and types for running the external fetch tool

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// One invocation of the external tool
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Argument list (the binary itself is owned by the fetcher)
    pub args: Vec<String>,
    /// Working directory the tool writes its output into
    pub cwd: PathBuf,
    /// Wall-clock bound; the child is killed when it elapses
    pub timeout: Duration,
    /// Redirect stdout and stderr into this file instead of capturing them
    pub log_file: Option<PathBuf>,
}

impl Invocation {
    /// Create an invocation with captured output
    pub fn new(args: Vec<String>, cwd: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            args,
            cwd: cwd.into(),
            timeout,
            log_file: None,
        }
    }

    /// Send the tool's output to a log file
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }
}

/// What happened to one invocation
///
/// Only the exit status is interpreted by the caller. The captured streams are
/// empty when the output went to a log file.
#[must_use]
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Exit code, `None` if the process was killed or terminated by a signal
    pub exit_code: Option<i32>,
    /// Whether the timeout elapsed and the child was killed
    pub timed_out: bool,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl RunOutcome {
    /// Exited on its own with status 0
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Short description for logs and diagnostic messages
    pub fn describe(&self) -> String {
        match (self.timed_out, self.exit_code) {
            (true, _) => "timed out".to_string(),
            (false, Some(code)) => format!("exit code {code}"),
            (false, None) => "terminated by signal".to_string(),
        }
    }
}

/// Capability to run the external fetch tool
///
/// The tool is a black box: it receives an argument list, writes files into the
/// working directory, and exits. Implementations can spawn a real binary, or
/// script the effects for tests.
///
/// # Errors
///
/// `run` fails only when the tool cannot be started at all. A non-zero exit or a
/// timeout is a normal [`RunOutcome`].
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Run the tool once and wait for it (bounded by the invocation's timeout)
    async fn run(&self, invocation: Invocation) -> crate::Result<RunOutcome>;

    /// Get the name of this implementation
    fn name(&self) -> &'static str;
}
