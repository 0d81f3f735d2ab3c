//! CLI-based fetcher using the external yt-dlp binary

use super::traits::{Invocation, MediaFetcher, RunOutcome};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Fetcher that spawns the external yt-dlp binary
///
/// Every invocation runs in its own child process with stdin closed. On Unix the
/// child leads a fresh process group, and when the invocation's timeout elapses
/// the whole group is killed, including any ffmpeg the tool started. The child
/// itself is also killed if the future driving it is dropped.
///
/// # Examples
///
/// ```no_run
/// use media_dl::fetcher::{CliFetcher, Invocation, MediaFetcher};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = CliFetcher::from_path().expect("yt-dlp not found in PATH");
///
/// let outcome = fetcher
///     .run(Invocation::new(
///         vec!["--version".into()],
///         "/tmp",
///         Duration::from_secs(10),
///     ))
///     .await?;
/// println!("{}", outcome.stdout.trim());
/// # Ok(())
/// # }
/// ```
pub struct CliFetcher {
    binary_path: PathBuf,
}

impl CliFetcher {
    /// Create a new CLI fetcher with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find yt-dlp in PATH
    ///
    /// Returns `None` if the binary is not found.
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Path of the binary this fetcher spawns
    pub fn binary_path(&self) -> &PathBuf {
        &self.binary_path
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    async fn run_logged(
        &self,
        invocation: &Invocation,
        log_path: &PathBuf,
    ) -> crate::Result<RunOutcome> {
        let log = std::fs::File::create(log_path)?;
        let log_err = log.try_clone()?;

        let mut child = self
            .command(invocation)
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .spawn()
            .map_err(|e| {
                crate::Error::ExternalTool(format!(
                    "failed to execute {}: {}",
                    self.binary_path.display(),
                    e
                ))
            })?;
        let pid = child.id();

        match tokio::time::timeout(invocation.timeout, child.wait()).await {
            Ok(status) => Ok(RunOutcome {
                exit_code: status?.code(),
                ..RunOutcome::default()
            }),
            Err(_) => {
                tracing::warn!(
                    timeout = ?invocation.timeout,
                    log = %log_path.display(),
                    "fetch timed out, killing child"
                );
                kill_process_group(pid);
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "failed to kill timed out child");
                }
                Ok(RunOutcome {
                    timed_out: true,
                    ..RunOutcome::default()
                })
            }
        }
    }

    async fn run_captured(&self, invocation: &Invocation) -> crate::Result<RunOutcome> {
        let child = self
            .command(invocation)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                crate::Error::ExternalTool(format!(
                    "failed to execute {}: {}",
                    self.binary_path.display(),
                    e
                ))
            })?;
        let pid = child.id();

        // Dropping the future on timeout drops the child, which kills it.
        match tokio::time::timeout(invocation.timeout, child.wait_with_output()).await {
            Ok(output) => {
                let output = output?;
                Ok(RunOutcome {
                    exit_code: output.status.code(),
                    timed_out: false,
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
            Err(_) => {
                kill_process_group(pid);
                tracing::warn!(timeout = ?invocation.timeout, "fetch timed out, child killed");
                Ok(RunOutcome {
                    timed_out: true,
                    ..RunOutcome::default()
                })
            }
        }
    }
}

/// Kill every process in the group led by `pid`
///
/// Processes that already exited are not an error.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    // SAFETY: kill(2) only sends a signal; no memory is shared with the callee.
    let rc = unsafe { libc::kill(-pid, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pid, error = %err, "failed to kill process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[async_trait]
impl MediaFetcher for CliFetcher {
    async fn run(&self, invocation: Invocation) -> crate::Result<RunOutcome> {
        tracing::debug!(
            binary = %self.binary_path.display(),
            cwd = %invocation.cwd.display(),
            args = invocation.args.len(),
            "spawning fetcher"
        );
        match &invocation.log_file {
            Some(log_path) => self.run_logged(&invocation, log_path).await,
            None => self.run_captured(&invocation).await,
        }
    }

    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }
}
