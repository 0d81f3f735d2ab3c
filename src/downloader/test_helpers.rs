//! Shared test helpers: a scripted fetcher and MediaDownloader construction.

use crate::config::Config;
use crate::downloader::MediaDownloader;
use crate::fetcher::{Invocation, MediaFetcher, RunOutcome};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// Scripted effect of one invocation
#[derive(Clone, Debug, Default)]
pub(crate) struct Script {
    pub(crate) delay: Duration,
    pub(crate) files: Vec<String>,
    pub(crate) exit_code: i32,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
    pub(crate) panic: bool,
}

impl Script {
    /// Exit 0 after writing `files` into the working directory
    pub(crate) fn produce(files: &[&str]) -> Self {
        Self {
            files: files.iter().map(|f| f.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Exit with `code` without producing anything
    pub(crate) fn fail(code: i32) -> Self {
        Self {
            exit_code: code,
            stderr: "ERROR: scripted failure".into(),
            ..Self::default()
        }
    }

    /// Exit 0 printing `stdout`
    pub(crate) fn print(stdout: &str) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// Panic inside the fetcher
    pub(crate) fn panic() -> Self {
        Self {
            panic: true,
            ..Self::default()
        }
    }

    pub(crate) fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Fetcher whose behaviour is scripted per target
///
/// The first rule whose needle appears in any argument decides what happens,
/// else the fallback script runs.
/// Delays honour the invocation timeout the way a killed child would.
pub(crate) struct ScriptedFetcher {
    rules: Vec<(String, Script)>,
    fallback: Script,
    calls: Mutex<Vec<Invocation>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedFetcher {
    pub(crate) fn new(fallback: Script) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
            calls: Mutex::new(Vec::new()),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub(crate) fn on(mut self, needle: &str, script: Script) -> Self {
        self.rules.push((needle.to_string(), script));
        self
    }

    pub(crate) fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn script_for(&self, invocation: &Invocation) -> Script {
        self.rules
            .iter()
            .find(|(needle, _)| invocation.args.iter().any(|a| a.contains(needle.as_str())))
            .map(|(_, script)| script.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

struct RunningGuard<'a>(&'a AtomicUsize);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaFetcher for ScriptedFetcher {
    async fn run(&self, invocation: Invocation) -> crate::Result<RunOutcome> {
        self.calls.lock().unwrap().push(invocation.clone());
        let script = self.script_for(&invocation);

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _running = RunningGuard(&self.running);

        if script.panic {
            panic!("scripted fetcher panic");
        }

        if script.delay > invocation.timeout {
            tokio::time::sleep(invocation.timeout).await;
            return Ok(RunOutcome {
                timed_out: true,
                ..RunOutcome::default()
            });
        }
        tokio::time::sleep(script.delay).await;

        for file in &script.files {
            tokio::fs::write(invocation.cwd.join(file), b"audio").await?;
        }
        if let Some(log) = &invocation.log_file {
            tokio::fs::write(log, format!("scripted run: {:?}\n", invocation.args)).await?;
        }

        Ok(RunOutcome {
            exit_code: Some(script.exit_code),
            timed_out: false,
            stdout: script.stdout,
            stderr: script.stderr,
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Config tuned for fast tests: 10 ms sampling, no settle delay, 3 workers
pub(crate) fn test_config(root: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.download.work_dir = root.join("work");
    config.download.max_concurrent_fetches = 3;
    config.fetch.poll_interval_ms = 10;
    config.fetch.settle_delay_ms = 0;
    config
}

/// Helper to create a test MediaDownloader around a scripted fetcher.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader(
    fetcher: Arc<ScriptedFetcher>,
) -> (MediaDownloader, tempfile::TempDir) {
    create_test_downloader_with(fetcher, |_| {}).await
}

/// Same as [`create_test_downloader`] with a config adjustment applied first
pub(crate) async fn create_test_downloader_with(
    fetcher: Arc<ScriptedFetcher>,
    adjust: impl FnOnce(&mut Config),
) -> (MediaDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    adjust(&mut config);
    let downloader = MediaDownloader::with_fetcher(config, fetcher).await.unwrap();
    (downloader, temp_dir)
}

/// Job directories currently in the working-directory root
///
/// Released directories waiting for background deletion (dot-prefixed) are skipped.
pub(crate) fn work_dir_entries(downloader: &MediaDownloader) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(&downloader.config.download.work_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| !p.file_name().unwrap().to_string_lossy().starts_with('.'))
        .collect()
}

/// Poll until the job reaches a terminal state (panics after 5 seconds)
pub(crate) async fn wait_terminal(
    downloader: &MediaDownloader,
    id: &crate::types::JobId,
) -> crate::types::Progress {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let progress = downloader.progress(id.as_str()).unwrap();
            if progress.status.is_terminal() {
                return progress;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job never reached a terminal state")
}
