//! Common test utilities for media-dl integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use media_dl::{Config, Invocation, JobId, MediaDownloader, MediaFetcher, Progress, RunOutcome};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Fetcher that writes one file per fetch invocation and answers count queries
///
/// Batch items whose URL contains `fail_marker` exit non-zero without output.
pub struct FakeFetcher {
    pub playlist_size: u32,
    pub files_per_fetch: usize,
    pub fail_marker: Option<&'static str>,
    pub delay: Duration,
    invocations: AtomicUsize,
}

impl FakeFetcher {
    pub fn new(files_per_fetch: usize) -> Self {
        Self {
            playlist_size: 0,
            files_per_fetch,
            fail_marker: None,
            delay: Duration::from_millis(20),
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn run(&self, invocation: Invocation) -> media_dl::Result<RunOutcome> {
        let n = self.invocations.fetch_add(1, Ordering::SeqCst);
        let target = invocation.args.last().cloned().unwrap_or_default();

        if invocation.args.iter().any(|a| a.contains("playlist_count")) {
            return Ok(RunOutcome {
                exit_code: Some(0),
                stdout: format!("{}\n", self.playlist_size),
                ..RunOutcome::default()
            });
        }

        tokio::time::sleep(self.delay).await;

        if let Some(marker) = self.fail_marker
            && target.contains(marker)
        {
            return Ok(RunOutcome {
                exit_code: Some(1),
                stderr: "ERROR: Video unavailable".into(),
                ..RunOutcome::default()
            });
        }

        for i in 0..self.files_per_fetch {
            tokio::fs::write(invocation.cwd.join(format!("track-{n}-{i}.mp3")), b"ID3")
                .await?;
        }
        Ok(RunOutcome {
            exit_code: Some(0),
            ..RunOutcome::default()
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Config rooted in a scratch directory with fast sampling
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.download.work_dir = root.join("jobs");
    config.download.max_concurrent_fetches = 2;
    config.fetch.poll_interval_ms = 10;
    config.fetch.settle_delay_ms = 0;
    config
}

/// Poll until the job is terminal, panicking after `timeout`
pub async fn wait_for_terminal(
    downloader: &MediaDownloader,
    id: &JobId,
    timeout: Duration,
) -> Progress {
    tokio::time::timeout(timeout, async {
        loop {
            let progress = downloader
                .progress(id.as_str())
                .unwrap_or_else(|e| panic!("job {id} vanished: {e}"));
            if progress.status.is_terminal() {
                return progress;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("job {id} did not finish within {timeout:?}"))
}
