//! Background orchestration of one job.
//!
//! A job runs on its own task: it hands fetch tasks to the worker pool, samples
//! progress with a monitor while they run, stops and joins the monitor, waits
//! for the filesystem to settle, and derives the terminal record from the files
//! actually present. The outer task converts a panic anywhere in that sequence
//! into an `error` record so a job never stays non-terminal.

use super::{FETCH_LOG_FILE, MediaDownloader};
use crate::artifacts::count_artifacts;
use crate::fetcher::{Invocation, MediaFetcher, args};
use crate::monitor::ProgressMonitor;
use crate::progress::WriteOutcome;
use crate::types::{Event, JobId, Progress, Quality, WorkItem};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What a job fetches
#[derive(Debug, Clone)]
pub(crate) enum JobPlan {
    /// One invocation for a URL, search, or whole playlist
    Single {
        /// Argument handed to the tool
        target: String,
        /// Let the tool expand the target into several items
        is_collection: bool,
    },
    /// One invocation per pre-resolved item
    Batch {
        /// Items in submission order
        items: Vec<WorkItem>,
    },
}

/// One invocation of the external tool on behalf of a job
///
/// Never fails: every problem is logged and reported as an unsuccessful
/// [`TaskReport`], because a batch tolerates failing items.
pub(crate) struct FetchTask {
    pub(crate) job_id: JobId,
    pub(crate) label: String,
    pub(crate) invocation: Invocation,
    pub(crate) fetcher: Arc<dyn MediaFetcher>,
}

/// Outcome of a [`FetchTask`]
#[derive(Debug, Clone)]
pub(crate) struct TaskReport {
    pub(crate) success: bool,
    pub(crate) detail: String,
}

impl FetchTask {
    pub(crate) async fn run(self) -> TaskReport {
        tracing::debug!(job_id = %self.job_id, item = %self.label, "fetch started");

        match self.fetcher.run(self.invocation).await {
            Ok(outcome) if outcome.success() => {
                tracing::debug!(job_id = %self.job_id, item = %self.label, "fetch finished");
                TaskReport {
                    success: true,
                    detail: outcome.describe(),
                }
            }
            Ok(outcome) => {
                tracing::warn!(
                    job_id = %self.job_id,
                    item = %self.label,
                    exit_code = ?outcome.exit_code,
                    timed_out = outcome.timed_out,
                    "fetch failed"
                );
                TaskReport {
                    success: false,
                    detail: outcome.describe(),
                }
            }
            Err(e) => {
                tracing::error!(job_id = %self.job_id, item = %self.label, error = %e, "fetch could not run");
                TaskReport {
                    success: false,
                    detail: e.to_string(),
                }
            }
        }
    }
}

impl MediaDownloader {
    /// Start the background orchestration of an allocated job
    pub(crate) fn spawn_job(
        &self,
        id: JobId,
        dir: PathBuf,
        total: u32,
        plan: JobPlan,
        quality: Quality,
    ) {
        let downloader = self.clone();

        tokio::spawn(async move {
            let inner = tokio::spawn(downloader.clone().run_job(
                id.clone(),
                dir.clone(),
                total,
                plan,
                quality,
            ));

            let terminal = match inner.await {
                Ok(terminal) => terminal,
                Err(e) => {
                    tracing::error!(job_id = %id, error = %e, "job orchestration aborted");
                    let extensions = &downloader.config.download.artifact_extensions;
                    Progress::failed(
                        count_artifacts(&dir, extensions),
                        total,
                        format!("internal error: {e}"),
                    )
                }
            };

            downloader.finish_job(&id, terminal);
        });
    }

    async fn run_job(
        self,
        id: JobId,
        dir: PathBuf,
        total: u32,
        plan: JobPlan,
        quality: Quality,
    ) -> Progress {
        let monitor = ProgressMonitor {
            id: id.clone(),
            dir: dir.clone(),
            extensions: self.config.download.artifact_extensions.clone(),
            total,
            interval: self.config.fetch.poll_interval(),
        }
        .spawn(self.progress.clone(), self.event_tx.clone());

        let failure_detail = match plan {
            JobPlan::Single {
                target,
                is_collection,
            } => {
                self.run_single(&id, &dir, &target, is_collection, quality)
                    .await
            }
            JobPlan::Batch { items } => self.run_batch(&id, &dir, items, quality).await,
        };

        // The terminal write below must come after the monitor's last write
        monitor.stop().await;

        tokio::time::sleep(self.config.fetch.settle_delay()).await;

        let count = count_artifacts(&dir, &self.config.download.artifact_extensions);
        if count > 0 {
            Progress::complete(count, total)
        } else {
            Progress::failed(0, total, format!("No files were downloaded: {failure_detail}"))
        }
    }

    /// Run the whole target as one invocation with the long timeout
    async fn run_single(
        &self,
        id: &JobId,
        dir: &Path,
        target: &str,
        is_collection: bool,
        quality: Quality,
    ) -> String {
        let argv = args::fetch_args(
            target,
            is_collection,
            quality,
            &self.config.tools,
            &self.config.fetch,
        );
        let task = FetchTask {
            job_id: id.clone(),
            label: target.to_string(),
            invocation: Invocation::new(argv, dir, self.config.fetch.single_timeout)
                .with_log_file(dir.join(FETCH_LOG_FILE)),
            fetcher: Arc::clone(&self.fetcher),
        };

        match self.pool.submit(task.run()).await {
            Ok(report) => {
                tracing::info!(job_id = %id, result = %report.detail, "fetcher exited");
                report.detail
            }
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "fetch never started");
                e.to_string()
            }
        }
    }

    /// Run every item as its own pool task and wait for all of them
    async fn run_batch(
        &self,
        id: &JobId,
        dir: &Path,
        items: Vec<WorkItem>,
        quality: Quality,
    ) -> String {
        let total = items.len();
        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let argv = args::fetch_args(
                    &item.url(),
                    false,
                    quality,
                    &self.config.tools,
                    &self.config.fetch,
                );
                let task = FetchTask {
                    job_id: id.clone(),
                    label: item.label().to_string(),
                    invocation: Invocation::new(argv, dir, self.config.fetch.item_timeout),
                    fetcher: Arc::clone(&self.fetcher),
                };
                self.pool.submit(task.run())
            })
            .collect();

        let failed = futures::future::join_all(handles)
            .await
            .into_iter()
            .filter(|result| !matches!(result, Ok(report) if report.success))
            .count();

        tracing::info!(job_id = %id, total, failed, "batch fetch finished");
        format!("{failed} of {total} items failed")
    }

    /// Publish the terminal record exactly once and announce it
    fn finish_job(&self, id: &JobId, terminal: Progress) {
        let event = if terminal.status == crate::types::JobStatus::Complete {
            Event::Complete {
                id: id.clone(),
                count: terminal.current,
                total: terminal.total,
            }
        } else {
            Event::Failed {
                id: id.clone(),
                message: terminal.message.clone(),
            }
        };

        match self.progress.finish(id, terminal.clone()) {
            WriteOutcome::Applied => {
                tracing::info!(
                    job_id = %id,
                    status = ?terminal.status,
                    count = terminal.current,
                    total = terminal.total,
                    message = %terminal.message,
                    "job finished"
                );
                self.emit(event);
            }
            outcome => {
                tracing::warn!(job_id = %id, ?outcome, "terminal record not written");
            }
        }
    }
}
