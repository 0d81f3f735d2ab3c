//! Job submission: validation, total resolution, allocation and hand-off.

use super::MediaDownloader;
use super::job::JobPlan;
use crate::classify::{self, Classification};
use crate::error::{Error, Result};
use crate::fetcher::{Invocation, args, parser};
use crate::types::{Event, JobId, Progress, Quality, Submission, WorkItem};
use std::path::PathBuf;
use std::sync::atomic::Ordering;

/// Attempts at finding an unused job id before giving up
const MAX_ALLOCATION_ATTEMPTS: usize = 8;

impl MediaDownloader {
    /// Submit a URL or free-text search
    ///
    /// Returns as soon as the job is registered; the fetch itself runs in the
    /// background. Poll [`progress`](Self::progress) with the returned id.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] for empty input or an unrecognised URL
    /// - [`Error::UnsupportedDynamicCollection`] for generated mixes
    /// - [`Error::ShuttingDown`] once shutdown has begun
    ///
    /// No job, record, or working directory exists after any of these.
    pub async fn submit(&self, input: &str, quality: Quality) -> Result<Submission> {
        self.ensure_accepting()?;

        let classification = classify::classify(input).inspect_err(|e| {
            tracing::info!(error = %e, "submission rejected");
        })?;

        let (id, dir) = self.allocate(classification.known_total()).await?;
        let total = if classification.kind.is_collection() {
            let total = self.resolve_total(&classification).await;
            // Still `starting`: nothing else writes the record before spawn_job
            self.progress.set_total(&id, total);
            total
        } else {
            classification.known_total()
        };

        tracing::info!(
            job_id = %id,
            kind = ?classification.kind,
            identifier = %classification.identifier,
            total,
            ?quality,
            "job accepted"
        );

        self.emit(Event::Queued {
            id: id.clone(),
            total,
        });

        let plan = JobPlan::Single {
            target: classification.target,
            is_collection: classification.kind.is_collection(),
        };
        self.spawn_job(id.clone(), dir, total, plan, quality);

        Ok(Submission { job_id: id, total })
    }

    /// Submit a pre-resolved list of items as one job
    ///
    /// Each item becomes one fetch task on the worker pool. The job succeeds if
    /// at least one item produced a file.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] for an empty list or a malformed item id
    /// - [`Error::ShuttingDown`] once shutdown has begun
    pub async fn submit_batch(&self, items: Vec<WorkItem>, quality: Quality) -> Result<Submission> {
        self.ensure_accepting()?;

        if items.is_empty() {
            return Err(Error::InvalidInput("batch contains no items".into()));
        }
        if let Some(bad) = items.iter().find(|item| !classify::is_video_id(&item.id)) {
            return Err(Error::InvalidInput(format!(
                "invalid item identifier: {:?}",
                bad.id
            )));
        }

        let total = u32::try_from(items.len())
            .map_err(|_| Error::InvalidInput("batch is too large".into()))?;
        let (id, dir) = self.allocate(total).await?;

        tracing::info!(job_id = %id, total, ?quality, "batch job accepted");

        self.emit(Event::Queued {
            id: id.clone(),
            total,
        });
        self.spawn_job(id.clone(), dir, total, JobPlan::Batch { items }, quality);

        Ok(Submission { job_id: id, total })
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self.accepting_new.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::ShuttingDown)
        }
    }

    /// Size a collection with a cheap metadata query
    ///
    /// The query waits for a worker slot like any fetch. Any failure leaves
    /// the total unknown (0) instead of failing the submission.
    pub(crate) async fn resolve_total(&self, classification: &Classification) -> u32 {
        let invocation = Invocation::new(
            args::count_args(&classification.target),
            self.config.download.work_dir.clone(),
            self.config.fetch.count_timeout,
        );

        match self.run_query(invocation).await {
            Ok(outcome) if !outcome.timed_out => {
                match parser::parse_playlist_count(&outcome.stdout) {
                    Some(count) => count,
                    None => {
                        tracing::warn!(
                            list_id = %classification.identifier,
                            result = %outcome.describe(),
                            "playlist size unavailable"
                        );
                        0
                    }
                }
            }
            Ok(_) => {
                tracing::warn!(list_id = %classification.identifier, "playlist size query timed out");
                0
            }
            Err(e) => {
                tracing::warn!(list_id = %classification.identifier, error = %e, "playlist size query failed");
                0
            }
        }
    }

    /// Reserve a fresh job id, register its `starting` record and create its directory
    ///
    /// `total` is the first estimate; it may be revised while the job is still
    /// starting.
    ///
    /// A token that is already live, or whose directory already exists on disk
    /// (left over from an earlier process), is discarded and a new one drawn.
    pub(crate) async fn allocate(&self, total: u32) -> Result<(JobId, PathBuf)> {
        for _ in 0..MAX_ALLOCATION_ATTEMPTS {
            let id = JobId::generate();
            if !self.progress.register(&id, Progress::starting(total)) {
                tracing::debug!(job_id = %id, "job id collision, retrying");
                continue;
            }

            let dir = self.job_dir(&id);
            match tokio::fs::create_dir(&dir).await {
                Ok(()) => return Ok((id, dir)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    self.progress.remove(&id);
                    tracing::debug!(job_id = %id, "stale working directory, retrying");
                }
                Err(e) => {
                    self.progress.remove(&id);
                    return Err(Error::Io(std::io::Error::new(
                        e.kind(),
                        format!("Failed to create job directory '{}': {}", dir.display(), e),
                    )));
                }
            }
        }

        Err(Error::Other(format!(
            "no unused job id after {MAX_ALLOCATION_ATTEMPTS} attempts"
        )))
    }
}
