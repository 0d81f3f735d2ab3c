//! Job coordinator split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`submit`] - Input validation, job allocation and hand-off
//! - [`job`] - Background orchestration of one job (fetch tasks, monitor, terminal state)
//! - [`retrieval`] - Output delivery and the single cleanup point
//! - [`search`] - Metadata-only search queries
//! - [`lifecycle`] - Shutdown coordination

mod job;
mod lifecycle;
mod retrieval;
mod search;
mod submit;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use retrieval::{CleanupGuard, Delivery};
pub use search::MAX_SEARCH_RESULTS;

use crate::archive::ArchiveBuilder;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{self, Invocation, MediaFetcher, RunOutcome};
use crate::pool::WorkerPool;
use crate::progress::ProgressStore;
use crate::types::{Event, JobId, Progress};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Name of the log file a single fetch writes into its working directory
pub const FETCH_LOG_FILE: &str = "ytdlp_log.txt";

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct MediaDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// External tool capability (trait object for pluggable implementations)
    pub(crate) fetcher: Arc<dyn MediaFetcher>,
    /// Progress records of every live job
    pub(crate) progress: ProgressStore,
    /// Bounded pool running the external-process tasks
    pub(crate) pool: WorkerPool,
    /// Packs multi-file output at retrieval time
    pub(crate) archiver: ArchiveBuilder,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Flag to indicate whether new jobs are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl MediaDownloader {
    /// Create a new MediaDownloader instance
    ///
    /// Validates the configuration, creates the working-directory root and picks
    /// the fetcher: an explicit `tools.fetcher_path`, else `yt-dlp` from PATH, else
    /// a stand-in that fails every job.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn new(config: Config) -> Result<Self> {
        let fetcher = fetcher::from_config(&config.tools);
        Self::with_fetcher(config, fetcher).await
    }

    /// Create a MediaDownloader around an explicit fetcher implementation
    pub async fn with_fetcher(config: Config, fetcher: Arc<dyn MediaFetcher>) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.work_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create work directory '{}': {}",
                        config.download.work_dir.display(),
                        e
                    ),
                ))
            })?;

        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let pool = WorkerPool::new(config.download.max_concurrent_fetches);
        let archiver = ArchiveBuilder::new(config.download.artifact_extensions.clone());

        tracing::info!(
            fetcher = fetcher.name(),
            workers = pool.size(),
            work_dir = %config.download.work_dir.display(),
            "media downloader initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            progress: ProgressStore::new(),
            pool,
            archiver,
            event_tx,
            accepting_new: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Subscribe to job events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_dl::{Config, MediaDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = MediaDownloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             println!("{:?}", event);
    ///         }
    ///     });
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current progress record of a job
    ///
    /// Polling is read-only: repeated calls after a terminal state return the
    /// same record until retrieval removes it.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for malformed, unknown, or already retrieved ids.
    pub fn progress(&self, raw_id: &str) -> Result<Progress> {
        JobId::parse(raw_id)
            .and_then(|id| self.progress.get(&id))
            .ok_or_else(|| Error::NotFound(raw_id.to_string()))
    }

    /// Name of the fetcher implementation in use
    pub fn fetcher_name(&self) -> &'static str {
        self.fetcher.name()
    }

    /// Number of jobs that have not reached a terminal state
    pub fn active_jobs(&self) -> usize {
        self.progress.active_count()
    }

    /// Working directory of a job
    pub(crate) fn job_dir(&self, id: &JobId) -> PathBuf {
        self.config.download.work_dir.join(id.as_str())
    }

    pub(crate) fn emit(&self, event: Event) {
        // No subscribers is not an error
        self.event_tx.send(event).ok();
    }

    /// Run a metadata query (playlist size, search) in a worker slot
    ///
    /// Queries share the pool with fetches so the number of live tool
    /// processes never exceeds `max_concurrent_fetches`.
    pub(crate) async fn run_query(&self, invocation: Invocation) -> Result<RunOutcome> {
        let fetcher = Arc::clone(&self.fetcher);
        let outcome = self
            .pool
            .submit(async move { fetcher.run(invocation).await })
            .await??;
        Ok(outcome)
    }
}
