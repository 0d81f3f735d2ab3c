//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::MediaDownloader;

/// How long shutdown waits for running jobs
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// How often shutdown re-checks for running jobs
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

impl MediaDownloader {
    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new submissions
    /// 2. Closes the worker pool, so fetch tasks still waiting for a slot fail
    ///    and their jobs end in the `error` state
    /// 3. Waits for running jobs to reach a terminal state (30 second timeout)
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// Jobs that are complete but not yet retrieved keep their records and
    /// directories; nothing survives the process anyway.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new jobs
        self.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new jobs");

        // 2. Abandon queued fetches
        self.pool.close();

        // 3. Wait for running jobs with timeout
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_active_jobs()).await {
            Ok(()) => tracing::info!("All running jobs finished"),
            Err(_) => tracing::warn!(
                active = self.active_jobs(),
                "Timeout waiting for jobs to finish, proceeding with shutdown"
            ),
        }

        // 4. Emit shutdown event
        self.emit(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new submissions are accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    async fn wait_for_active_jobs(&self) {
        loop {
            let active_count = self.active_jobs();
            if active_count == 0 {
                return;
            }
            tracing::debug!(active_count, "Waiting for running jobs to finish");
            tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
        }
    }
}
