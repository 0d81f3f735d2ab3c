//! Filesystem-sampling progress monitor
//!
//! While a fetch runs, the monitor counts artifacts in the job's working
//! directory on a fixed cadence and publishes a `downloading` record. The
//! coordinator stops it with [`MonitorHandle::stop`], which cancels the loop and
//! waits for it to exit, so the terminal record is always written after the
//! monitor's last write.

use crate::artifacts::count_artifacts;
use crate::progress::{ProgressStore, WriteOutcome};
use crate::types::{Event, JobId};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Everything a monitor needs to sample one job
pub struct ProgressMonitor {
    /// Job being observed
    pub id: JobId,
    /// Working directory to scan
    pub dir: PathBuf,
    /// Extensions that count as artifacts
    pub extensions: Vec<String>,
    /// Expected total, repeated in every sample
    pub total: u32,
    /// Sampling cadence
    pub interval: Duration,
}

/// Running monitor; stop it before writing the job's terminal record
pub struct MonitorHandle {
    join: JoinHandle<()>,
    guard: DropGuard,
}

impl ProgressMonitor {
    /// Start sampling on a background task
    pub fn spawn(
        self,
        store: ProgressStore,
        event_tx: broadcast::Sender<Event>,
    ) -> MonitorHandle {
        let token = CancellationToken::new();
        let join = tokio::spawn(self.run(store, event_tx, token.clone()));
        MonitorHandle {
            join,
            guard: token.drop_guard(),
        }
    }

    async fn run(
        self,
        store: ProgressStore,
        event_tx: broadcast::Sender<Event>,
        token: CancellationToken,
    ) {
        let mut last_reported = None;

        loop {
            if token.is_cancelled() {
                break;
            }

            let current = count_artifacts(&self.dir, &self.extensions);

            // Checked again so a sample taken across the stop signal is discarded
            if token.is_cancelled() {
                break;
            }

            match store.publish_downloading(&self.id, current) {
                WriteOutcome::Applied => {}
                WriteOutcome::Terminal | WriteOutcome::Missing => {
                    tracing::debug!(job_id = %self.id, "record no longer writable, monitor exiting");
                    break;
                }
            }

            if last_reported != Some(current) {
                last_reported = Some(current);
                tracing::debug!(job_id = %self.id, current, total = self.total, "progress sample");
                event_tx
                    .send(Event::Progress {
                        id: self.id.clone(),
                        current,
                        total: self.total,
                    })
                    .ok();
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

impl MonitorHandle {
    /// Signal the monitor and wait until it has exited
    pub async fn stop(self) {
        let MonitorHandle { join, guard } = self;
        // Disarming hands back the token; cancel explicitly
        guard.disarm().cancel();
        if let Err(e) = join.await {
            tracing::warn!(error = %e, "progress monitor task failed");
        }
    }
}
