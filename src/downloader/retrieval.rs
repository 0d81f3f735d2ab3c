//! Output delivery and the single cleanup point for job resources.

use super::MediaDownloader;
use crate::archive::archive_base_name;
use crate::artifacts::{list_artifacts, mime_for};
use crate::error::{Error, Result};
use crate::progress::{Claim, ProgressStore};
use crate::types::{Event, JobId};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

/// Removes a job's working directory and progress record when dropped
///
/// A guard exists only while its retrieval holds the job's delivery claim, so
/// a job's resources are released once. Dropping it (after the body was
/// streamed, after a failed stream, or on any error path) moves the directory
/// out of the way at once and deletes its contents on the blocking pool.
pub struct CleanupGuard {
    id: JobId,
    dir: PathBuf,
    progress: ProgressStore,
    event_tx: broadcast::Sender<Event>,
    delivered: bool,
}

impl CleanupGuard {
    fn new(downloader: &MediaDownloader, id: JobId, dir: PathBuf) -> Self {
        Self {
            id,
            dir,
            progress: downloader.progress.clone(),
            event_tx: downloader.event_tx.clone(),
            delivered: false,
        }
    }

    /// Job whose resources this guard owns
    pub fn job_id(&self) -> &JobId {
        &self.id
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        // The leading dot keeps the name from ever parsing as a job id
        let trash = self.dir.with_file_name(format!(".{}.removing", self.id));
        match std::fs::rename(&self.dir, &trash) {
            Ok(()) => remove_in_background(trash),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(job_id = %self.id, error = %e, "could not move working directory aside");
                remove_in_background(self.dir.clone());
            }
        }
        self.progress.remove(&self.id);
        tracing::info!(job_id = %self.id, delivered = self.delivered, "job resources released");

        if self.delivered {
            self.event_tx
                .send(Event::Retrieved {
                    id: self.id.clone(),
                })
                .ok();
        }
    }
}

fn remove_in_background(dir: PathBuf) {
    let remove = move || remove_dir(&dir);
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(remove);
        }
        Err(_) => remove(),
    }
}

fn remove_dir(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::error!(dir = %dir.display(), error = %e, "failed to remove working directory");
    }
}

/// A job's output, ready to be streamed to a client
///
/// Holding a `Delivery` keeps the file in place; dropping it (or the guard
/// taken out of it) deletes the job's directory and progress record.
pub struct Delivery {
    /// File to send (a single artifact or the archive)
    pub path: PathBuf,
    /// Content type of `path`
    pub mime_type: &'static str,
    /// Suggested download name
    pub filename: String,
    /// Size of `path` in bytes
    pub size: u64,
    guard: CleanupGuard,
}

impl Delivery {
    /// Take out the cleanup guard so it can travel with the response body
    pub fn into_guard(self) -> CleanupGuard {
        self.guard
    }
}

impl MediaDownloader {
    /// Hand out a finished job's output
    ///
    /// One artifact is delivered as-is; several are packaged into an archive
    /// first. Once the working directory is known to exist, every path out of
    /// this method ends with the job's directory and record deleted: on error
    /// immediately, on success when the returned [`Delivery`] is dropped.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] for unknown ids (nothing is created), for jobs
    ///   that produced no files (after cleanup), and while another retrieval
    ///   of the same job is in progress
    /// - [`Error::JobInProgress`] while the job has not reached a terminal state
    /// - [`Error::Archive`] if packaging fails (after cleanup)
    pub async fn retrieve(&self, raw_id: &str) -> Result<Delivery> {
        let id = JobId::parse(raw_id).ok_or_else(|| Error::NotFound(raw_id.to_string()))?;
        let dir = self.job_dir(&id);

        if !is_dir(&dir).await {
            return Err(Error::NotFound(raw_id.to_string()));
        }

        match self.progress.claim(&id) {
            Claim::Granted => {}
            Claim::Running => return Err(Error::JobInProgress(id.to_string())),
            Claim::Taken => {
                tracing::debug!(job_id = %id, "job is already being delivered");
                return Err(Error::NotFound(raw_id.to_string()));
            }
        }

        // An earlier delivery may have released the job between the checks
        if !is_dir(&dir).await {
            self.progress.release(&id);
            return Err(Error::NotFound(raw_id.to_string()));
        }

        // From here on, dropping the guard releases the job.
        let mut guard = CleanupGuard::new(self, id.clone(), dir.clone());

        let extensions = self.config.download.artifact_extensions.clone();
        let scan_dir = dir.clone();
        let artifacts = tokio::task::spawn_blocking(move || list_artifacts(&scan_dir, &extensions))
            .await
            .map_err(|e| Error::Other(format!("directory scan failed: {e}")))??;

        let path = match artifacts.as_slice() {
            [] => {
                tracing::info!(job_id = %id, "no files to deliver");
                return Err(Error::NotFound(raw_id.to_string()));
            }
            [single] => single.clone(),
            _ => {
                let base = archive_base_name(&self.config.download.archive_prefix);
                match self.archiver.build(&dir, &base).await? {
                    Some(path) => path,
                    None => {
                        return Err(Error::Archive {
                            path: dir.join(&base),
                            reason: "files disappeared before packaging".into(),
                        });
                    }
                }
            }
        };

        let size = tokio::fs::metadata(&path).await?.len();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{id}.bin"));

        tracing::info!(
            job_id = %id,
            file = %filename,
            files = artifacts.len(),
            size,
            "delivering job output"
        );

        guard.delivered = true;
        Ok(Delivery {
            mime_type: mime_for(&path),
            path,
            filename,
            size,
            guard,
        })
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_dir())
}
