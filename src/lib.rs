//! # media-dl
//!
//! Background job orchestrator for audio fetches driven by `yt-dlp`.
//!
//! A client submits a URL or a search query and gets a job id back at once.
//! The fetch runs on a bounded worker pool while a monitor counts the files
//! appearing in the job's working directory, so progress can be polled even
//! though the external tool reports nothing structured. When the job ends its
//! outcome is derived from the files actually produced, and retrieval hands out
//! a single file or a zip archive before deleting everything the job used.
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, MediaDownloader, Quality};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = MediaDownloader::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let submission = downloader
//!         .submit("https://youtu.be/dQw4w9WgXcQ", Quality::Best)
//!         .await?;
//!     println!("job {} expects {} file(s)", submission.job_id, submission.total);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Output packaging
pub mod archive;
/// Artifact discovery in working directories
pub mod artifacts;
/// Input classification
pub mod classify;
/// Configuration types
pub mod config;
/// Job coordinator (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// External tool capability
pub mod fetcher;
/// Filesystem-sampling progress monitor
pub mod monitor;
/// Bounded worker pool
pub mod pool;
/// Progress record store
pub mod progress;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use classify::{Classification, ContentKind, classify};
pub use config::Config;
pub use downloader::{CleanupGuard, Delivery, MediaDownloader};
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use fetcher::{CliFetcher, Invocation, MediaFetcher, NoOpFetcher, RunOutcome};
pub use types::{Event, JobId, JobStatus, Progress, Quality, SearchResult, Submission, WorkItem};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_dl::{MediaDownloader, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let downloader = MediaDownloader::new(config).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: MediaDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

/// Resolve once SIGTERM or SIGINT (Ctrl+C elsewhere) is received
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

/// Resolve once SIGTERM or SIGINT (Ctrl+C elsewhere) is received
#[cfg(not(unix))]
pub async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
