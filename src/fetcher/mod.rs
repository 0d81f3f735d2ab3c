//! External fetch tool integration
//!
//! The tool is modelled strictly as a capability: it gets an argument list, a
//! working directory and a timeout, and reports back an exit status. Progress is
//! never read from its output; the coordinator derives it from the files that
//! appear in the working directory.
//!
//! ## Architecture
//!
//! - [`MediaFetcher`]: the capability trait
//! - [`CliFetcher`]: spawns the external `yt-dlp` binary
//! - [`NoOpFetcher`]: stand-in when the binary is unavailable
//!
//! Argument lists are built by the functions in [`args`]; the only structured
//! output ever parsed (playlist counts and search hits) is handled by [`parser`].
//!
//! ## Usage
//!
//! ```no_run
//! use media_dl::config::{FetchConfig, ToolsConfig};
//! use media_dl::fetcher::{CliFetcher, Invocation, MediaFetcher, args};
//! use media_dl::types::Quality;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = CliFetcher::from_path().expect("yt-dlp not found");
//!     let argv = args::fetch_args(
//!         "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
//!         false,
//!         Quality::Best,
//!         &ToolsConfig::default(),
//!         &FetchConfig::default(),
//!     );
//!     let outcome = fetcher
//!         .run(Invocation::new(argv, "/tmp/job", Duration::from_secs(600)))
//!         .await?;
//!     println!("fetch finished: {}", outcome.describe());
//!     Ok(())
//! }
//! ```

pub mod args;
mod cli;
mod noop;
pub mod parser;
mod traits;

pub use cli::CliFetcher;
pub use noop::NoOpFetcher;
pub use traits::{Invocation, MediaFetcher, RunOutcome};

use crate::config::ToolsConfig;
use std::sync::Arc;

/// Pick the fetcher implementation for a tools configuration
///
/// An explicit `fetcher_path` wins; otherwise PATH is searched if allowed.
/// Falls back to [`NoOpFetcher`] with a warning when nothing is found.
pub fn from_config(tools: &ToolsConfig) -> Arc<dyn MediaFetcher> {
    if let Some(path) = &tools.fetcher_path {
        tracing::info!(path = %path.display(), "using configured yt-dlp binary");
        return Arc::new(CliFetcher::new(path.clone()));
    }

    if tools.search_path
        && let Some(fetcher) = CliFetcher::from_path()
    {
        tracing::info!(path = %fetcher.binary_path().display(), "found yt-dlp in PATH");
        return Arc::new(fetcher);
    }

    tracing::warn!("yt-dlp binary not found, every job will fail until one is configured");
    Arc::new(NoOpFetcher)
}
