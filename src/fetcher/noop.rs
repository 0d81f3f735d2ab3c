//! Fetcher used when no external binary is available

use super::traits::{Invocation, MediaFetcher, RunOutcome};
use async_trait::async_trait;

/// Fetcher that refuses every invocation
///
/// Lets the service start (and answer health checks) on hosts without yt-dlp.
/// Every job submitted against it ends in the `error` state with the reason
/// in its message.
pub struct NoOpFetcher;

#[async_trait]
impl MediaFetcher for NoOpFetcher {
    async fn run(&self, _invocation: Invocation) -> crate::Result<RunOutcome> {
        Err(crate::Error::ExternalTool(
            "fetching requires the yt-dlp binary. \
             Configure tools.fetcher_path or ensure yt-dlp is in PATH."
                .into(),
        ))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
