//! Metadata-only search through the external tool.

use super::MediaDownloader;
use crate::error::{Error, Result};
use crate::fetcher::{Invocation, args, parser};
use crate::types::SearchResult;

/// Upper bound on results per query
pub const MAX_SEARCH_RESULTS: usize = 50;

impl MediaDownloader {
    /// Search the remote service without downloading anything
    ///
    /// `limit` defaults to the configured `fetch.search_limit` and is capped at
    /// [`MAX_SEARCH_RESULTS`]. Entries the tool prints that cannot be parsed are
    /// skipped.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] for an empty query
    /// - [`Error::ExternalTool`] if the tool cannot run, times out, or fails
    ///   without printing any result
    /// - [`Error::ShuttingDown`] once the worker pool is closed
    pub async fn search(&self, query: &str, limit: Option<usize>) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("search query is empty".into()));
        }

        let limit = limit
            .unwrap_or(self.config.fetch.search_limit)
            .clamp(1, MAX_SEARCH_RESULTS);

        let invocation = Invocation::new(
            args::search_args(query, limit),
            self.config.download.work_dir.clone(),
            self.config.fetch.search_timeout,
        );
        let outcome = self.run_query(invocation).await?;

        if outcome.timed_out {
            tracing::warn!(query, "search timed out");
            return Err(Error::ExternalTool(format!(
                "search timed out after {:?}",
                self.config.fetch.search_timeout
            )));
        }

        let results = parser::parse_search_results(&outcome.stdout);
        if results.is_empty() && !outcome.success() {
            let reason = outcome
                .stderr
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or("no output");
            tracing::warn!(query, result = %outcome.describe(), reason, "search failed");
            return Err(Error::ExternalTool(format!(
                "search failed ({}): {}",
                outcome.describe(),
                reason
            )));
        }

        tracing::debug!(query, limit, found = results.len(), "search finished");
        Ok(results)
    }
}
