//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] — Submission, progress polling and file retrieval
//! - [`search`] — Metadata-only search
//! - [`system`] — Health, events, OpenAPI

use crate::types::{Quality, SearchResult, WorkItem};
use serde::{Deserialize, Serialize};

mod jobs;
mod search;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use jobs::*;
pub use search::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /jobs
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitJobRequest {
    /// URL or free-text search query
    pub input: String,
    /// Audio quality (default: best)
    #[serde(default)]
    pub quality: Quality,
}

/// Request body for POST /jobs/batch
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct BatchJobRequest {
    /// Pre-resolved items, fetched as one job
    pub items: Vec<WorkItem>,
    /// Audio quality (default: best)
    #[serde(default)]
    pub quality: Quality,
}

/// Request body for POST /search
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SearchRequest {
    /// Free-text query
    pub query: String,
    /// Maximum number of results (default from config, at most 50)
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Response for POST /search
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SearchResponse {
    /// Matching entries in the order the service returned them
    pub results: Vec<SearchResult>,
}
