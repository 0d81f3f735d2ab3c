//! Error types for media-dl
//!
//! This module provides error handling for the library, including:
//! - The crate-wide [`Error`] enum and [`Result`] alias
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes
//!
//! Failures that happen inside a running job (a timed-out item, a tool that
//! produced nothing) are never surfaced through this type. They are folded into
//! the job's terminal progress record instead.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_fetches")
        key: Option<String>,
    },

    /// Request could not be understood (empty input, unrecognised URL, bad batch item)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Playlist generated on the fly by the remote service; it cannot be enumerated
    #[error(
        "playlist {list_id} is an automatically generated mix and cannot be downloaded; \
         open one of its videos and submit that link instead"
    )]
    UnsupportedDynamicCollection {
        /// The rejected playlist identifier
        list_id: String,
    },

    /// Job (or its working directory) does not exist
    #[error("job not found: {0}")]
    NotFound(String),

    /// Retrieval was requested while the job is still fetching
    #[error("job {0} is still in progress")]
    JobInProgress(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// External tool could not be started or returned unusable output
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Packaging of output files failed
    #[error("failed to build archive {path}: {reason}")]
    Archive {
        /// Archive path that was being written
        path: PathBuf,
        /// The reason packaging failed
        reason: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "job not found: 3f9a0c1e"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "invalid_input")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::InvalidInput(_) => 400,

            // 422 Unprocessable Entity - well-formed but refused
            Error::UnsupportedDynamicCollection { .. } => 422,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 409 Conflict - retrieval before the job finished
            Error::JobInProgress(_) => 409,

            // 500 Internal Server Error - Server-side issues
            Error::Io(_) => 500,
            Error::Archive { .. } => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - the external tool misbehaved
            Error::ExternalTool(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidInput(_) => "invalid_input",
            Error::UnsupportedDynamicCollection { .. } => "unsupported_dynamic_collection",
            Error::NotFound(_) => "not_found",
            Error::JobInProgress(_) => "job_in_progress",
            Error::Io(_) => "io_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::Archive { .. } => "archive_error",
            Error::Serialization(_) => "serialization_error",
            Error::ShuttingDown => "shutting_down",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::UnsupportedDynamicCollection { list_id } => Some(serde_json::json!({
                "list_id": list_id,
            })),
            Error::NotFound(id) | Error::JobInProgress(id) => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
