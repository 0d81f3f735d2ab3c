//! Core types for media-dl

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Length of a generated job token
pub const JOB_ID_LEN: usize = 8;

/// Opaque short identifier for a job
///
/// Tokens are eight lowercase hex characters. Uniqueness among live jobs is
/// enforced at registration time, see [`crate::progress::ProgressStore::register`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh random token
    pub fn generate() -> Self {
        let value: u32 = rand::random();
        Self(format!("{:0width$x}", value, width = JOB_ID_LEN))
    }

    /// Parse a client-supplied token
    ///
    /// Only tokens of the generated shape are accepted, which also keeps
    /// path traversal out of working-directory lookups.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == JOB_ID_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit());
        valid.then(|| Self(raw.to_ascii_lowercase()))
    }

    /// Borrow the token as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, fetch not yet observed running
    Starting,
    /// Fetch in flight
    Downloading,
    /// At least one artifact exists
    Complete,
    /// Nothing was produced
    Error,
}

impl JobStatus {
    /// Terminal states accept no further writes
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }
}

/// Progress record of one job, replaced as a whole on every update
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Progress {
    /// Current lifecycle state
    pub status: JobStatus,
    /// Number of artifacts observed so far
    pub current: u32,
    /// Expected number of artifacts (0 = unknown)
    pub total: u32,
    /// Human-readable status line
    pub message: String,
}

impl Progress {
    /// Initial record written at submission
    pub fn starting(total: u32) -> Self {
        Self {
            status: JobStatus::Starting,
            current: 0,
            total,
            message: "Starting download...".into(),
        }
    }

    /// Non-terminal record published by the monitor
    pub fn downloading(current: u32, total: u32) -> Self {
        let message = if total > 0 {
            format!("Downloading... {current} of {total} files")
        } else {
            format!("Downloading... {current} files so far")
        };
        Self {
            status: JobStatus::Downloading,
            current,
            total,
            message,
        }
    }

    /// Terminal success record
    ///
    /// An unknown total is reported as the number of files actually produced.
    pub fn complete(count: u32, total: u32) -> Self {
        Self {
            status: JobStatus::Complete,
            current: count,
            total: if total > 0 { total } else { count },
            message: if count == 1 {
                "1 file downloaded".into()
            } else {
                format!("{count} files downloaded")
            },
        }
    }

    /// Terminal failure record
    pub fn failed(current: u32, total: u32, message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Error,
            current,
            total,
            message: message.into(),
        }
    }
}

/// Audio quality hint forwarded to the fetcher
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Best available (VBR 0)
    #[default]
    Best,
    /// 192 kbit/s
    High,
    /// 128 kbit/s
    Medium,
    /// 96 kbit/s
    Low,
}

impl Quality {
    /// Value of the fetcher's `--audio-quality` argument
    pub fn as_arg(&self) -> &'static str {
        match self {
            Quality::Best => "0",
            Quality::High => "192K",
            Quality::Medium => "128K",
            Quality::Low => "96K",
        }
    }
}

/// One pre-resolved entry of a batch submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WorkItem {
    /// Remote video identifier
    pub id: String,
    /// Display title (used only for logging)
    #[serde(default)]
    pub title: Option<String>,
}

impl WorkItem {
    /// Create a work item from an identifier and optional title
    pub fn new(id: impl Into<String>, title: Option<String>) -> Self {
        Self {
            id: id.into(),
            title,
        }
    }

    /// Watch URL handed to the fetcher
    pub fn url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }

    /// Title if known, identifier otherwise
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

/// Accepted submission handed back to the caller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Submission {
    /// Identifier to poll and retrieve with
    pub job_id: JobId,
    /// Expected number of files (0 = unknown)
    pub total: u32,
}

/// One entry returned by a search
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    /// Remote video identifier
    pub id: String,
    /// Video title
    pub title: String,
    /// Channel or uploader name
    pub channel: String,
    /// Length in seconds, when reported
    pub duration_secs: Option<u64>,
    /// Watch URL, ready to be submitted
    pub url: String,
    /// Thumbnail image URL
    pub thumbnail: String,
}

/// Events emitted by the downloader
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted and handed to the worker pool
    Queued {
        /// Job identifier
        id: JobId,
        /// Expected number of files
        total: u32,
    },
    /// Monitor observed a new artifact count
    Progress {
        /// Job identifier
        id: JobId,
        /// Artifacts observed
        current: u32,
        /// Expected number of files
        total: u32,
    },
    /// Job finished with at least one artifact
    Complete {
        /// Job identifier
        id: JobId,
        /// Artifacts produced
        count: u32,
        /// Expected number of files
        total: u32,
    },
    /// Job finished without artifacts
    Failed {
        /// Job identifier
        id: JobId,
        /// Diagnostic message
        message: String,
    },
    /// Job output was handed to a client and its resources released
    Retrieved {
        /// Job identifier
        id: JobId,
    },
    /// Downloader is shutting down
    Shutdown,
}

impl Event {
    /// Short name used as the SSE event type
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Queued { .. } => "queued",
            Event::Progress { .. } => "progress",
            Event::Complete { .. } => "complete",
            Event::Failed { .. } => "failed",
            Event::Retrieved { .. } => "retrieved",
            Event::Shutdown => "shutdown",
        }
    }
}
