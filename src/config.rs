//! Configuration types for media-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Working directory, concurrency and packaging settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Root under which every job gets its own working directory
    /// (default: "<system temp>/media-dl")
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Number of external-process slots in the worker pool (default: 10)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_fetches: usize,

    /// File extensions recognised as output artifacts (case-insensitive, no dot)
    #[serde(default = "default_artifact_extensions")]
    pub artifact_extensions: Vec<String>,

    /// Prefix of the archive name handed out for multi-file jobs (default: "playlist")
    #[serde(default = "default_archive_prefix")]
    pub archive_prefix: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            max_concurrent_fetches: default_max_concurrent(),
            artifact_extensions: default_artifact_extensions(),
            archive_prefix: default_archive_prefix(),
        }
    }
}

/// External tool paths
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub fetcher_path: Option<PathBuf>,

    /// Directory or binary passed to the fetcher as `--ffmpeg-location`
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for the fetcher if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// User agent forwarded to the fetcher
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            fetcher_path: None,
            ffmpeg_path: None,
            search_path: true,
            user_agent: default_user_agent(),
        }
    }
}

/// Timeouts and cadence of fetch execution
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FetchConfig {
    /// Wall-clock bound for a single (non-batch) fetch (default: 1800 seconds)
    #[serde(default = "default_single_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub single_timeout: Duration,

    /// Wall-clock bound for one item of a batch (default: 600 seconds)
    #[serde(default = "default_item_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub item_timeout: Duration,

    /// Bound for the playlist size query (default: 30 seconds)
    #[serde(default = "default_query_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub count_timeout: Duration,

    /// Bound for search queries (default: 30 seconds)
    #[serde(default = "default_query_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub search_timeout: Duration,

    /// How often the progress monitor samples the working directory (default: 1000 ms)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Pause between fetch exit and the final directory scan (default: 2000 ms)
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Audio format requested from the fetcher (default: "mp3")
    #[serde(default = "default_audio_format")]
    pub audio_format: String,

    /// Number of results a search returns when the caller gives no limit (default: 10)
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            single_timeout: default_single_timeout(),
            item_timeout: default_item_timeout(),
            count_timeout: default_query_timeout(),
            search_timeout: default_query_timeout(),
            poll_interval_ms: default_poll_interval(),
            settle_delay_ms: default_settle_delay(),
            audio_format: default_audio_format(),
            search_limit: default_search_limit(),
        }
    }
}

impl FetchConfig {
    /// Monitor sampling interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Settle delay as a [`Duration`]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Main configuration for MediaDownloader
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig) — working directories, worker pool, packaging
/// - [`tools`](ToolsConfig) — external binary paths
/// - [`fetch`](FetchConfig) — timeouts and monitor cadence
/// - [`server`](ServerIntegrationConfig) — REST API
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Working directory and concurrency settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// External tool paths
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Fetch timeouts and cadence
    #[serde(default)]
    pub fetch: FetchConfig,

    /// API server integration
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Root of the per-job working directories
    pub fn work_dir(&self) -> &PathBuf {
        &self.download.work_dir
    }

    /// Load a configuration from a TOML file; missing keys take their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })
    }

    /// Reject settings the runtime cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_fetches == 0 {
            return Err(Error::Config {
                message: "worker pool needs at least one slot".into(),
                key: Some("max_concurrent_fetches".into()),
            });
        }
        if self.download.artifact_extensions.is_empty() {
            return Err(Error::Config {
                message: "at least one artifact extension is required".into(),
                key: Some("artifact_extensions".into()),
            });
        }
        if self.fetch.poll_interval_ms == 0 {
            return Err(Error::Config {
                message: "poll interval must be positive".into(),
                key: Some("poll_interval_ms".into()),
            });
        }
        Ok(())
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:5000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

// Default value functions
fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("media-dl")
}

fn default_max_concurrent() -> usize {
    10
}

fn default_artifact_extensions() -> Vec<String> {
    vec![
        "mp3".into(),
        "m4a".into(),
        "flac".into(),
        "opus".into(),
        "ogg".into(),
        "wav".into(),
    ]
}

fn default_archive_prefix() -> String {
    "playlist".into()
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36"
        .into()
}

fn default_single_timeout() -> Duration {
    Duration::from_secs(1800)
}

fn default_item_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_query_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_settle_delay() -> u64 {
    2000
}

fn default_audio_format() -> String {
    "mp3".into()
}

fn default_search_limit() -> usize {
    10
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
