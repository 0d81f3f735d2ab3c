//! # media-dl-server
//!
//! Runs the job coordinator behind its REST API until SIGTERM or Ctrl+C.
//!
//! ```bash
//! media-dl-server --config ./media-dl.toml
//! media-dl-server --bind 0.0.0.0:5000 --work-dir /var/tmp/media-dl --workers 4
//! ```
//!
//! Log verbosity follows `RUST_LOG` when set, else `--log-level`.

use clap::Parser;
use media_dl::{Config, MediaDownloader};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Background audio fetch service driven by yt-dlp
#[derive(Parser, Debug)]
#[command(name = "media-dl-server", version, about)]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the config file
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Root of the per-job working directories, overriding the config file
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Maximum number of concurrent fetches, overriding the config file
    #[arg(long)]
    workers: Option<usize>,

    /// Default log filter when RUST_LOG is not set
    #[arg(long, default_value = "info,media_dl=debug")]
    log_level: String,
}

impl Cli {
    fn load_config(&self) -> media_dl::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_toml_file(path)?,
            None => Config::default(),
        };

        if let Some(bind) = self.bind {
            config.server.api.bind_address = bind;
        }
        if let Some(work_dir) = &self.work_dir {
            config.download.work_dir = work_dir.clone();
        }
        if let Some(workers) = self.workers {
            config.download.max_concurrent_fetches = workers;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = cli.load_config()?;
    tracing::info!(
        config_file = ?cli.config,
        bind = %config.server.api.bind_address,
        work_dir = %config.download.work_dir.display(),
        workers = config.download.max_concurrent_fetches,
        "configuration loaded"
    );

    let downloader = Arc::new(MediaDownloader::new(config.clone()).await?);

    media_dl::api::start_api_server_with_shutdown(
        downloader.clone(),
        Arc::new(config),
        media_dl::wait_for_signal(),
    )
    .await?;

    downloader.shutdown().await?;
    Ok(())
}
