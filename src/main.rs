//! yt-best CLI entrypoint

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use yt_best_downloader::cli::Cli;
use yt_best_downloader::{DownloadError, ExitStatus};

async fn run(cli: Cli) -> Result<ExitStatus> {
    let status = cli.execute().await.context("yt-best failed")?;
    Ok(status)
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let status = match run(cli).await {
        Ok(status) => status,
        Err(e) => {
            error!("{:#}", e);
            e.downcast_ref::<DownloadError>()
                .map(DownloadError::exit_status)
                .unwrap_or(ExitStatus::Failure)
        }
    };

    std::process::exit(status.code());
}
