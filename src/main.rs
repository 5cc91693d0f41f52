//! `Reelmark` server binary

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use reelmark::config::AppConfig;
use reelmark::pipeline::Pipeline;
use reelmark::server::{self, AppState};

#[derive(Parser)]
#[command(name = "reelmark")]
#[command(about = "Burn brand banners and timed captions into vertical videos")]
#[command(version)]
struct Cli {
    /// TCP port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Directory for uploads and transcode intermediates
    #[arg(long, default_value = "uploads")]
    upload_dir: PathBuf,

    /// Directory for finished exports
    #[arg(long, default_value = "exports")]
    export_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let config = AppConfig::default()
        .with_host(&cli.host)
        .with_port(cli.port)
        .with_upload_dir(cli.upload_dir)
        .with_export_dir(cli.export_dir);

    config
        .ensure_dirs()
        .context("failed to create working directories")?;

    let pipeline = Pipeline::new(&config.upload_dir, &config.export_dir);

    for (tool, available) in pipeline.check_dependencies().await {
        if available {
            info!("{tool} found");
        } else {
            anyhow::bail!("{tool} is not available; install it and make sure it is on PATH");
        }
    }

    server::serve(Arc::new(AppState { config, pipeline })).await
}
