//! LACTEVA Prediction Service - Main Entry Point

use api::{init_logging, run_server, ServiceConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "lacteva-service")]
#[command(about = "Serve milk freshness predictions over HTTP")]
#[command(version)]
struct Cli {
    /// TOML configuration file; LACTEVA__* variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ServiceConfig::load(cli.config.as_deref())?;
    init_logging(&config.log)?;

    info!("=== LACTEVA ML Service v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Model directory: {}", config.model_dir.display());

    run_server(config).await
}
