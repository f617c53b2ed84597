//! Easel gateway binary entry point.
//!
//! Reads configuration from `--config <path>` or the environment, checks
//! it before binding, and serves until ctrl-c.

use anyhow::Result;
use clap::Parser;
use easel_gateway::GatewayConfig;
use std::path::PathBuf;
use tokio::signal;
use tracing_subscriber::EnvFilter;

/// MCP gateway for queued image generation.
#[derive(Debug, Parser)]
#[command(name = "easel-gateway", version)]
struct Args {
    /// TOML configuration file. Without it, configuration comes from the
    /// environment.
    #[arg(short, long, env = "EASEL_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listening port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => {
            let config = GatewayConfig::load(path)?;
            tracing::info!("loaded configuration from {}", path.display());
            config
        }
        None => GatewayConfig::from_env()?,
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    let handle = easel_gateway::serve(&config).await?;
    shutdown_signal().await;
    handle.shutdown().await?;
    tracing::info!("gateway shut down");
    Ok(())
}

/// Wait for ctrl-c.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
    }
}
