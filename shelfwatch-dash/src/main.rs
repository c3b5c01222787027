//! shelfwatch-dash - inventory dashboard service
//!
//! Polls the inventory API on a fixed period and streams dashboard updates to
//! browsers over SSE.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use shelfwatch_common::config::{DashboardConfig, OverlapPolicy, Overrides};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for shelfwatch-dash
#[derive(Parser, Debug)]
#[command(name = "shelfwatch-dash")]
#[command(about = "Inventory dashboard with live shelf occupancy")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/shelfwatch/config.toml, then /etc/shelfwatch/config.toml)
    #[arg(short, long, env = "SHELFWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Inventory API base URL (items at {base}/items, chat at {base}/chat)
    #[arg(long, env = "SHELFWATCH_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SHELFWATCH_PORT")]
    port: Option<u16>,

    /// Poll period in milliseconds
    #[arg(long, env = "SHELFWATCH_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// What to do when a tick fires while the previous poll is still running
    #[arg(long, env = "SHELFWATCH_OVERLAP_POLICY")]
    overlap_policy: Option<OverlapPolicy>,
}

impl From<Args> for Overrides {
    fn from(args: Args) -> Self {
        Overrides {
            config_path: args.config,
            api_base_url: args.api_base_url,
            port: args.port,
            poll_interval_ms: args.poll_interval_ms,
            overlap_policy: args.overlap_policy,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Resolved before tracing so the configured level applies from the start;
    // discovery is logged once the subscriber is installed
    let config = DashboardConfig::resolve(args.into()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "shelfwatch_dash={level},shelfwatch_common={level},tower_http=info",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Shelfwatch dashboard (shelfwatch-dash) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    config.log_source();
    info!(
        poll_interval_ms = config.poll_interval_ms,
        request_timeout_ms = config.request_timeout_ms,
        overlap_policy = %config.overlap_policy,
        "Polling settings"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    shelfwatch_dash::run(config, shutdown)
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
