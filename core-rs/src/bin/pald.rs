//! pald - Port Allocator Daemon
//!
//! Runs in the foreground; use the service manager of the host to daemonize.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use pald_core::config::{DaemonConfig, Overrides};
use pald_core::PortDaemon;

#[derive(Parser, Debug)]
#[command(name = "pald")]
#[command(version)]
#[command(about = "Port Allocator Daemon", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(long, short = 'c', env = "PALD_CONFIG")]
    config: Option<PathBuf>,

    /// Address to serve HTTP on
    #[arg(long, env = "PALD_LISTEN")]
    listen: Option<SocketAddr>,

    /// Lowest port of the dynamic pool
    #[arg(long, env = "PALD_POOL_MIN")]
    pool_min: Option<u16>,

    /// Highest port of the dynamic pool
    #[arg(long, env = "PALD_POOL_MAX")]
    pool_max: Option<u16>,

    /// File the registry is persisted to
    #[arg(long, env = "PALD_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Minimum milliseconds between two state file writes
    #[arg(long, env = "PALD_THROTTLE_MS")]
    throttle_ms: Option<u64>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            listen: self.listen,
            pool_min: self.pool_min,
            pool_max: self.pool_max,
            state_file: self.state_file.clone(),
            throttle_ms: self.throttle_ms,
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .init();
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }
    tracing::info!("Shutting down, writing final state");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let base = match &cli.config {
        Some(path) => DaemonConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => DaemonConfig::default(),
    };
    let config = base.with_overrides(&cli.overrides());

    tracing::info!(
        version = pald_core::VERSION,
        listen = %config.listen,
        "Starting pald"
    );

    let daemon = PortDaemon::new(config).context("initializing the port registry")?;
    daemon
        .start(shutdown_signal())
        .await
        .context("serving HTTP")?;
    Ok(())
}
