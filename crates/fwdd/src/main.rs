//! Forwarding table daemon
//!
//! Main entry point for fwdd. Loads configuration, binds the forwarding
//! table and serves the action protocol until interrupted.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fwd_bpfmap::{BpfTool, Table};
use fwdd::config::DEFAULT_CONFIG_PATH;
use fwdd::{server, ApiService, Forwarder, FwdConfig};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fwdd", version, about = "MAC/IP forwarding table daemon")]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = FwdConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    config.validate().context("invalid configuration")?;

    init_logging(&config.log.level)?;
    info!(config = %args.config.display(), "fwdd: Starting forwarding table daemon");

    match run_daemon(config).await {
        Ok(()) => {
            info!("fwdd: Daemon exiting normally");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "fwdd: Daemon exiting with error");
            Err(e)
        }
    }
}

/// Initialize structured logging; `RUST_LOG` overrides the configured level.
fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{}'", level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set logger: {}", e))
}

async fn run_daemon(config: FwdConfig) -> anyhow::Result<()> {
    let backend = Arc::new(BpfTool::new(config.tool_paths()));
    let table = Table::new(backend, config.table_spec()?);
    let forwarder = Forwarder::new(table)?.with_timeout(config.helper_timeout());
    info!(
        table = %forwarder.table().name(),
        pin_root = %config.bpf.pin_root.display(),
        "fwdd: Forwarding table configured"
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("fwdd: Received shutdown signal");
        }
        signal_token.cancel();
    });

    let addr = SocketAddr::new(config.listen_ip()?, config.http.port);
    server::serve(addr, ApiService::new(Arc::new(forwarder)), shutdown).await?;
    Ok(())
}
