//! Sponsored approval revoker (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http (axum) ──▶ revocation orchestrator
//!                                   │
//!                 ┌─────────────────┼───────────────────┐
//!                 ▼                 ▼                   ▼
//!            blockchain        nonce leases          relay
//!        (registry, RPC,     (per chain+account)  (eth_sendBundle,
//!         build, sign)                             status tracking)
//!
//!     Cross-cutting: config · observability · resilience · lifecycle
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use approval_revoker::config::load_config;
use approval_revoker::http::HttpServer;
use approval_revoker::lifecycle::{build_orchestrator, wait_for_shutdown_signal, Shutdown};
use approval_revoker::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "approval-revoker", version, about = "Sponsored token approval revocation service")]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long, env = "REVOKER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "approval-revoker starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        chains = config.chains.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let orchestrator = Arc::new(build_orchestrator(&config).await?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(orchestrator, &config);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_shutdown_signal().await;
    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
