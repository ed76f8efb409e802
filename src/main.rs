//! AyushSync API proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                  API PROXY                    │
//!     Browser request    │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!     ───────────────────┼─▶│  http   │──▶│ routing  │──▶│   proxy   │──┼──▶ Upstream
//!                        │  │ server  │   │  mounts  │   │  forward  │  │    terminology
//!     Browser response   │  └─────────┘   └──────────┘   └─────┬─────┘  │    API
//!     ◀──────────────────┼── response.rs (CORS, JSON, 500 envelope) ◀─┼───
//!                        │                                              │
//!                        │  config · observability · lifecycle          │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use ayushsync_proxy::config::{load_config, ProxyConfig};
use ayushsync_proxy::config::validation::validate_config;
use ayushsync_proxy::lifecycle::{signals, Shutdown};
use ayushsync_proxy::observability::{logging, metrics};
use ayushsync_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "ayushsync-proxy")]
#[command(about = "Pass-through proxy for the AyushSync terminology API", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override upstream.origin.
    #[arg(short, long)]
    origin: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(origin) = cli.origin {
        config.upstream.origin = origin;
    }
    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            eprintln!("invalid configuration: {error}");
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    logging::init(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ayushsync-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.origin,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );
    for mount in &config.mounts {
        tracing::info!(
            prefix = %mount.prefix,
            upstream = %format!("{}{}", config.upstream.origin, mount.api_base),
            "Mount registered"
        );
    }

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, signal).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
