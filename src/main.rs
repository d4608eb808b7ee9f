//! Path-addressed reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http::server ──▶ http::dispatcher ──▶ routing::router
//!                                     │
//!                    ┌────────────────┴────────────────┐
//!                    ▼                                 ▼
//!              cache (get/put)                  upstream::fetcher ──▶ Target
//!                    │                                 │
//!                    └──────▶ security::headers ◀──────┘
//!                                     │
//!   Client ◀──────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use path_proxy::config::{load_config, ProxyConfig};
use path_proxy::observability::{logging, metrics};
use path_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "path-proxy")]
#[command(about = "Reverse proxy that takes its target URL from the request path", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
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

    logging::init(&config.observability.log_level);
    tracing::info!("path-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        default_ttl_secs = config.cache.default_ttl_secs,
        max_ttl_secs = config.cache.max_ttl_secs,
        fallback_url = ?config.upstream.fallback_url,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
