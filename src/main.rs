//! Secure API server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ trace → request id → response policy ─┐
//!                                                             │
//!                      cors → compression → timeout ◀─────────┘
//!                        │
//!                        ▼
//!                      rate limiter (admit / 429)
//!                        │
//!                        ▼
//!                      body limit → sanitizer (snapshot + rewrite)
//!                        │
//!                        ▼
//!                      route → declared rules (400) → handler
//!                                                   │
//!     Client Response                               ▼
//!     ◀─────────────── before-send stages: security headers,
//!                      request id, rate-limit headers, response time
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use secure_api::config::load_config;
use secure_api::lifecycle::{wait_for_termination, Shutdown};
use secure_api::observability::{logging, metrics};
use secure_api::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "secure-api", version, about = "HTTP API with input threat detection")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "SECURE_API_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    logging::init(&config.observability, config.environment);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "secure-api starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_termination().await;
            shutdown.trigger();
        }
    });

    server.run(listener, signal).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
