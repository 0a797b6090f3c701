//! Static site server.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌───────────────────────────────────────────────┐
//!                       │                  SITE SERVER                  │
//!   Client Request      │  ┌──────────┐   ┌───────────┐   ┌──────────┐  │
//!   ────────────────────┼─▶│ security │──▶│   rate    │──▶│  assets  │  │
//!                       │  │ headers  │   │  limiter  │   │ resolve  │  │
//!                       │  └──────────┘   └─────┬─────┘   └────┬─────┘  │
//!                       │                       │ 429          │        │
//!   Client Response     │  ┌──────────┐         ▼              ▼        │
//!   ◀───────────────────┼──│  error   │◀── 404 / 500     file stream   │
//!                       │  │responder │                                 │
//!                       │  └──────────┘                                 │
//!                       └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use site_gate::config::{apply_env_overrides, load_config, validation::validate_config, ConfigError};
use site_gate::http::HttpServer;
use site_gate::lifecycle::{signals, startup, Shutdown};
use site_gate::observability::{logging, metrics};
use site_gate::SiteConfig;

#[derive(Parser)]
#[command(name = "site-gate")]
#[command(about = "Serve a static site behind security headers and a rate limiter", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn resolve_config(cli: &Cli) -> Result<SiteConfig, ConfigError> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SiteConfig::default(),
    };
    let config = apply_env_overrides(config)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("site-gate v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        content_root = %config.content.root.display(),
        window_ms = config.rate_limit.window_ms,
        max_requests = config.rate_limit.max_requests,
        "Configuration loaded"
    );

    startup::ensure_data_dir(&config.content.data_dir).await?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::new(config.clone()).await;

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
