//! Movie catalog API server.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ trace/request id ──▶ metrics ──▶ rate limit ──▶ catch panic
//!                                                                  │
//!          ┌───────────────────────────────────────────────────────┘
//!          ▼
//!        cors ──▶ timeout ──▶ authenticate ──▶ guard chain ──▶ handler
//!                                                                  │
//!                                                                  ▼
//!                                                 Models (deadline, id checks)
//!                                                                  │
//!                                                                  ▼
//!                                                         MemoryStore (CAS)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use catalog_api::config::{read_config, validate_config, AppConfig, ConfigError};
use catalog_api::lifecycle::signals::spawn_signal_listener;
use catalog_api::observability::{init_logging, init_metrics};
use catalog_api::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "catalog-api", version, about = "Movie catalog JSON API")]
struct Args {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:4000
    #[arg(long)]
    bind: Option<String>,

    /// Environment (development|staging|production)
    #[arg(long)]
    env: Option<String>,

    /// Enable or disable the rate limiter
    #[arg(long)]
    limiter_enabled: Option<bool>,

    /// Rate limiter refill rate per client
    #[arg(long)]
    limiter_rps: Option<f64>,

    /// Rate limiter burst size
    #[arg(long)]
    limiter_burst: Option<u32>,

    /// Trusted CORS origins (space separated)
    #[arg(long, value_delimiter = ' ', num_args = 1..)]
    cors_trusted_origins: Vec<String>,
}

impl Args {
    fn apply(self, config: &mut AppConfig) {
        if let Some(bind) = self.bind {
            config.server.bind_address = bind;
        }
        if let Some(env) = self.env {
            config.server.environment = env;
        }
        if let Some(enabled) = self.limiter_enabled {
            config.rate_limit.enabled = enabled;
        }
        if let Some(rps) = self.limiter_rps {
            config.rate_limit.requests_per_second = rps;
        }
        if let Some(burst) = self.limiter_burst {
            config.rate_limit.burst_size = burst;
        }
        if !self.cors_trusted_origins.is_empty() {
            config.cors.trusted_origins = self.cors_trusted_origins;
        }
    }
}

fn load(mut args: Args) -> Result<AppConfig, ConfigError> {
    let mut config = match args.config.take() {
        Some(path) => read_config(&path)?,
        None => AppConfig::default(),
    };
    args.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load(Args::parse())?;

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "catalog-api starting");

    tracing::info!(
        bind_address = %config.server.bind_address,
        environment = %config.server.environment,
        limiter_enabled = config.rate_limit.enabled,
        limiter_rps = config.rate_limit.requests_per_second,
        limiter_burst = config.rate_limit.burst_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    HttpServer::new(config).run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
