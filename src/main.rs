//! Provider failover engine.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                      PROVIDER FAILOVER ENGINE                     │
//!   │                                                                   │
//!   │  ┌────────────┐  Outcome   ┌──────────┐  HealthChange             │
//!   │  │  observer  │──────────▶│ tracker  │──────────────┐            │
//!   │  │ (probe +   │            │(hysteresis)             │            │
//!   │  │  timeout)  │            └────┬─────┘              ▼            │
//!   │  └────────────┘                 │ status     ┌──────────────┐     │
//!   │   one monitor per provider      ▼            │   failover   │     │
//!   │                          ┌────────────┐      │   service    │     │
//!   │                          │  registry  │      │ (controller) │     │
//!   │                          └─────┬──────┘      └──────┬───────┘     │
//!   │                                │                    │ append      │
//!   │                                │                    ▼             │
//!   │   operator ──▶ admin API ◀─────┴──────────── event log (JSONL)    │
//!   │                                                                   │
//!   │   config · logging · metrics · lifecycle                          │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use provider_failover::config::load_config;
use provider_failover::lifecycle::{shutdown_signal, Engine};
use provider_failover::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "provider-failover")]
#[command(about = "Provider health tracking and failover engine", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "failover.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        providers = config.providers.len(),
        "provider-failover starting"
    );

    if config.observability.metrics_enabled {
        // Already checked by validate_config.
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let engine = Engine::start(config).await?;
    shutdown_signal().await;
    engine.shutdown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
