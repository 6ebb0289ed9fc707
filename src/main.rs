//! Powerbridge — Meross smart-plug to Riverbed NetIM metric bridge.
//!
//! Polls the Meross cloud for instantaneous electrical readings from
//! MSS310 plugs, matches the plugs against the NetIM device inventory
//! by name, and republishes power, voltage, and current into a NetIM
//! user custom metric class. Runs one pipeline immediately at startup,
//! then once per configured interval, until interrupted.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

mod adapters;
mod config;
mod netim;
mod pipeline;
mod scheduler;

use adapters::meross::MerossSource;
use config::Config;
use netim::NetImClient;
use pipeline::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (structured logs)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "powerbridge=info".into()),
        )
        .with_target(false)
        .init();

    info!("🔌 Powerbridge v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        metric = %config.metric_name,
        interval_minutes = config.poll_interval_minutes,
        netim = %config.netim_base_url,
        "configuration loaded"
    );

    let source = MerossSource::new(config.meross_email.clone(), config.meross_password.clone())
        .context("Failed to set up Meross client")?;
    let netim = NetImClient::new(&config).context("Failed to set up NetIM client")?;

    let pipeline = Arc::new(Pipeline::new(
        Box::new(source),
        Box::new(netim),
        config.metric_name.clone(),
    ));

    tokio::select! {
        _ = scheduler::run(pipeline, config.poll_interval_minutes) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received — shutting down");
        }
    }

    Ok(())
}
