//! # Channel Bridge
//!
//! Runs the channel bridge runtime with one default session until Ctrl+C.

use anyhow::{Context, Result};
use cb_runtime::{ChannelBridgeRuntime, RuntimeConfig};
use cb_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    init_telemetry(&telemetry).context("Failed to initialize telemetry")?;

    let config = RuntimeConfig::from_env().context("Invalid runtime configuration")?;
    let runtime = ChannelBridgeRuntime::start(config).context("Failed to start runtime")?;

    info!(
        service = %telemetry.service_name,
        session = %runtime.default_session().id(),
        "Channel bridge is running. Press Ctrl+C to stop."
    );
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    runtime.shutdown();
    Ok(())
}
