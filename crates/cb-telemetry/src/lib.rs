//! # Channel Bridge Telemetry
//!
//! Structured logging and Prometheus metrics shared by the runtime.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cb_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CB_SERVICE_NAME` | `channel-bridge` | Service name in logs |
//! | `CB_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `CB_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `CB_JSON_LOGS` | `false` | JSON formatted logs |

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    bus_label, encode_metrics, register_metrics, topic_label, BUS_EVENTS, BUS_EXCEPTIONS,
    BUS_VETOES, DRAFT_SAVES, EXTENSION_CONNECTS, REGISTRY, TOPIC_FAMILIES,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics, then install logging.
///
/// # Errors
///
/// See [`register_metrics`] and [`init_logging`].
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
