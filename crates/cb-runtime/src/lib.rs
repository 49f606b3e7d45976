//! # Channel Bridge Runtime
//!
//! Wires the bus, the two frame transports, the HST scanner and the draft
//! scheduler into sessions, and runs them from the `channel-bridge` binary.
//!
//! ## Modular Structure
//!
//! - `container/` - runtime configuration and the per-session context
//! - `registry/` - session registry keyed by `SessionId`
//! - `adapters/` - bus-backed draft saver and metered publisher
//! - `wiring/` - telemetry monitor and exception funnel
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (metrics, logging)
//! 2. Load and validate configuration
//! 3. Open the default session
//! 4. Run until Ctrl+C, then close every session

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod container;
pub mod registry;
pub mod wiring;

pub use container::{ConfigError, RuntimeConfig, SessionContext};
pub use registry::SessionRegistry;

use std::sync::Arc;
use tracing::info;

/// Session registry plus the session opened at startup.
pub struct ChannelBridgeRuntime {
    sessions: SessionRegistry,
    default_session: Arc<SessionContext>,
}

impl ChannelBridgeRuntime {
    /// Validate `config` and open the default session.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`].
    pub fn start(config: RuntimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            connect_timeout_secs = config.rpc.connect_timeout_secs,
            draft_delay_ms = config.drafts.delay_ms,
            cms_version = %config.host.cms_version,
            "Starting channel bridge runtime"
        );
        let sessions = SessionRegistry::new(config);
        let default_session = sessions.open()?;
        Ok(Self {
            sessions,
            default_session,
        })
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn default_session(&self) -> &Arc<SessionContext> {
        &self.default_session
    }

    /// Close every session.
    pub fn shutdown(&self) {
        info!("Initiating shutdown...");
        let closed = self.sessions.close_all();
        info!(sessions = closed, "Shutdown complete");
    }
}
