//! # Session Container
//!
//! Configuration and the per-session object graph.

pub mod config;
pub mod session;

pub use config::{ConfigError, DraftConfig, HostConfig, RpcConfig, RuntimeConfig};
pub use session::{SessionContext, PAGE_STRUCTURE_TOPIC};
