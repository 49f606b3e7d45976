//! Service layer: connections, the single-slot communication service and
//! the extension host built on top of it.

pub mod communication;
pub mod connection;
pub mod extension;

pub use communication::{CommunicationService, EMIT_METHOD};
pub use connection::{
    connect_to_child, connect_to_parent, ConnectOptions, Connection, ParentOptions, RemoteApi,
};
pub use extension::{
    ExtensionConfig, ExtensionError, ExtensionHost, HostEnvironment, UserIdentity,
    EXTENSION_TOPIC_PREFIX,
};
