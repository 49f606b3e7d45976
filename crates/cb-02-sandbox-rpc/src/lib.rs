//! # Sandboxed RPC Subsystem
//!
//! Transport between the host page and a cross-origin, sandboxed frame
//! (UI extensions). Unlike the same-process frame bridge, nothing is shared
//! by reference: the two sides exchange serialized envelopes over a
//! postMessage-style channel and only see each other's method names.
//!
//! ## Security
//!
//! - **Sandbox**: frames carry a validated sandbox attribute that can never
//!   include `allow-top-navigation*`.
//! - **Origin restriction**: outgoing messages target the expected origin;
//!   incoming envelopes from any other origin are dropped.
//! - **Least privilege**: an extension can call only the methods in the map
//!   the host hands to the handshake.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  service/  - Connection, CommunicationService, ExtensionHost │
//! └─────────────────────────────────────────────────────────────┘
//!                          ↓ uses ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ports/    - Messenger, FieldAccess                          │
//! │  adapters/ - InMemoryChannel, JsonDocument                   │
//! └─────────────────────────────────────────────────────────────┘
//!                          ↓ uses ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  domain/   - SandboxPolicy, Origin, SandboxedFrame,          │
//! │              MethodMap, pending call store                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{ChannelEnd, InMemoryChannel, JsonDocument};
pub use domain::{
    MethodFuture, MethodMap, Origin, OriginError, PolicyError, SandboxPolicy, SandboxedFrame,
    DEFAULT_SANDBOX,
};
pub use ports::{FieldAccess, Messenger};
pub use service::{
    connect_to_child, connect_to_parent, CommunicationService, ConnectOptions, Connection,
    ExtensionConfig, ExtensionError, ExtensionHost, HostEnvironment, ParentOptions, RemoteApi,
    UserIdentity, EMIT_METHOD, EXTENSION_TOPIC_PREFIX,
};
