//! # Shared Types Crate
//!
//! Types that cross crate boundaries in the channel bridge:
//!
//! - **Identifiers**: `Topic`, `FrameId`, `SessionId`, `ExtensionId`.
//! - **Envelope**: the `Envelope` / `MessageKind` pair carried over the
//!   sandboxed postMessage channel, including the connection handshake.
//! - **Errors**: `LookupError` for expected absence and `ConnectionError`
//!   for the RPC transport.
//!
//! ## Design Principles
//!
//! - **No ambient globals**: every bus, frame and session is addressed by an
//!   explicit identifier handed out by a registry.
//! - **Origin authority**: the `origin` of an envelope is stamped by the
//!   transport, never trusted from the payload.

pub mod entities;
pub mod envelope;
pub mod errors;

pub use entities::*;
pub use envelope::{CallOutcome, Envelope, MessageKind, RemoteError, PROTOCOL_VERSION};
pub use errors::*;
