//! # postMessage Envelope
//!
//! The wrapper for every message crossing the sandboxed frame boundary.
//!
//! ## Handshake
//!
//! ```text
//! child                         parent
//!   │ ─────────── Syn ──────────→ │
//!   │ ←── Ack1 { parent methods } │
//!   │ ── Ack2 { child methods } ─→ │
//!   │                             │   both sides resolve their RemoteApi
//! ```
//!
//! After the handshake either side may send `Call` (answered by `Reply`),
//! `Notify` (never answered) or `Destroy`.
//!
//! ## Security Properties
//!
//! - **Origin stamping**: `origin` is filled in by the transport from the
//!   sending document, the way a browser fills in `MessageEvent.origin`.
//!   Receivers drop envelopes whose origin does not match the expected one.
//! - **Versioning**: receivers reject envelopes with an unknown `version`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Current envelope protocol version.
pub const PROTOCOL_VERSION: u16 = 1;

/// A message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Protocol version for forward compatibility.
    pub version: u16,

    /// Origin of the sending document (`scheme://host[:port]`).
    pub origin: String,

    /// The message itself.
    pub kind: MessageKind,
}

impl Envelope {
    /// Wrap a message sent from `origin`.
    pub fn new(origin: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            origin: origin.into(),
            kind,
        }
    }

    /// Whether this envelope speaks a protocol version we understand.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.version == PROTOCOL_VERSION
    }
}

/// Every message kind exchanged over the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "penpal", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    /// Child announces it is ready to connect.
    Syn,
    /// Parent answers `Syn` with the names of its exposed methods.
    Ack1 { methods: Vec<String> },
    /// Child completes the handshake with the names of its exposed methods.
    Ack2 { methods: Vec<String> },
    /// Invoke a remote method; answered with a `Reply` carrying the same id.
    Call {
        id: Uuid,
        method: String,
        args: Vec<Value>,
    },
    /// Outcome of a previous `Call`.
    Reply { id: Uuid, outcome: CallOutcome },
    /// Invoke a remote method without waiting for an answer.
    Notify { method: String, args: Vec<Value> },
    /// The sender tore the connection down.
    Destroy,
}

impl MessageKind {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Syn => "SYN",
            Self::Ack1 { .. } => "ACK1",
            Self::Ack2 { .. } => "ACK2",
            Self::Call { .. } => "CALL",
            Self::Reply { .. } => "REPLY",
            Self::Notify { .. } => "NOTIFY",
            Self::Destroy => "DESTROY",
        }
    }
}

/// Result of a remote method invocation, in a serializable shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resolution", rename_all = "lowercase")]
pub enum CallOutcome {
    Fulfilled { value: Value },
    Rejected { error: RemoteError },
}

impl From<Result<Value, RemoteError>> for CallOutcome {
    fn from(result: Result<Value, RemoteError>) -> Self {
        match result {
            Ok(value) => Self::Fulfilled { value },
            Err(error) => Self::Rejected { error },
        }
    }
}

impl From<CallOutcome> for Result<Value, RemoteError> {
    fn from(outcome: CallOutcome) -> Self {
        match outcome {
            CallOutcome::Fulfilled { value } => Ok(value),
            CallOutcome::Rejected { error } => Err(error),
        }
    }
}

/// Error raised by a method on the other side of the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
