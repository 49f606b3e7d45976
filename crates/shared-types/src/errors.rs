//! # Error Types
//!
//! Errors shared across the bus, the registries and the transport adapters.

use thiserror::Error;

use crate::entities::{ExtensionId, FrameId, SessionId};

/// A lookup for something that is not registered.
///
/// Missing targets are a configuration/state error: callers get a
/// descriptive error instead of a silently substituted default.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// No frame is registered under this id.
    #[error("Frame '{0}' is not registered in this session")]
    FrameNotFound(FrameId),

    /// A frame with this id is already registered.
    #[error("Frame '{0}' is already registered")]
    FrameAlreadyRegistered(FrameId),

    /// The session was closed or never opened.
    #[error("Session {0} does not exist")]
    SessionNotFound(SessionId),

    /// The session still exists but has been torn down.
    #[error("Session {0} has been closed")]
    SessionClosed(SessionId),

    /// No extension with this id is configured.
    #[error("Extension '{0}' is not configured")]
    ExtensionNotFound(ExtensionId),
}

/// Errors from the sandboxed RPC channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// A request was made while no connection is installed.
    #[error("No active connection")]
    NotConnected,

    /// The connection was destroyed before or during the call.
    #[error("Connection has been destroyed")]
    Destroyed,

    /// The handshake did not complete in time.
    #[error("Handshake did not complete within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// The handshake could not be completed.
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    /// The other side did not expose the requested method.
    #[error("Remote does not expose method '{0}'")]
    MethodNotFound(String),

    /// The remote method ran and rejected.
    #[error("Remote call failed: {message}")]
    Remote { message: String },

    /// The underlying channel is gone.
    #[error("Channel closed")]
    ChannelClosed,

    /// A message arrived from an unexpected origin.
    #[error("Origin mismatch: expected {expected}, received {received}")]
    OriginMismatch { expected: String, received: String },

    /// The other side speaks an unknown envelope version.
    #[error("Unsupported protocol version: received {received}, supported {supported}")]
    UnsupportedVersion { received: u16, supported: u16 },
}

impl ConnectionError {
    /// Whether the error is final for the connection (as opposed to one
    /// failed call on a live connection).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MethodNotFound(_) | Self::Remote { .. })
    }
}

impl From<crate::envelope::RemoteError> for ConnectionError {
    fn from(error: crate::envelope::RemoteError) -> Self {
        Self::Remote {
            message: error.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::RemoteError;

    #[test]
    fn test_lookup_error_names_the_frame() {
        let err = LookupError::FrameNotFound(FrameId::new("preview-frame"));
        assert_eq!(
            err.to_string(),
            "Frame 'preview-frame' is not registered in this session"
        );
    }

    #[test]
    fn test_remote_error_converts() {
        let err: ConnectionError = RemoteError::new("field is read-only").into();
        assert_eq!(
            err,
            ConnectionError::Remote {
                message: "field is read-only".to_string()
            }
        );
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(ConnectionError::Destroyed.is_fatal());
        assert!(ConnectionError::Timeout { timeout_ms: 10 }.is_fatal());
        assert!(!ConnectionError::MethodNotFound("emit".into()).is_fatal());
    }
}
