//! Outbound port: one end of a postMessage-style channel.

use crate::domain::Origin;
use async_trait::async_trait;
use shared_types::{ConnectionError, Envelope, MessageKind};

/// One end of a cross-document channel.
///
/// Implementations stamp every outgoing envelope with [`local_origin`] and
/// deliver it only if the receiving document matches `target`, the way a
/// browser's `postMessage(message, targetOrigin)` does.
///
/// [`local_origin`]: Messenger::local_origin
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send `kind` to the other end if its origin matches `target`.
    ///
    /// A mismatched target drops the message silently; only a closed channel
    /// is an error.
    fn post(&self, kind: MessageKind, target: &Origin) -> Result<(), ConnectionError>;

    /// Next envelope from the other end, or `None` once the channel is closed.
    async fn recv(&self) -> Option<Envelope>;

    /// Origin of the document owning this end.
    fn local_origin(&self) -> &str;
}
