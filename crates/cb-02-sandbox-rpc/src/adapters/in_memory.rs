//! In-process channel standing in for `window.postMessage` between a host
//! page and a sandboxed frame.

use crate::domain::Origin;
use crate::ports::Messenger;
use async_trait::async_trait;
use shared_types::{ConnectionError, Envelope, MessageKind};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Factory for connected channel ends.
pub struct InMemoryChannel;

impl InMemoryChannel {
    /// Two connected ends: the first belongs to the document at
    /// `host_origin`, the second to the one at `child_origin`.
    pub fn pair(host_origin: &str, child_origin: &str) -> (ChannelEnd, ChannelEnd) {
        let (to_child, from_host) = mpsc::unbounded_channel();
        let (to_host, from_child) = mpsc::unbounded_channel();
        let host = ChannelEnd::new(host_origin, child_origin, to_child, from_child);
        let child = ChannelEnd::new(child_origin, host_origin, to_host, from_host);
        (host, child)
    }
}

/// One end of an [`InMemoryChannel`].
pub struct ChannelEnd {
    local_origin: String,
    peer_origin: String,
    outbound: mpsc::UnboundedSender<Envelope>,
    inbound: Mutex<mpsc::UnboundedReceiver<Envelope>>,
    posted: AtomicU64,
    dropped: AtomicU64,
}

impl ChannelEnd {
    fn new(
        local_origin: &str,
        peer_origin: &str,
        outbound: mpsc::UnboundedSender<Envelope>,
        inbound: mpsc::UnboundedReceiver<Envelope>,
    ) -> Self {
        Self {
            local_origin: local_origin.to_string(),
            peer_origin: peer_origin.to_string(),
            outbound,
            inbound: Mutex::new(inbound),
            posted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Envelopes delivered to the other end.
    pub fn posted(&self) -> u64 {
        self.posted.load(Ordering::Relaxed)
    }

    /// Envelopes discarded because the target origin did not match.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Messenger for ChannelEnd {
    fn post(&self, kind: MessageKind, target: &Origin) -> Result<(), ConnectionError> {
        if !target.matches(&self.peer_origin) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(
                target = %target,
                peer = %self.peer_origin,
                kind = kind.label(),
                "Target origin mismatch, message not delivered"
            );
            return Ok(());
        }
        self.outbound
            .send(Envelope::new(self.local_origin.clone(), kind))
            .map_err(|_| ConnectionError::ChannelClosed)?;
        self.posted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn recv(&self) -> Option<Envelope> {
        self.inbound.lock().await.recv().await
    }

    fn local_origin(&self) -> &str {
        &self.local_origin
    }
}
