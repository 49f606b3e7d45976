//! Pending call store: maps call ids to the tasks awaiting their replies.
//!
//! Flow:
//! 1. `RemoteApi::call` registers an id and gets a oneshot receiver
//! 2. the `Call` envelope goes out carrying that id
//! 3. the connection driver receives the `Reply` and calls `complete()`
//! 4. the caller's receiver resolves
//!
//! Once `reject_all` has run the store is closed: every later `register`
//! fails, so no call can be left waiting on a dead connection.

use dashmap::DashMap;
use serde_json::Value;
use shared_types::ConnectionError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

pub(crate) type CallResult = Result<Value, ConnectionError>;

struct PendingCall {
    sender: oneshot::Sender<CallResult>,
    method: String,
    created_at: Instant,
}

#[derive(Default)]
pub(crate) struct PendingCalls {
    pending: DashMap<Uuid, PendingCall>,
    closed: AtomicBool,
    completed: AtomicU64,
}

impl PendingCalls {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a call and get the receiver for its outcome.
    pub(crate) fn register(
        &self,
        method: &str,
    ) -> Result<(Uuid, oneshot::Receiver<CallResult>), ConnectionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConnectionError::Destroyed);
        }
        let id = Uuid::new_v4();
        let (sender, receiver) = oneshot::channel();
        self.pending.insert(
            id,
            PendingCall {
                sender,
                method: method.to_string(),
                created_at: Instant::now(),
            },
        );
        // reject_all may have drained between the check and the insert
        if self.closed.load(Ordering::Acquire) {
            self.pending.remove(&id);
            return Err(ConnectionError::Destroyed);
        }
        debug!(call_id = %id, method, "Registered pending call");
        Ok((id, receiver))
    }

    /// Resolve a call. Returns false for unknown ids or dropped callers.
    pub(crate) fn complete(&self, id: Uuid, result: CallResult) -> bool {
        let Some((_, call)) = self.pending.remove(&id) else {
            warn!(call_id = %id, "Reply for unknown call id");
            return false;
        };
        let elapsed_ms = call.created_at.elapsed().as_millis();
        if call.sender.send(result).is_err() {
            debug!(call_id = %id, method = call.method, "Caller gone before reply");
            return false;
        }
        self.completed.fetch_add(1, Ordering::Relaxed);
        debug!(call_id = %id, method = call.method, elapsed_ms, "Completed pending call");
        true
    }

    /// Drop a call without resolving it (the request never left).
    pub(crate) fn forget(&self, id: Uuid) {
        self.pending.remove(&id);
    }

    /// Close the store and reject every waiting call with `error`.
    pub(crate) fn reject_all(&self, error: &ConnectionError) -> usize {
        self.closed.store(true, Ordering::Release);
        let ids: Vec<Uuid> = self.pending.iter().map(|entry| *entry.key()).collect();
        let mut rejected = 0;
        for id in ids {
            if let Some((_, call)) = self.pending.remove(&id) {
                let _ = call.sender.send(Err(error.clone()));
                rejected += 1;
            }
        }
        if rejected > 0 {
            debug!(rejected, error = %error, "Rejected pending calls");
        }
        rejected
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}
