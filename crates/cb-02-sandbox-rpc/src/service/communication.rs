//! Single-slot connection holder used by the host for one extension frame.

use super::connection::{connect_to_child, ConnectOptions, Connection, RemoteApi};
use crate::domain::{MethodMap, Origin, SandboxedFrame};
use crate::ports::Messenger;
use parking_lot::Mutex;
use serde_json::Value;
use shared_types::ConnectionError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Method every extension is expected to expose for host events.
pub const EMIT_METHOD: &str = "emit";

/// Holds at most one connection. Connecting again tears down the previous
/// connection before the new one is installed.
#[derive(Debug, Default)]
pub struct CommunicationService {
    slot: Mutex<Option<Arc<Connection>>>,
    timeout: Option<Duration>,
}

impl CommunicationService {
    /// Service without a handshake timeout.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            slot: Mutex::new(None),
            timeout,
        }
    }

    /// Connect to `frame`, replacing any current connection.
    ///
    /// # Errors
    ///
    /// The handshake error. The slot is left empty in that case.
    pub async fn connect(
        &self,
        frame: SandboxedFrame,
        origin: Option<Origin>,
        methods: MethodMap,
        messenger: Arc<dyn Messenger>,
    ) -> Result<RemoteApi, ConnectionError> {
        self.disconnect();

        let mut options = ConnectOptions::new(frame)
            .with_methods(methods)
            .with_timeout(self.timeout);
        options.origin = origin;
        let connection = Arc::new(connect_to_child(options, messenger));
        *self.slot.lock() = Some(connection.clone());

        match connection.remote_api().await {
            Ok(api) => Ok(api),
            Err(err) => {
                error!(
                    origin = %connection.remote_origin(),
                    error = %err,
                    "Failed to connect to frame"
                );
                let mut slot = self.slot.lock();
                if slot.as_ref().is_some_and(|c| Arc::ptr_eq(c, &connection)) {
                    *slot = None;
                }
                drop(slot);
                connection.destroy();
                Err(err)
            }
        }
    }

    /// Fire-and-forget event to the connected frame.
    ///
    /// Does nothing when there is no established connection or the frame did
    /// not expose `emit`. Never fails.
    pub fn emit(&self, event: &str, payload: Value) {
        let Some(api) = self.current().and_then(|c| c.try_remote()) else {
            debug!(event, "No connection, event not emitted");
            return;
        };
        if !api.has_method(EMIT_METHOD) {
            debug!(event, "Frame does not listen for events");
            return;
        }
        if let Err(err) = api.notify(EMIT_METHOD, vec![Value::String(event.to_string()), payload]) {
            debug!(event, error = %err, "Event not emitted");
        }
    }

    /// Call a method on the connected frame.
    ///
    /// # Errors
    ///
    /// `NotConnected` without an established connection, otherwise whatever
    /// [`RemoteApi::call`] returns.
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, ConnectionError> {
        let connection = self.current().ok_or(ConnectionError::NotConnected)?;
        if connection.is_destroyed() {
            return Err(ConnectionError::Destroyed);
        }
        let api = connection.try_remote().ok_or(ConnectionError::NotConnected)?;
        api.call(method, args).await
    }

    /// Destroy the current connection, if any. Idempotent.
    pub fn disconnect(&self) {
        let previous = self.slot.lock().take();
        if let Some(connection) = previous {
            connection.destroy();
        }
    }

    /// Whether an established, live connection is installed.
    pub fn is_connected(&self) -> bool {
        self.current()
            .is_some_and(|c| !c.is_destroyed() && c.is_ready())
    }

    /// The installed connection, established or not.
    pub fn current(&self) -> Option<Arc<Connection>> {
        self.slot.lock().clone()
    }
}
