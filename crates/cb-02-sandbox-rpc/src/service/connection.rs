//! # Connection
//!
//! Handshake and RPC over a [`Messenger`].
//!
//! ```text
//! connect_to_child                       connect_to_parent
//!   (host side)                            (frame side)
//!        │ ←──────────── SYN ─────────────── │
//!        │ ── ACK1 { host method names } ──→ │
//!        │ ←─ ACK2 { frame method names } ── │
//!   RemoteApi ready                     RemoteApi ready
//!        │ ── CALL { id } ─────────────────→ │
//!        │ ←──────────────── REPLY { id } ── │
//!        │ ── DESTROY ─────────────────────→ │
//! ```
//!
//! Each connection runs one driver task: it performs the handshake, then
//! serves incoming calls and routes replies to the pending call store.
//! Notifications run one at a time on a separate task owned by the driver,
//! so a stalled handler never holds up replies or `DESTROY`.
//! Envelopes whose stamped origin does not match the expected remote origin
//! are dropped before they reach any of that.

use crate::domain::pending::PendingCalls;
use crate::domain::{MethodMap, Origin, SandboxedFrame};
use crate::ports::Messenger;
use parking_lot::Mutex;
use serde_json::Value;
use shared_types::{ConnectionError, Envelope, MessageKind, RemoteError, PROTOCOL_VERSION};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Host-side options for [`connect_to_child`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub frame: SandboxedFrame,
    /// Expected child origin. Defaults to the origin of `frame.src`.
    pub origin: Option<Origin>,
    /// Methods the child may call on the host.
    pub methods: MethodMap,
    /// Reject with `Timeout` if the handshake takes longer.
    pub timeout: Option<Duration>,
}

impl ConnectOptions {
    pub fn new(frame: SandboxedFrame) -> Self {
        Self {
            frame,
            origin: None,
            methods: MethodMap::new(),
            timeout: None,
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_methods(mut self, methods: MethodMap) -> Self {
        self.methods = methods;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Frame-side options for [`connect_to_parent`].
#[derive(Debug, Clone)]
pub struct ParentOptions {
    pub parent_origin: Origin,
    pub methods: MethodMap,
    pub timeout: Option<Duration>,
}

impl ParentOptions {
    pub fn new(parent_origin: Origin) -> Self {
        Self {
            parent_origin,
            methods: MethodMap::new(),
            timeout: None,
        }
    }

    pub fn with_methods(mut self, methods: MethodMap) -> Self {
        self.methods = methods;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Parent,
    Child,
}

#[derive(Debug, Clone)]
enum HandshakeState {
    Pending,
    Ready(Arc<Vec<String>>),
    Failed(ConnectionError),
}

struct Shared {
    peer: String,
    messenger: Arc<dyn Messenger>,
    remote_origin: Origin,
    methods: MethodMap,
    pending: PendingCalls,
    destroyed: AtomicBool,
    state: watch::Sender<HandshakeState>,
}

impl Shared {
    fn new(
        peer: String,
        messenger: Arc<dyn Messenger>,
        remote_origin: Origin,
        methods: MethodMap,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(HandshakeState::Pending);
        Arc::new(Self {
            peer,
            messenger,
            remote_origin,
            methods,
            pending: PendingCalls::new(),
            destroyed: AtomicBool::new(false),
            state,
        })
    }

    fn post(&self, kind: MessageKind) -> Result<(), ConnectionError> {
        self.messenger.post(kind, &self.remote_origin)
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Mark the connection dead and fail everything waiting on it. Returns
    /// whether this call was the one that closed it.
    fn close(&self, error: ConnectionError) -> bool {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.pending.reject_all(&error);
        self.state.send_replace(HandshakeState::Failed(error));
        true
    }

    /// Next envelope from the expected origin.
    async fn next(&self) -> Result<Envelope, ConnectionError> {
        loop {
            let envelope = self
                .messenger
                .recv()
                .await
                .ok_or(ConnectionError::ChannelClosed)?;
            if !self.remote_origin.matches(&envelope.origin) {
                debug!(
                    peer = %self.peer,
                    expected = %self.remote_origin,
                    received = %envelope.origin,
                    kind = envelope.kind.label(),
                    "Dropped message from unexpected origin"
                );
                continue;
            }
            if !envelope.is_supported() {
                return Err(ConnectionError::UnsupportedVersion {
                    received: envelope.version,
                    supported: PROTOCOL_VERSION,
                });
            }
            return Ok(envelope);
        }
    }
}

async fn handshake(shared: &Shared, role: Role) -> Result<Vec<String>, ConnectionError> {
    if role == Role::Child {
        shared.post(MessageKind::Syn)?;
    }
    let mut acknowledged = false;
    loop {
        let envelope = shared.next().await?;
        match (role, envelope.kind) {
            (Role::Parent, MessageKind::Syn) => {
                shared.post(MessageKind::Ack1 {
                    methods: shared.methods.names(),
                })?;
                acknowledged = true;
            }
            (Role::Parent, MessageKind::Ack2 { methods }) if acknowledged => return Ok(methods),
            (Role::Child, MessageKind::Ack1 { methods }) => {
                shared.post(MessageKind::Ack2 {
                    methods: shared.methods.names(),
                })?;
                return Ok(methods);
            }
            (_, MessageKind::Destroy) => return Err(ConnectionError::Destroyed),
            (_, other) => {
                debug!(
                    peer = %shared.peer,
                    kind = other.label(),
                    "Ignoring message during handshake"
                );
            }
        }
    }
}

async fn drive(shared: Arc<Shared>, role: Role, timeout: Option<Duration>) {
    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, handshake(&shared, role))
            .await
            .unwrap_or(Err(ConnectionError::Timeout {
                timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            })),
        None => handshake(&shared, role).await,
    };

    let remote_methods = match outcome {
        Ok(methods) => methods,
        Err(error) => {
            warn!(peer = %shared.peer, error = %error, "Handshake failed");
            shared.close(error);
            return;
        }
    };

    let remote_methods = Arc::new(remote_methods);
    let installed = shared.state.send_if_modified(|state| {
        if matches!(state, HandshakeState::Pending) {
            *state = HandshakeState::Ready(remote_methods.clone());
            true
        } else {
            false
        }
    });
    if !installed {
        return;
    }
    info!(peer = %shared.peer, remote_methods = ?remote_methods, "Connection established");
    serve(shared).await;
}

/// Aborts the task when dropped, including when the owning task is aborted.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

type Notification = (String, Vec<Value>);

async fn run_notifications(
    shared: Arc<Shared>,
    mut queue: mpsc::UnboundedReceiver<Notification>,
) {
    while let Some((method, args)) = queue.recv().await {
        if let Err(error) = shared.methods.invoke(&method, args).await {
            debug!(peer = %shared.peer, method, error = %error, "Notification handler failed");
        }
    }
}

async fn serve(shared: Arc<Shared>) {
    let (notifications, queue) = mpsc::unbounded_channel();
    let _worker = AbortOnDrop(tokio::spawn(run_notifications(shared.clone(), queue)));
    loop {
        let envelope = match shared.next().await {
            Ok(envelope) => envelope,
            Err(ConnectionError::ChannelClosed) => {
                if shared.close(ConnectionError::ChannelClosed) {
                    info!(peer = %shared.peer, "Channel closed");
                }
                return;
            }
            Err(error) => {
                warn!(peer = %shared.peer, error = %error, "Discarding message");
                continue;
            }
        };

        match envelope.kind {
            MessageKind::Call { id, method, args } => {
                let responder = shared.clone();
                tokio::spawn(async move {
                    let outcome = responder.methods.invoke(&method, args).await;
                    if responder.is_destroyed() {
                        return;
                    }
                    if let Err(error) = responder.post(MessageKind::Reply {
                        id,
                        outcome: outcome.into(),
                    }) {
                        debug!(peer = %responder.peer, method, error = %error, "Reply not sent");
                    }
                });
            }
            MessageKind::Notify { method, args } => {
                if notifications.send((method, args)).is_err() {
                    debug!(peer = %shared.peer, "Notification worker gone");
                }
            }
            MessageKind::Reply { id, outcome } => {
                let result: Result<Value, RemoteError> = outcome.into();
                shared.pending.complete(id, result.map_err(ConnectionError::from));
            }
            MessageKind::Destroy => {
                if shared.close(ConnectionError::Destroyed) {
                    info!(peer = %shared.peer, "Remote side destroyed the connection");
                }
                return;
            }
            other => {
                debug!(
                    peer = %shared.peer,
                    kind = other.label(),
                    "Ignoring handshake message on an open connection"
                );
            }
        }
    }
}

/// A live (or pending) connection to the other side.
///
/// Dropping it destroys it.
pub struct Connection {
    frame: Option<SandboxedFrame>,
    shared: Arc<Shared>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    fn start(
        frame: Option<SandboxedFrame>,
        shared: Arc<Shared>,
        role: Role,
        timeout: Option<Duration>,
    ) -> Self {
        let driver = tokio::spawn(drive(shared.clone(), role, timeout));
        Self {
            frame,
            shared,
            driver: Mutex::new(Some(driver)),
        }
    }

    /// The child frame, on the host side.
    pub fn frame(&self) -> Option<&SandboxedFrame> {
        self.frame.as_ref()
    }

    pub fn remote_origin(&self) -> &Origin {
        &self.shared.remote_origin
    }

    /// Wait for the handshake.
    ///
    /// # Errors
    ///
    /// `Timeout`, `Destroyed`, `ChannelClosed` or `UnsupportedVersion` if the
    /// handshake did not complete.
    pub async fn remote_api(&self) -> Result<RemoteApi, ConnectionError> {
        let mut state = self.shared.state.subscribe();
        loop {
            let current = state.borrow_and_update().clone();
            match current {
                HandshakeState::Ready(methods) => {
                    return Ok(RemoteApi::new(self.shared.clone(), methods))
                }
                HandshakeState::Failed(error) => return Err(error),
                HandshakeState::Pending => {}
            }
            if state.changed().await.is_err() {
                return Err(ConnectionError::Destroyed);
            }
        }
    }

    /// The remote API if the handshake has already completed.
    pub fn try_remote(&self) -> Option<RemoteApi> {
        match &*self.shared.state.borrow() {
            HandshakeState::Ready(methods) => {
                Some(RemoteApi::new(self.shared.clone(), methods.clone()))
            }
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.try_remote().is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.is_destroyed()
    }

    /// Calls still waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.shared.pending.len()
    }

    /// Calls that received a reply over the life of this connection.
    pub fn completed_calls(&self) -> u64 {
        self.shared.pending.completed()
    }

    /// Tear the connection down: tell the other side, reject pending calls
    /// with `Destroyed` and stop the driver. Idempotent.
    pub fn destroy(&self) {
        if self.shared.close(ConnectionError::Destroyed) {
            if let Err(error) = self.shared.post(MessageKind::Destroy) {
                debug!(peer = %self.shared.peer, error = %error, "Destroy notice not delivered");
            }
            info!(peer = %self.shared.peer, "Connection destroyed");
        }
        if let Some(driver) = self.driver.lock().take() {
            driver.abort();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.shared.peer)
            .field("remote_origin", &self.shared.remote_origin)
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

/// Methods the other side exposed during the handshake.
#[derive(Clone)]
pub struct RemoteApi {
    shared: Arc<Shared>,
    methods: Arc<Vec<String>>,
}

impl RemoteApi {
    fn new(shared: Arc<Shared>, methods: Arc<Vec<String>>) -> Self {
        Self { shared, methods }
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m == name)
    }

    pub fn is_connected(&self) -> bool {
        !self.shared.is_destroyed()
    }

    /// Call `method` and wait for its reply.
    ///
    /// # Errors
    ///
    /// - `Destroyed` if the connection is, or becomes, destroyed
    /// - `MethodNotFound` if the other side never exposed `method`
    /// - `Remote` if the remote method rejected
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, ConnectionError> {
        self.ensure_callable(method)?;
        let (id, reply) = self.shared.pending.register(method)?;
        if let Err(error) = self.shared.post(MessageKind::Call {
            id,
            method: method.to_string(),
            args,
        }) {
            self.shared.pending.forget(id);
            return Err(error);
        }
        reply.await.unwrap_or(Err(ConnectionError::Destroyed))
    }

    /// Invoke `method` without waiting for an answer.
    pub fn notify(&self, method: &str, args: Vec<Value>) -> Result<(), ConnectionError> {
        self.ensure_callable(method)?;
        self.shared.post(MessageKind::Notify {
            method: method.to_string(),
            args,
        })
    }

    fn ensure_callable(&self, method: &str) -> Result<(), ConnectionError> {
        if self.shared.is_destroyed() {
            return Err(ConnectionError::Destroyed);
        }
        if !self.has_method(method) {
            return Err(ConnectionError::MethodNotFound(method.to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for RemoteApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteApi")
            .field("peer", &self.shared.peer)
            .field("methods", &self.methods)
            .finish()
    }
}

/// Host side: connect to a sandboxed child frame.
///
/// Returns immediately; await [`Connection::remote_api`] for the handshake.
///
/// # Panics
///
/// Must be called from within a Tokio runtime.
pub fn connect_to_child(options: ConnectOptions, messenger: Arc<dyn Messenger>) -> Connection {
    let ConnectOptions {
        frame,
        origin,
        methods,
        timeout,
    } = options;
    let remote_origin = origin.unwrap_or_else(|| frame.origin().clone());
    debug!(frame = %frame.id(), origin = %remote_origin, "Connecting to child frame");
    let shared = Shared::new(frame.id().to_string(), messenger, remote_origin, methods);
    Connection::start(Some(frame), shared, Role::Parent, timeout)
}

/// Frame side: connect to the embedding page.
///
/// # Panics
///
/// Must be called from within a Tokio runtime.
pub fn connect_to_parent(options: ParentOptions, messenger: Arc<dyn Messenger>) -> Connection {
    let ParentOptions {
        parent_origin,
        methods,
        timeout,
    } = options;
    debug!(origin = %parent_origin, "Connecting to parent");
    let shared = Shared::new("parent".to_string(), messenger, parent_origin, methods);
    Connection::start(None, shared, Role::Child, timeout)
}
