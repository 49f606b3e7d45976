//! # Frame Bridge
//!
//! Two buses per embedded frame, one per direction. Each endpoint can only
//! publish in its own outbound direction and subscribe to the other.

use serde_json::Value;
use shared_bus::{Callback, EventPublisher, MessageBus, MonitorCallback, Scope};
use shared_types::FrameId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// The bus pair shared by a host page and one same-process frame.
#[derive(Debug)]
pub struct FrameBridge {
    id: FrameId,
    host_to_frame: MessageBus,
    frame_to_host: MessageBus,
    destroyed: AtomicBool,
}

impl FrameBridge {
    pub(crate) fn new(id: FrameId) -> Self {
        Self {
            host_to_frame: MessageBus::new(format!("{id}:host-to-frame")),
            frame_to_host: MessageBus::new(format!("{id}:frame-to-host")),
            id,
            destroyed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn id(&self) -> &FrameId {
        &self.id
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Clear both buses. Idempotent.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.host_to_frame.clear();
        self.frame_to_host.clear();
        debug!(frame = %self.id, "Frame bridge destroyed");
    }
}

/// Opaque handle returned by frame registration.
#[derive(Debug, Clone)]
pub struct FrameHandle {
    bridge: Arc<FrameBridge>,
}

impl FrameHandle {
    pub(crate) fn new(bridge: Arc<FrameBridge>) -> Self {
        Self { bridge }
    }

    #[must_use]
    pub fn id(&self) -> &FrameId {
        self.bridge.id()
    }

    /// The host page's side of the bridge.
    #[must_use]
    pub fn host(&self) -> HostEndpoint {
        HostEndpoint {
            side: Side::new(self.bridge.clone(), Direction::HostToFrame),
        }
    }

    /// The frame document's side of the bridge.
    #[must_use]
    pub fn frame(&self) -> FrameEndpoint {
        FrameEndpoint {
            side: Side::new(self.bridge.clone(), Direction::FrameToHost),
        }
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.bridge.is_destroyed()
    }

    /// Whether both handles refer to the same registration.
    #[must_use]
    pub fn same_frame(&self, other: &FrameHandle) -> bool {
        Arc::ptr_eq(&self.bridge, &other.bridge)
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    HostToFrame,
    FrameToHost,
}

/// One side of a bridge: publishes on its outbound bus, listens on the other.
#[derive(Debug, Clone)]
struct Side {
    bridge: Arc<FrameBridge>,
    outbound: Direction,
}

impl Side {
    fn new(bridge: Arc<FrameBridge>, outbound: Direction) -> Self {
        Self { bridge, outbound }
    }

    fn outbound(&self) -> &MessageBus {
        match self.outbound {
            Direction::HostToFrame => &self.bridge.host_to_frame,
            Direction::FrameToHost => &self.bridge.frame_to_host,
        }
    }

    fn inbound(&self) -> &MessageBus {
        match self.outbound {
            Direction::HostToFrame => &self.bridge.frame_to_host,
            Direction::FrameToHost => &self.bridge.host_to_frame,
        }
    }

    fn accepting(&self, topic: &str) -> bool {
        if self.bridge.is_destroyed() {
            warn!(frame = %self.bridge.id, topic, "Subscription on a destroyed frame ignored");
            return false;
        }
        true
    }

    fn subscribe(&self, topic: &str, callback: Callback, scope: Option<Scope>) {
        if self.accepting(topic) {
            self.inbound().subscribe(topic, callback, scope);
        }
    }

    fn subscribe_once(&self, topic: &str, callback: Callback, scope: Option<Scope>) {
        if self.accepting(topic) {
            self.inbound().subscribe_once(topic, callback, scope);
        }
    }

    fn monitor(&self, callback: MonitorCallback, scope: Option<Scope>) {
        if self.accepting("*") {
            self.inbound().monitor(callback, scope);
        }
    }
}

macro_rules! endpoint_api {
    ($endpoint:ident) => {
        impl $endpoint {
            /// Publish towards the other side.
            pub fn publish(&self, topic: &str, args: &[Value]) -> bool {
                self.side.outbound().publish(topic, args)
            }

            /// Listen to events from the other side. Ignored after destroy.
            pub fn subscribe(&self, topic: &str, callback: Callback, scope: Option<Scope>) {
                self.side.subscribe(topic, callback, scope);
            }

            pub fn subscribe_once(&self, topic: &str, callback: Callback, scope: Option<Scope>) {
                self.side.subscribe_once(topic, callback, scope);
            }

            pub fn unsubscribe(
                &self,
                topic: &str,
                callback: &Callback,
                scope: Option<&Scope>,
            ) -> bool {
                self.side.inbound().unsubscribe(topic, callback, scope)
            }

            /// Observe every event coming from the other side.
            pub fn monitor(&self, callback: MonitorCallback, scope: Option<Scope>) {
                self.side.monitor(callback, scope);
            }

            #[must_use]
            pub fn frame_id(&self) -> &FrameId {
                self.side.bridge.id()
            }
        }

        impl EventPublisher for $endpoint {
            fn publish(&self, topic: &str, args: &[Value]) -> bool {
                $endpoint::publish(self, topic, args)
            }

            fn events_published(&self) -> u64 {
                self.side.outbound().events_published()
            }
        }
    };
}

/// Host page side: publishes `host_to_frame`, subscribes `frame_to_host`.
#[derive(Debug, Clone)]
pub struct HostEndpoint {
    side: Side,
}

/// Frame side: publishes `frame_to_host`, subscribes `host_to_frame`.
#[derive(Debug, Clone)]
pub struct FrameEndpoint {
    side: Side,
}

endpoint_api!(HostEndpoint);
endpoint_api!(FrameEndpoint);
