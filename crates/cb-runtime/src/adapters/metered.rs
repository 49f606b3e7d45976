//! [`EventPublisher`] over a session bus that counts vetoed dispatches.

use cb_telemetry::{bus_label, BUS_VETOES};
use serde_json::Value;
use shared_bus::{EventPublisher, MessageBus};

/// Publishes on a [`MessageBus`] and records vetoes in `BUS_VETOES`.
#[derive(Debug, Clone)]
pub struct MeteredPublisher {
    bus: MessageBus,
}

impl MeteredPublisher {
    pub fn new(bus: MessageBus) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }
}

impl EventPublisher for MeteredPublisher {
    fn publish(&self, topic: &str, args: &[Value]) -> bool {
        let delivered = self.bus.publish(topic, args);
        if !delivered {
            BUS_VETOES
                .with_label_values(&[bus_label(self.bus.name())])
                .inc();
        }
        delivered
    }

    fn events_published(&self) -> u64 {
        self.bus.events_published()
    }
}
