//! Telemetry monitor and exception funnel.

use cb_telemetry::{bus_label, topic_label, BUS_EVENTS, BUS_EXCEPTIONS};
use serde_json::Value;
use shared_bus::{Callback, MessageBus, MonitorCallback};
use shared_types::EXCEPTION_TOPIC;
use tracing::{error, trace};

/// Monitor counting every event on `bus_name`, labelled by bus role and
/// topic family.
pub fn telemetry_monitor(bus_name: &str) -> MonitorCallback {
    let bus_name = bus_name.to_string();
    let role = bus_label(&bus_name).to_string();
    MonitorCallback::new(move |_, topic, args| {
        BUS_EVENTS
            .with_label_values(&[role.as_str(), topic_label(topic)])
            .inc();
        trace!(bus = %bus_name, topic, args = args.len(), "Bus event");
    })
}

/// Subscriber logging `[message, detail]` payloads of the exception topic.
pub fn exception_funnel(bus_name: &str) -> Callback {
    let bus_name = bus_name.to_string();
    Callback::new(move |_, args: &[Value]| {
        BUS_EXCEPTIONS.inc();
        let message = args.first().and_then(Value::as_str).unwrap_or("exception");
        let detail = args.get(1).filter(|d| !d.is_null());
        match detail {
            Some(detail) => error!(bus = %bus_name, %detail, "{message}"),
            None => error!(bus = %bus_name, "{message}"),
        }
    })
}

/// Install both observers on `bus`.
pub fn install(bus: &MessageBus) {
    bus.monitor(telemetry_monitor(bus.name()), None);
    bus.subscribe(EXCEPTION_TOPIC, exception_funnel(bus.name()), None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_monitor_counts_events() {
        let bus = MessageBus::new("wiring-monitor-test:session-1");
        install(&bus);

        let counter = BUS_EVENTS.with_label_values(&["wiring-monitor-test", "channel"]);
        let before = counter.get();
        bus.publish("channel:changed", &[json!({"id": "live"})]);
        bus.publish("channel:renamed", &[]);
        assert_eq!(counter.get(), before + 2.0);
    }

    #[test]
    fn test_sessions_share_series() {
        let first = MessageBus::new("wiring-series-test:a");
        let second = MessageBus::new("wiring-series-test:b");
        install(&first);
        install(&second);

        let extension = BUS_EVENTS.with_label_values(&["wiring-series-test", "extension"]);
        let other = BUS_EVENTS.with_label_values(&["wiring-series-test", "other"]);
        let (ext_before, other_before) = (extension.get(), other.get());
        first.publish("extension:score", &[]);
        second.publish("extension:word-count", &[]);
        second.publish("whatever-the-frame-sends", &[]);
        assert_eq!(extension.get(), ext_before + 2.0);
        assert_eq!(other.get(), other_before + 1.0);
    }

    #[test]
    fn test_exception_funnel_counts() {
        let bus = MessageBus::new("wiring-exception-test");
        install(&bus);

        let before = BUS_EXCEPTIONS.get();
        assert!(bus.exception("Save failed", None));
        assert!(BUS_EXCEPTIONS.get() >= before + 1.0);
        assert_eq!(bus.subscriber_count(EXCEPTION_TOPIC), 1);
        assert_eq!(bus.monitor_count(), 1);
    }
}
