//! Prometheus metrics.
//!
//! All metrics follow the naming convention: `cb_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // MESSAGE BUS
    // =========================================================================

    /// Events published, by bus role and topic family
    pub static ref BUS_EVENTS: CounterVec = CounterVec::new(
        Opts::new("cb_bus_events_total", "Events published on session buses"),
        &["bus", "topic"]
    ).expect("metric creation failed");

    /// Dispatches stopped early by a subscriber
    pub static ref BUS_VETOES: CounterVec = CounterVec::new(
        Opts::new("cb_bus_vetoes_total", "Dispatches short-circuited by a subscriber"),
        &["bus"]
    ).expect("metric creation failed");

    /// Payloads published on the exception topic
    pub static ref BUS_EXCEPTIONS: Counter = Counter::new(
        "cb_bus_exceptions_total",
        "Exceptions reported through the exception topic"
    ).expect("metric creation failed");

    // =========================================================================
    // EXTENSIONS
    // =========================================================================

    /// Extension handshakes, by outcome (connected/failed)
    pub static ref EXTENSION_CONNECTS: CounterVec = CounterVec::new(
        Opts::new("cb_extension_connects_total", "Extension connection attempts"),
        &["outcome"]
    ).expect("metric creation failed");

    // =========================================================================
    // DRAFTS
    // =========================================================================

    /// Draft saves, by outcome (saved/failed)
    pub static ref DRAFT_SAVES: CounterVec = CounterVec::new(
        Opts::new("cb_draft_saves_total", "Draft saves issued by the draft scheduler"),
        &["outcome"]
    ).expect("metric creation failed");
}

// =============================================================================
// LABELS
// =============================================================================

/// Topic families reported as-is; anything else is `other`.
pub const TOPIC_FAMILIES: &[&str] = &[
    "channel",
    "component",
    "dialog",
    "document",
    "exception",
    "extension",
    "page",
];

/// Label for a bus: its name up to the first `:`, dropping the session id.
#[must_use]
pub fn bus_label(bus_name: &str) -> &str {
    bus_name.split(':').next().unwrap_or(bus_name)
}

/// Label for a topic: its family (the part before `:`) when known,
/// otherwise `other`.
#[must_use]
pub fn topic_label(topic: &str) -> &'static str {
    let family = topic.split(':').next().unwrap_or(topic);
    TOPIC_FAMILIES
        .iter()
        .find(|known| **known == family)
        .copied()
        .unwrap_or("other")
}

/// Register all metrics with the global registry. Calling it again is a
/// no-op.
///
/// # Errors
///
/// `MetricsInit` when the registry rejects a collector.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(BUS_EVENTS.clone()),
        Box::new(BUS_VETOES.clone()),
        Box::new(BUS_EXCEPTIONS.clone()),
        Box::new(EXTENSION_CONNECTS.clone()),
        Box::new(DRAFT_SAVES.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
///
/// # Errors
///
/// `MetricsInit` when encoding fails.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
