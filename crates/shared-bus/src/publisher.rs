//! # Message Bus
//!
//! Ordered, interruptible dispatch over the subscription registry.
//!
//! ## Dispatch
//!
//! ```text
//! publish(topic, args)
//!   │
//!   ├─ snapshot subscribers + monitors (lock held only here)
//!   ├─ for each subscriber in subscription order:
//!   │     once-entry?  claim + remove before the call
//!   │     callback(scope, args) == Veto?  stop topic delivery
//!   └─ every monitor(scope, topic, args)   (always, original args)
//! ```
//!
//! Entries added while a dispatch is running are picked up by the next
//! `publish`. Entries removed while it runs are skipped for the rest of it.

use crate::registry::SubscriptionRegistry;
use crate::scope::Scope;
use crate::subscriber::{Callback, MonitorCallback, Subscriber, Verdict};
use parking_lot::Mutex;
use serde_json::Value;
use shared_types::{Topic, EXCEPTION_TOPIC};
use std::any::Any;
use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Anything that can put an event on a bus.
///
/// Adapters that only need to emit (the extension host, the runtime monitors)
/// take `Arc<dyn EventPublisher>` rather than a concrete bus.
pub trait EventPublisher: Send + Sync {
    /// Deliver `args` on `topic`. Returns `false` iff a subscriber vetoed.
    fn publish(&self, topic: &str, args: &[Value]) -> bool;

    /// Total number of publish calls seen.
    fn events_published(&self) -> u64;
}

/// A subscriber that panicked under [`MessageBus::publish_isolated`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberPanic {
    pub topic: Topic,
    /// Position of the subscriber in the dispatch snapshot.
    pub position: usize,
    pub message: String,
}

/// Outcome of [`MessageBus::publish_isolated`].
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// `false` iff a subscriber vetoed.
    pub delivered: bool,
    /// Number of topic subscribers that ran (panicked ones included).
    pub invoked: usize,
    pub failures: Vec<SubscriberPanic>,
}

impl DispatchReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct BusInner {
    name: String,
    registry: Mutex<SubscriptionRegistry>,
    events_published: AtomicU64,
    events_vetoed: AtomicU64,
}

/// Topic bus with ordered, interruptible delivery and monitors.
///
/// Cloning yields another handle to the same bus.
#[derive(Clone)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

impl MessageBus {
    /// Create an empty bus. `name` shows up in logs only.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(BusInner {
                name: name.into(),
                registry: Mutex::new(SubscriptionRegistry::new()),
                events_published: AtomicU64::new(0),
                events_vetoed: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Add `callback` to `topic`. A missing scope binds to [`Scope::detached`].
    pub fn subscribe(&self, topic: &str, callback: Callback, scope: Option<Scope>) {
        let id = self
            .inner
            .registry
            .lock()
            .add(topic, callback, Scope::or_detached(scope), false);
        debug!(bus = %self.inner.name, topic, id, "Subscribed");
    }

    /// Like [`subscribe`](Self::subscribe), but the entry is removed before
    /// its first invocation.
    pub fn subscribe_once(&self, topic: &str, callback: Callback, scope: Option<Scope>) {
        let id = self
            .inner
            .registry
            .lock()
            .add(topic, callback, Scope::or_detached(scope), true);
        debug!(bus = %self.inner.name, topic, id, "Subscribed once");
    }

    /// Remove the first exact (callback, scope) registration on `topic`.
    pub fn unsubscribe(&self, topic: &str, callback: &Callback, scope: Option<&Scope>) -> bool {
        let scope = scope.cloned().unwrap_or_else(Scope::detached);
        let removed = self.inner.registry.lock().remove(topic, callback, &scope);
        debug!(bus = %self.inner.name, topic, removed, "Unsubscribed");
        removed
    }

    /// Drop every topic subscription. Monitors stay.
    pub fn unsubscribe_all(&self) {
        self.inner.registry.lock().clear_topics();
        debug!(bus = %self.inner.name, "All topic subscriptions removed");
    }

    /// Drop every topic subscription and every monitor.
    pub fn clear(&self) {
        let mut registry = self.inner.registry.lock();
        registry.clear_topics();
        registry.clear_monitors();
        debug!(bus = %self.inner.name, "Bus cleared");
    }

    /// Observe every event published on this bus, whatever the topic.
    pub fn monitor(&self, callback: MonitorCallback, scope: Option<Scope>) {
        self.inner
            .registry
            .lock()
            .add_monitor(callback, Scope::or_detached(scope));
    }

    pub fn unmonitor(&self, callback: &MonitorCallback, scope: Option<&Scope>) -> bool {
        let scope = scope.cloned().unwrap_or_else(Scope::detached);
        self.inner.registry.lock().remove_monitor(callback, &scope)
    }

    /// Deliver `args` on `topic`.
    ///
    /// Subscribers run in subscription order until one returns a veto.
    /// Monitors then run with the same `args`, veto or not. Returns `false`
    /// iff a veto happened; a topic nobody listens to yields `true`.
    ///
    /// # Panics
    ///
    /// A panicking callback is not caught. The panic unwinds out of this
    /// call and the remaining subscribers and monitors are skipped for it.
    /// The bus itself stays usable.
    pub fn publish(&self, topic: &str, args: &[Value]) -> bool {
        self.inner.events_published.fetch_add(1, Ordering::Relaxed);
        let (subscribers, monitors) = {
            let registry = self.inner.registry.lock();
            (registry.snapshot(topic), registry.monitors())
        };
        trace!(bus = %self.inner.name, topic, subscribers = subscribers.len(), "Publishing");

        let mut delivered = true;
        for subscriber in &subscribers {
            if !self.claim(topic, subscriber) {
                continue;
            }
            if subscriber.callback.invoke(&subscriber.scope, args) == Verdict::Veto {
                delivered = false;
                break;
            }
        }
        if !delivered {
            self.record_veto(topic);
        }

        for monitor in monitors.iter().filter(|m| m.is_active()) {
            monitor.callback.invoke(&monitor.scope, topic, args);
        }
        delivered
    }

    /// Like [`publish`](Self::publish), but a panicking callback is caught,
    /// logged and reported, and delivery continues with the next one.
    ///
    /// Each failure is also published on the `"exception"` topic, unless the
    /// failing dispatch was itself on that topic.
    pub fn publish_isolated(&self, topic: &str, args: &[Value]) -> DispatchReport {
        self.inner.events_published.fetch_add(1, Ordering::Relaxed);
        let (subscribers, monitors) = {
            let registry = self.inner.registry.lock();
            (registry.snapshot(topic), registry.monitors())
        };

        let mut report = DispatchReport {
            delivered: true,
            ..DispatchReport::default()
        };
        for (position, subscriber) in subscribers.iter().enumerate() {
            if !self.claim(topic, subscriber) {
                continue;
            }
            report.invoked += 1;
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                subscriber.callback.invoke(&subscriber.scope, args)
            }));
            match outcome {
                Ok(Verdict::Veto) => {
                    report.delivered = false;
                    break;
                }
                Ok(Verdict::Continue) => {}
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(
                        bus = %self.inner.name,
                        topic,
                        position,
                        %message,
                        "Subscriber panicked"
                    );
                    report.failures.push(SubscriberPanic {
                        topic: Topic::from(topic),
                        position,
                        message,
                    });
                }
            }
        }
        if !report.delivered {
            self.record_veto(topic);
        }

        for monitor in monitors.iter().filter(|m| m.is_active()) {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                monitor.callback.invoke(&monitor.scope, topic, args)
            }));
            if let Err(payload) = outcome {
                error!(
                    bus = %self.inner.name,
                    topic,
                    message = %panic_message(payload.as_ref()),
                    "Monitor panicked"
                );
            }
        }

        if topic != EXCEPTION_TOPIC {
            for failure in &report.failures {
                self.publish(
                    EXCEPTION_TOPIC,
                    &[
                        Value::String(format!("Subscriber of '{}' panicked", failure.topic)),
                        Value::String(failure.message.clone()),
                    ],
                );
            }
        }
        report
    }

    /// Publish `[msg, err]` on the `"exception"` topic (`err` as its display
    /// string, or `null`).
    pub fn exception(&self, msg: &str, err: Option<&dyn Error>) -> bool {
        let detail = err.map_or(Value::Null, |e| Value::String(e.to_string()));
        self.publish(EXCEPTION_TOPIC, &[Value::String(msg.to_string()), detail])
    }

    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner.registry.lock().subscriber_count(topic)
    }

    #[must_use]
    pub fn monitor_count(&self) -> usize {
        self.inner.registry.lock().monitor_count()
    }

    /// Topics with at least one subscriber, sorted.
    #[must_use]
    pub fn topics(&self) -> Vec<Topic> {
        self.inner.registry.lock().topics()
    }

    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.inner.events_published.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn events_vetoed(&self) -> u64 {
        self.inner.events_vetoed.load(Ordering::Relaxed)
    }

    /// Whether both handles point at the same bus.
    #[must_use]
    pub fn same_bus(&self, other: &MessageBus) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Decide whether `subscriber` runs in the current dispatch. Once-entries
    /// are claimed and removed here, before their callback runs, so a nested
    /// publish cannot deliver them a second time.
    fn claim(&self, topic: &str, subscriber: &Subscriber) -> bool {
        if !subscriber.once {
            return subscriber.is_active();
        }
        if !subscriber.retire() {
            return false;
        }
        self.inner.registry.lock().remove_by_id(topic, subscriber.id);
        true
    }

    fn record_veto(&self, topic: &str) {
        self.inner.events_vetoed.fetch_add(1, Ordering::Relaxed);
        debug!(bus = %self.inner.name, topic, "Delivery vetoed");
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new("bus")
    }
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("name", &self.inner.name)
            .field("events_published", &self.events_published())
            .finish_non_exhaustive()
    }
}

impl EventPublisher for MessageBus {
    fn publish(&self, topic: &str, args: &[Value]) -> bool {
        MessageBus::publish(self, topic, args)
    }

    fn events_published(&self) -> u64 {
        MessageBus::events_published(self)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
