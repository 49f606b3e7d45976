//! # Subscription Registry
//!
//! Plain data: topic lists in insertion order plus the monitor list. The bus
//! guards it with a mutex and never holds that mutex while a callback runs.

use crate::scope::Scope;
use crate::subscriber::{Callback, Entry, Monitor, MonitorCallback, SameHandle, Subscriber};
use shared_types::Topic;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    topics: HashMap<Topic, Vec<Arc<Subscriber>>>,
    monitors: Vec<Arc<Monitor>>,
    next_id: u64,
}

impl SubscriptionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn add(&mut self, topic: &str, callback: Callback, scope: Scope, once: bool) -> u64 {
        let id = self.next_id();
        let entry = Arc::new(Entry::new(id, callback, scope, once));
        match self.topics.get_mut(topic) {
            Some(list) => list.push(entry),
            None => {
                self.topics.insert(Topic::from(topic), vec![entry]);
            }
        }
        id
    }

    /// Remove the first exact (callback, scope) match.
    pub(crate) fn remove(&mut self, topic: &str, callback: &Callback, scope: &Scope) -> bool {
        let Some(list) = self.topics.get_mut(topic) else {
            return false;
        };
        let removed = remove_first(list, |e| e.matches(callback, scope));
        if list.is_empty() {
            self.topics.remove(topic);
        }
        removed
    }

    pub(crate) fn remove_by_id(&mut self, topic: &str, id: u64) {
        if let Some(list) = self.topics.get_mut(topic) {
            list.retain(|e| e.id != id);
            if list.is_empty() {
                self.topics.remove(topic);
            }
        }
    }

    /// Active subscribers of `topic` in delivery order.
    pub(crate) fn snapshot(&self, topic: &str) -> Vec<Arc<Subscriber>> {
        self.topics
            .get(topic)
            .map(|list| list.iter().filter(|e| e.is_active()).cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn add_monitor(&mut self, callback: MonitorCallback, scope: Scope) -> u64 {
        let id = self.next_id();
        self.monitors.push(Arc::new(Entry::new(id, callback, scope, false)));
        id
    }

    pub(crate) fn remove_monitor(&mut self, callback: &MonitorCallback, scope: &Scope) -> bool {
        remove_first(&mut self.monitors, |e| e.matches(callback, scope))
    }

    pub(crate) fn monitors(&self) -> Vec<Arc<Monitor>> {
        self.monitors.iter().filter(|m| m.is_active()).cloned().collect()
    }

    pub(crate) fn clear_topics(&mut self) {
        for entry in self.topics.values().flatten() {
            entry.retire();
        }
        self.topics.clear();
    }

    pub(crate) fn clear_monitors(&mut self) {
        for monitor in &self.monitors {
            monitor.retire();
        }
        self.monitors.clear();
    }

    pub(crate) fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }

    pub(crate) fn monitor_count(&self) -> usize {
        self.monitors.len()
    }

    pub(crate) fn topics(&self) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self.topics.keys().cloned().collect();
        topics.sort();
        topics
    }
}

/// Remove and retire the first entry matching `pred`, keeping the order of
/// the rest.
fn remove_first<C: SameHandle>(
    list: &mut Vec<Arc<Entry<C>>>,
    pred: impl Fn(&Entry<C>) -> bool,
) -> bool {
    match list.iter().position(|e| pred(e.as_ref())) {
        Some(index) => {
            let entry = list.remove(index);
            entry.retire();
            true
        }
        None => false,
    }
}
