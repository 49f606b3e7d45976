//! # Draft Scheduler
//!
//! Debounce-with-replace: every `schedule` for a key aborts the timer that
//! key already has and starts a new one. Only the value attached to the
//! timer that survives a full delay is saved.
//!
//! ```text
//! schedule(k, v1) ──┐
//!                   ├─ abort ─┐
//! schedule(k, v2) ──┘         ├─ abort ─┐
//! schedule(k, v3) ────────────┘         │
//!                                       └── delay ──► save(k, v3)
//! ```
//!
//! A fired timer removes its entry before saving, so a `schedule` that races
//! with an in-flight save starts a fresh timer instead of aborting the save.

use crate::saver::{DraftSaver, SaveError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Identifies one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "draft-timer-{}", self.0)
    }
}

struct PendingDraft<V> {
    id: TimerId,
    value: V,
    handle: JoinHandle<()>,
}

struct Inner<S: DraftSaver> {
    saver: S,
    delay: Duration,
    pending: Mutex<HashMap<S::Key, PendingDraft<S::Value>>>,
    next_id: AtomicU64,
    saves: AtomicU64,
    failures: AtomicU64,
    shut_down: AtomicBool,
}

impl<S: DraftSaver> Inner<S> {
    /// Remove the entry for `key` if it still belongs to timer `id`.
    fn take(&self, key: &S::Key, id: TimerId) -> Option<S::Value> {
        let mut pending = self.pending.lock();
        match pending.get(key) {
            Some(draft) if draft.id == id => pending.remove(key).map(|draft| draft.value),
            _ => None,
        }
    }

    async fn fire(&self, key: S::Key, id: TimerId) {
        let Some(value) = self.take(&key, id) else {
            debug!(?key, timer = %id, "Timer superseded");
            return;
        };
        // failures are already logged
        let _ = self.save(&key, value).await;
    }

    async fn save(&self, key: &S::Key, value: S::Value) -> Result<(), SaveError> {
        match self.saver.save(key, value).await {
            Ok(()) => {
                self.saves.fetch_add(1, Ordering::Relaxed);
                debug!(?key, "Draft saved");
                Ok(())
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(?key, error = %err, "Draft save failed");
                Err(err)
            }
        }
    }

    fn abort_all(&self) -> usize {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        for (_, draft) in &drained {
            draft.handle.abort();
        }
        drained.len()
    }
}

/// Per-key debounced saver.
///
/// `schedule` spawns onto the ambient Tokio runtime and must be called from
/// within one. Dropping the scheduler aborts every pending timer.
pub struct DraftScheduler<S: DraftSaver> {
    inner: Arc<Inner<S>>,
}

impl<S: DraftSaver> DraftScheduler<S> {
    pub fn new(saver: S, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                saver,
                delay,
                pending: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                saves: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    pub fn saver(&self) -> &S {
        &self.inner.saver
    }

    /// Save `value` for `key` after the delay, replacing whatever was
    /// pending for `key`.
    ///
    /// # Errors
    ///
    /// `ShutDown` once [`shutdown`](Self::shutdown) has run.
    pub fn schedule(&self, key: S::Key, value: S::Value) -> Result<TimerId, SaveError> {
        // checked under the lock so shutdown's drain cannot miss an entry
        let mut pending = self.inner.pending.lock();
        if self.inner.shut_down.load(Ordering::Acquire) {
            debug!(?key, "Draft refused, scheduler is shut down");
            return Err(SaveError::ShutDown);
        }

        let id = TimerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let weak: Weak<Inner<S>> = Arc::downgrade(&self.inner);
        let delay = self.inner.delay;
        let task_key = key.clone();

        // lock still held, so the timer cannot look up its entry before the insert
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.fire(task_key, id).await;
            }
        });

        match pending.insert(key.clone(), PendingDraft { id, value, handle }) {
            Some(previous) => {
                previous.handle.abort();
                debug!(?key, timer = %id, replaced = %previous.id, "Draft rescheduled");
            }
            None => debug!(?key, timer = %id, delay_ms = delay.as_millis(), "Draft scheduled"),
        }
        Ok(id)
    }

    /// Drop the pending draft for `key`. Returns whether one existed.
    pub fn cancel(&self, key: &S::Key) -> bool {
        let removed = self.inner.pending.lock().remove(key);
        match removed {
            Some(draft) => {
                draft.handle.abort();
                debug!(?key, timer = %draft.id, "Draft cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel by timer id. Returns false when the timer already fired or was
    /// replaced.
    pub fn cancel_timer(&self, id: TimerId) -> bool {
        let mut pending = self.inner.pending.lock();
        let key = pending
            .iter()
            .find(|(_, draft)| draft.id == id)
            .map(|(key, _)| key.clone());
        let Some(draft) = key.and_then(|key| pending.remove(&key)) else {
            return false;
        };
        draft.handle.abort();
        debug!(timer = %id, "Draft timer cancelled");
        true
    }

    /// Save the pending draft for `key` now.
    ///
    /// Returns `Ok(false)` when nothing was pending.
    ///
    /// # Errors
    ///
    /// The saver's error. The draft is not rescheduled.
    pub async fn flush(&self, key: &S::Key) -> Result<bool, SaveError> {
        let removed = self.inner.pending.lock().remove(key);
        let Some(draft) = removed else {
            return Ok(false);
        };
        draft.handle.abort();
        self.inner.save(key, draft.value).await?;
        Ok(true)
    }

    /// Save every pending draft now. Returns how many saves succeeded.
    pub async fn flush_all(&self) -> usize {
        let drained: Vec<_> = self.inner.pending.lock().drain().collect();
        let mut saved = 0;
        for (key, draft) in drained {
            draft.handle.abort();
            if self.inner.save(&key, draft.value).await.is_ok() {
                saved += 1;
            }
        }
        saved
    }

    #[must_use]
    pub fn is_pending(&self, key: &S::Key) -> bool {
        self.inner.pending.lock().contains_key(key)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Cancel every pending timer and refuse later `schedule` calls.
    /// Returns how many timers were cancelled.
    pub fn shutdown(&self) -> usize {
        self.inner.shut_down.store(true, Ordering::Release);
        let cancelled = self.inner.abort_all();
        if cancelled > 0 {
            info!(cancelled, "Draft scheduler shut down");
        }
        cancelled
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }

    /// Successful saves so far.
    #[must_use]
    pub fn saves(&self) -> u64 {
        self.inner.saves.load(Ordering::Relaxed)
    }

    /// Failed saves so far.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.inner.failures.load(Ordering::Relaxed)
    }
}

impl<S: DraftSaver> Drop for DraftScheduler<S> {
    fn drop(&mut self) {
        self.inner.abort_all();
    }
}

impl<S: DraftSaver> fmt::Debug for DraftScheduler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DraftScheduler")
            .field("delay", &self.inner.delay)
            .field("pending", &self.pending_count())
            .field("saves", &self.saves())
            .finish()
    }
}
