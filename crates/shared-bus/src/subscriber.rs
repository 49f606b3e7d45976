//! # Subscribers
//!
//! Callback handles and the registry entries that hold them.

use crate::scope::Scope;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What a subscriber tells the dispatcher after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep delivering to the next subscriber.
    Continue,
    /// Stop delivery on this topic. Monitors still run.
    Veto,
}

impl From<()> for Verdict {
    fn from(_: ()) -> Self {
        Verdict::Continue
    }
}

/// Only a strict `false` vetoes.
impl From<bool> for Verdict {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            Verdict::Continue
        } else {
            Verdict::Veto
        }
    }
}

type TopicFn = dyn Fn(&Scope, &[Value]) -> Verdict + Send + Sync;
type MonitorFn = dyn Fn(&Scope, &str, &[Value]) + Send + Sync;

/// Shared handle around a topic callback.
///
/// Identity is handle identity: clones of one `Callback` are the same
/// subscriber, two `Callback::new` calls over equal closures are not.
#[derive(Clone)]
pub struct Callback(Arc<TopicFn>);

impl Callback {
    /// Wrap a closure returning `()`, `bool` or `Verdict`.
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&Scope, &[Value]) -> R + Send + Sync + 'static,
        R: Into<Verdict>,
    {
        Self(Arc::new(move |scope: &Scope, args: &[Value]| {
            f(scope, args).into()
        }))
    }

    pub fn invoke(&self, scope: &Scope, args: &[Value]) -> Verdict {
        (self.0)(scope, args)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Callback) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Arc::as_ptr(&self.0))
    }
}

/// Shared handle around a monitor callback. Monitors see the topic name and
/// cannot veto.
#[derive(Clone)]
pub struct MonitorCallback(Arc<MonitorFn>);

impl MonitorCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Scope, &str, &[Value]) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn invoke(&self, scope: &Scope, topic: &str, args: &[Value]) {
        (self.0)(scope, topic, args)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &MonitorCallback) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for MonitorCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MonitorCallback({:p})", Arc::as_ptr(&self.0))
    }
}

/// Handle identity, shared by both callback kinds.
pub(crate) trait SameHandle {
    fn same_handle(&self, other: &Self) -> bool;
}

impl SameHandle for Callback {
    fn same_handle(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl SameHandle for MonitorCallback {
    fn same_handle(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// One registration in the registry.
///
/// `active` flips to false exactly once: on removal, or when a once-entry is
/// claimed for delivery. Dispatch snapshots skip inactive entries.
pub(crate) struct Entry<C> {
    pub(crate) id: u64,
    pub(crate) callback: C,
    pub(crate) scope: Scope,
    pub(crate) once: bool,
    active: AtomicBool,
}

pub(crate) type Subscriber = Entry<Callback>;
pub(crate) type Monitor = Entry<MonitorCallback>;

impl<C: SameHandle> Entry<C> {
    pub(crate) fn new(id: u64, callback: C, scope: Scope, once: bool) -> Self {
        Self {
            id,
            callback,
            scope,
            once,
            active: AtomicBool::new(true),
        }
    }

    pub(crate) fn matches(&self, callback: &C, scope: &Scope) -> bool {
        self.callback.same_handle(callback) && self.scope.ptr_eq(scope)
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Deactivate; returns whether this call did it.
    pub(crate) fn retire(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }
}
