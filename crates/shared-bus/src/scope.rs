//! # Subscriber Scope
//!
//! The receiver a callback is bound to when it is invoked. Two scopes are
//! equal only if they are the same handle (pointer identity), which is what
//! makes `unsubscribe(topic, callback, scope)` precise.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Receiver used when a subscriber is registered without a scope.
struct Detached;

static DETACHED: OnceLock<Scope> = OnceLock::new();

/// Cloneable receiver handle passed to every callback invocation.
#[derive(Clone)]
pub struct Scope(Arc<dyn Any + Send + Sync>);

impl Scope {
    /// Wrap a value as a fresh scope. Every call yields a distinct identity.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Use an existing shared value as the scope without copying it.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(value)
    }

    /// The process-wide no-op receiver used when no scope is supplied.
    ///
    /// It carries no state and downcasts to nothing a caller can name.
    pub fn detached() -> Self {
        DETACHED
            .get_or_init(|| Self(Arc::new(Detached)))
            .clone()
    }

    /// Resolve an optional scope to a concrete one.
    pub fn or_detached(scope: Option<Scope>) -> Self {
        scope.unwrap_or_else(Self::detached)
    }

    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.ptr_eq(&Self::detached())
    }

    /// Borrow the receiver as `T` if that is what it holds.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Identity comparison.
    #[must_use]
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::detached()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_detached() {
            f.write_str("Scope(detached)")
        } else {
            write!(f, "Scope({:p})", Arc::as_ptr(&self.0))
        }
    }
}
