//! Local methods exposed to the other side of a connection.

use futures::future::BoxFuture;
use serde_json::Value;
use shared_types::RemoteError;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub type MethodFuture = BoxFuture<'static, Result<Value, RemoteError>>;

type Handler = dyn Fn(Vec<Value>) -> MethodFuture + Send + Sync;

/// Name → async handler table.
///
/// Only the names travel during the handshake; the other side can call
/// nothing that is not in this map.
#[derive(Clone, Default)]
pub struct MethodMap {
    methods: HashMap<String, Arc<Handler>>,
}

impl MethodMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace `name`.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RemoteError>> + Send + 'static,
    {
        self.methods.insert(
            name.into(),
            Arc::new(move |args: Vec<Value>| -> MethodFuture { Box::pin(handler(args)) }),
        );
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RemoteError>> + Send + 'static,
    {
        self.register(name, handler);
        self
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.methods.remove(name).is_some()
    }

    /// Method names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Run `name` with `args`. An unknown name rejects.
    pub fn invoke(&self, name: &str, args: Vec<Value>) -> MethodFuture {
        match self.methods.get(name) {
            Some(handler) => handler(args),
            None => {
                let message = format!("Method '{name}' is not exposed");
                Box::pin(async move { Err(RemoteError::new(message)) })
            }
        }
    }
}

impl fmt::Debug for MethodMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodMap").field("names", &self.names()).finish()
    }
}
