//! # Session Registry
//!
//! Replaces process-wide bus globals: every session context is reached
//! through its [`SessionId`].
//!
//! ```text
//! SessionRegistry
//! ├── 3f2a… ──► SessionContext { buses, frames, extensions, drafts }
//! └── 9c41… ──► SessionContext { ... }
//! ```

use crate::container::{ConfigError, RuntimeConfig, SessionContext};
use parking_lot::RwLock;
use shared_types::{LookupError, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub struct SessionRegistry {
    config: RuntimeConfig,
    sessions: RwLock<HashMap<SessionId, Arc<SessionContext>>>,
}

impl SessionRegistry {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Open a session under a fresh id.
    ///
    /// # Errors
    ///
    /// See [`SessionContext::new`].
    pub fn open(&self) -> Result<Arc<SessionContext>, ConfigError> {
        let context = Arc::new(SessionContext::new(SessionId::new(), self.config.clone())?);
        self.sessions.write().insert(context.id(), context.clone());
        info!(session = %context.id(), "Session opened");
        Ok(context)
    }

    /// # Errors
    ///
    /// `SessionNotFound` for unknown or closed sessions.
    pub fn get(&self, id: &SessionId) -> Result<Arc<SessionContext>, LookupError> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or(LookupError::SessionNotFound(*id))
    }

    /// Close a session and forget it.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` for unknown or already closed sessions.
    pub fn close(&self, id: &SessionId) -> Result<(), LookupError> {
        let context = self
            .sessions
            .write()
            .remove(id)
            .ok_or(LookupError::SessionNotFound(*id))?;
        context.close();
        Ok(())
    }

    /// Close every session. Returns how many were open.
    pub fn close_all(&self) -> usize {
        let drained: Vec<Arc<SessionContext>> =
            self.sessions.write().drain().map(|(_, context)| context).collect();
        for context in &drained {
            context.close();
        }
        drained.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Open session ids, sorted.
    #[must_use]
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.read().keys().copied().collect();
        ids.sort();
        ids
    }
}
