//! # Frame Registry
//!
//! Explicit registration of same-process frames. A frame obtains its bridge
//! through `register`/`lookup` on the session's registry, never through a
//! lookup on a shared global.

use crate::bridge::{FrameBridge, FrameHandle};
use parking_lot::RwLock;
use shared_types::{FrameId, LookupError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Frames registered in one session, keyed by element id.
#[derive(Debug, Default)]
pub struct FrameRegistry {
    frames: RwLock<HashMap<FrameId, Arc<FrameBridge>>>,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the bridge for `id` and hand back its handle.
    ///
    /// # Errors
    ///
    /// `FrameAlreadyRegistered` if `id` is taken.
    pub fn register(&self, id: impl Into<FrameId>) -> Result<FrameHandle, LookupError> {
        let id = id.into();
        let mut frames = self.frames.write();
        if frames.contains_key(&id) {
            return Err(LookupError::FrameAlreadyRegistered(id));
        }
        let bridge = Arc::new(FrameBridge::new(id.clone()));
        frames.insert(id.clone(), bridge.clone());
        debug!(frame = %id, "Frame registered");
        Ok(FrameHandle::new(bridge))
    }

    /// Handle of an already registered frame.
    ///
    /// # Errors
    ///
    /// `FrameNotFound` if nothing is registered under `id`.
    pub fn lookup(&self, id: &FrameId) -> Result<FrameHandle, LookupError> {
        self.frames
            .read()
            .get(id)
            .cloned()
            .map(FrameHandle::new)
            .ok_or_else(|| LookupError::FrameNotFound(id.clone()))
    }

    /// Unregister `id` and destroy its bridge.
    pub fn remove(&self, id: &FrameId) -> Result<(), LookupError> {
        let bridge = self
            .frames
            .write()
            .remove(id)
            .ok_or_else(|| LookupError::FrameNotFound(id.clone()))?;
        bridge.destroy();
        Ok(())
    }

    /// Destroy every registered bridge.
    pub fn destroy_all(&self) {
        let drained: Vec<Arc<FrameBridge>> =
            self.frames.write().drain().map(|(_, bridge)| bridge).collect();
        let count = drained.len();
        for bridge in drained {
            bridge.destroy();
        }
        if count > 0 {
            info!(frames = count, "All frame bridges destroyed");
        }
    }

    #[must_use]
    pub fn contains(&self, id: &FrameId) -> bool {
        self.frames.read().contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.read().is_empty()
    }

    /// Registered ids, sorted.
    #[must_use]
    pub fn frame_ids(&self) -> Vec<FrameId> {
        let mut ids: Vec<FrameId> = self.frames.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
