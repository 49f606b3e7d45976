//! Port through which scheduled drafts are persisted.

use async_trait::async_trait;
use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    /// The backend refused the draft.
    #[error("draft rejected: {0}")]
    Rejected(String),

    /// The backend could not be reached.
    #[error("draft backend unavailable: {0}")]
    Unavailable(String),

    /// The scheduler was shut down and accepts no more drafts.
    #[error("draft scheduler has been shut down")]
    ShutDown,
}

/// Persists one draft value per key.
#[async_trait]
pub trait DraftSaver: Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;
    type Value: Send + 'static;

    async fn save(&self, key: &Self::Key, value: Self::Value) -> Result<(), SaveError>;
}
