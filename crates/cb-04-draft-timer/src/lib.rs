//! # Draft Timer
//!
//! Debounced draft persistence for documents being edited in the channel
//! manager. Editors schedule a save on every change; only the last value
//! per key reaches the [`DraftSaver`] once the key has been quiet for the
//! configured delay.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod saver;
pub mod scheduler;

pub use saver::{DraftSaver, SaveError};
pub use scheduler::{DraftScheduler, TimerId};
