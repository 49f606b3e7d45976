//! Adapters layer: concrete channel and field-access implementations.

pub mod document;
pub mod in_memory;

pub use document::JsonDocument;
pub use in_memory::{ChannelEnd, InMemoryChannel};
