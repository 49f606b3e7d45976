//! Ports layer for the sandboxed transport.
//!
//! - `Messenger`: the postMessage-style channel a connection runs over
//! - `FieldAccess`: document field access offered to extensions

pub mod fields;
pub mod messenger;

pub use fields::FieldAccess;
pub use messenger::Messenger;
