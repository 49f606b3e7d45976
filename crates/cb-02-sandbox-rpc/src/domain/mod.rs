//! Domain layer: sandbox policy, origins, frames, method tables and the
//! pending call store.

pub mod frame;
pub mod methods;
pub mod origin;
pub(crate) mod pending;
pub mod sandbox;

pub use frame::SandboxedFrame;
pub use methods::{MethodFuture, MethodMap};
pub use origin::{Origin, OriginError};
pub use sandbox::{PolicyError, SandboxPolicy, DEFAULT_SANDBOX};
