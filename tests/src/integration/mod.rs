//! Cross-crate integration flows.

pub mod bus_properties;
pub mod draft_flow;
pub mod extension_flow;
pub mod frame_flow;
