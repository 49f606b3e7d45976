//! # Frame Bridge Subsystem
//!
//! Same-process transport between the host page and an embedded frame that
//! shares its runtime (preview frames, dialogs).
//!
//! ## Handshake
//!
//! ```text
//! host                      FrameRegistry                    frame
//!  │ register("preview") ─────→ │                              │
//!  │ ←──────── FrameHandle ──── │                              │
//!  │                            │ ←──── lookup("preview") ──── │
//!  │                            │ ──────── FrameHandle ──────→ │
//!  │ host().publish ─── host_to_frame ───→ frame().subscribe    │
//!  │ host().subscribe ←── frame_to_host ─── frame().publish     │
//! ```
//!
//! Arguments travel as shared `serde_json::Value` slices; nothing is
//! serialized. Removing a frame clears both buses, so endpoints held
//! elsewhere keep working against an empty bus.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod bridge;
pub mod registry;

pub use bridge::{FrameBridge, FrameEndpoint, FrameHandle, HostEndpoint};
pub use registry::FrameRegistry;
