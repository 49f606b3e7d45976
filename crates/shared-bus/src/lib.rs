//! # Shared Bus - Topic Message Bus for Host and Frame Documents
//!
//! Ordered, interruptible publish/subscribe used between a Channel Manager
//! host page and the documents it embeds.
//!
//! ## Delivery Rules
//!
//! - Subscribers of a topic run in subscription order.
//! - A subscriber returning `false` (a [`Verdict::Veto`]) stops delivery on
//!   that topic; `publish` then returns `false`.
//! - Monitors observe every topic and always run after the subscribers, with
//!   the original arguments, even after a veto.
//! - Publishing to a topic nobody listens to is a successful no-op.
//!
//! ## Ownership
//!
//! ```text
//! ┌──────────────┐  host_to_frame   ┌──────────────┐
//! │   Host page  │ ───────────────→ │  Frame doc   │
//! │              │ ←─────────────── │              │
//! └──────────────┘  frame_to_host   └──────────────┘
//! ```
//!
//! Every side owns its own [`MessageBus`]; nothing here is a process global.
//! Crossing a document boundary goes through a transport adapter.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod publisher;
mod registry;
pub mod scope;
pub mod subscriber;

// Re-export main types
pub use publisher::{DispatchReport, EventPublisher, MessageBus, SubscriberPanic};
pub use scope::Scope;
pub use shared_types::{Topic, EXCEPTION_TOPIC};
pub use subscriber::{Callback, MonitorCallback, Verdict};
