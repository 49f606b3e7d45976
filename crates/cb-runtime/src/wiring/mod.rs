//! # Bus Wiring
//!
//! Observers every session bus gets when the session opens:
//!
//! ```text
//!             ┌─────────────── MessageBus ───────────────┐
//! publish ──► │ topic subscribers ... │ monitors          │
//!             │ "exception" ─► funnel │ telemetry monitor │
//!             └───────┬───────────────┴─────────┬─────────┘
//!                     ▼                         ▼
//!           error! + BUS_EXCEPTIONS    trace! + BUS_EVENTS{bus, family}
//! ```

pub mod monitors;

pub use monitors::{exception_funnel, install, telemetry_monitor};
