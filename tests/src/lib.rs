//! # Channel Bridge Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/     # Cross-crate flows
//! │   ├── bus_properties.rs    ordering, veto, once, unsubscribe on session buses
//! │   ├── frame_flow.rs        same-process frame registry and HST scan
//! │   ├── extension_flow.rs    sandboxed extension handshake and methods
//! │   └── draft_flow.rs        debounced drafts reaching the CMS bus
//! └── benches/             # Criterion benchmarks
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cb-tests
//! cargo test -p cb-tests integration::extension_flow
//! cargo bench -p cb-tests
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod integration;
