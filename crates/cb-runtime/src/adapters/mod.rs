//! # Runtime Adapters
//!
//! Port implementations that connect the library crates to session buses.

pub mod draft_saver;
pub mod metered;

pub use draft_saver::{BusDraftSaver, DRAFT_SAVE_TOPIC};
pub use metered::MeteredPublisher;
