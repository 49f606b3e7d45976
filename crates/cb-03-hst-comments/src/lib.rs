//! # HST Comments
//!
//! Reads the page-structure markers that the delivery tier writes into the
//! previewed document as HTML comments.
//!
//! ```text
//! DomTree ──► HstCommentProcessor ──► HstComment ──► PageStructureBuilder ──► PageStructure
//!             (document order,                       (containers, items,
//!              malformed JSON skipped)                links, page metadata)
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod dom;
pub mod model;
pub mod processor;
pub mod structure;

pub use dom::{Descendants, DomTree, NodeId, NodeKind};
pub use model::{HstComment, HstMarker, HstType, END_KEY, TYPE_KEY};
pub use processor::{parse_comment, HstCommentProcessor, ParsedComment, ProcessStats};
pub use structure::{
    Container, ContainerItem, Marker, PageStructure, PageStructureBuilder, StructureWarning,
};
