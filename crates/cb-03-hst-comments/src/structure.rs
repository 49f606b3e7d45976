//! # Page Structure
//!
//! Pairs start and end markers into containers holding items, and collects
//! the standalone markers (menu links, manage-content links, page metadata).
//!
//! ```text
//!            ┌──────────── open container ────────────┐
//! Container ─┤  ContainerItem ─► open item ─► End     ├─► End
//!            └────────────────────────────────────────┘
//! ```
//!
//! Markers that do not fit (an item with no open container, an end with
//! nothing to close) become [`StructureWarning`]s and are otherwise skipped.

use crate::dom::{DomTree, NodeId};
use crate::model::{HstComment, HstType};
use crate::processor::HstCommentProcessor;
use thiserror::Error;
use tracing::{debug, warn};

/// Recoverable problem found while building a [`PageStructure`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureWarning {
    #[error("container item at node {node} is outside any container")]
    ItemOutsideContainer { node: usize },

    #[error("end marker at node {node} has nothing to close")]
    OrphanEnd { node: usize, uuid: Option<String> },

    #[error("container started at node {node} is never closed")]
    UnterminatedContainer { node: usize, uuid: Option<String> },

    #[error("container item started at node {node} is never closed")]
    UnterminatedItem { node: usize, uuid: Option<String> },

    #[error("{kind} marker at node {node} has no uuid")]
    MissingUuid { node: usize, kind: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerItem {
    pub uuid: Option<String>,
    pub start: NodeId,
    pub end: Option<NodeId>,
    pub comment: HstComment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub uuid: Option<String>,
    pub start: NodeId,
    /// `None` when the container was never closed.
    pub end: Option<NodeId>,
    pub comment: HstComment,
    pub items: Vec<ContainerItem>,
}

/// A standalone marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub node: NodeId,
    pub comment: HstComment,
}

/// Page structure recovered from HST comments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageStructure {
    pub containers: Vec<Container>,
    pub menu_links: Vec<Marker>,
    pub content_links: Vec<Marker>,
    pub page_meta: Vec<Marker>,
    pub warnings: Vec<StructureWarning>,
}

impl PageStructure {
    /// Scan the subtree below `root`.
    pub fn scan(tree: &DomTree, root: NodeId) -> Self {
        let mut builder = PageStructureBuilder::new();
        HstCommentProcessor::run(tree, root, |node, comment| builder.push(node, comment));
        builder.finish()
    }

    pub fn container(&self, uuid: &str) -> Option<&Container> {
        self.containers
            .iter()
            .find(|c| c.uuid.as_deref() == Some(uuid))
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.containers.iter().map(|c| c.items.len()).sum()
    }
}

/// Incremental builder fed with comments in document order.
#[derive(Debug, Default)]
pub struct PageStructureBuilder {
    structure: PageStructure,
    open_container: Option<Container>,
    open_item: Option<ContainerItem>,
}

impl PageStructureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: NodeId, comment: &HstComment) {
        match comment.hst_type() {
            None => self.close(node, comment.uuid()),
            Some(HstType::Container) => self.open_container(node, comment),
            Some(HstType::ContainerItem) => self.open_item(node, comment),
            Some(HstType::EditMenuLink) => self.structure.menu_links.push(marker(node, comment)),
            Some(HstType::ManageContentLink) => {
                self.structure.content_links.push(marker(node, comment));
            }
            Some(HstType::PageMetaData) => self.structure.page_meta.push(marker(node, comment)),
            Some(HstType::Other(kind)) => {
                debug!(node = node.index(), kind = %kind, "Ignoring unsupported HST type");
            }
        }
    }

    /// Close what is still open and return the structure.
    pub fn finish(mut self) -> PageStructure {
        self.abandon_item();
        if let Some(container) = self.open_container.take() {
            self.warn(StructureWarning::UnterminatedContainer {
                node: container.start.index(),
                uuid: container.uuid.clone(),
            });
            self.structure.containers.push(container);
        }
        self.structure
    }

    fn open_container(&mut self, node: NodeId, comment: &HstComment) {
        self.abandon_item();
        if let Some(previous) = self.open_container.take() {
            self.warn(StructureWarning::UnterminatedContainer {
                node: previous.start.index(),
                uuid: previous.uuid.clone(),
            });
            self.structure.containers.push(previous);
        }
        self.check_uuid(node, comment);
        self.open_container = Some(Container {
            uuid: comment.uuid().map(str::to_string),
            start: node,
            end: None,
            comment: comment.clone(),
            items: Vec::new(),
        });
    }

    fn open_item(&mut self, node: NodeId, comment: &HstComment) {
        if self.open_container.is_none() {
            self.warn(StructureWarning::ItemOutsideContainer { node: node.index() });
            return;
        }
        self.abandon_item();
        self.check_uuid(node, comment);
        self.open_item = Some(ContainerItem {
            uuid: comment.uuid().map(str::to_string),
            start: node,
            end: None,
            comment: comment.clone(),
        });
    }

    /// An end marker closes the open item or container whose uuid it names,
    /// or the innermost open one when it names none.
    fn close(&mut self, node: NodeId, uuid: Option<&str>) {
        let item_matches = self
            .open_item
            .as_ref()
            .is_some_and(|item| uuid.is_none() || item.uuid.as_deref() == uuid);
        if item_matches {
            if let Some(mut item) = self.open_item.take() {
                item.end = Some(node);
                self.attach(item);
            }
            return;
        }

        let container_matches = self
            .open_container
            .as_ref()
            .is_some_and(|c| uuid.is_none() || c.uuid.as_deref() == uuid);
        if container_matches {
            self.abandon_item();
            if let Some(mut container) = self.open_container.take() {
                container.end = Some(node);
                self.structure.containers.push(container);
            }
            return;
        }

        self.warn(StructureWarning::OrphanEnd {
            node: node.index(),
            uuid: uuid.map(str::to_string),
        });
    }

    /// Keep an unclosed item in its container and flag it.
    fn abandon_item(&mut self) {
        if let Some(item) = self.open_item.take() {
            self.warn(StructureWarning::UnterminatedItem {
                node: item.start.index(),
                uuid: item.uuid.clone(),
            });
            self.attach(item);
        }
    }

    fn attach(&mut self, item: ContainerItem) {
        if let Some(container) = self.open_container.as_mut() {
            container.items.push(item);
        }
    }

    fn check_uuid(&mut self, node: NodeId, comment: &HstComment) {
        if comment.uuid().is_none() {
            let kind = comment
                .hst_type()
                .map(ToString::to_string)
                .unwrap_or_default();
            self.warn(StructureWarning::MissingUuid {
                node: node.index(),
                kind,
            });
        }
    }

    fn warn(&mut self, warning: StructureWarning) {
        warn!(%warning, "Page structure issue");
        self.structure.warnings.push(warning);
    }
}

fn marker(node: NodeId, comment: &HstComment) -> Marker {
    Marker {
        node,
        comment: comment.clone(),
    }
}
