//! # HST Comment Processor
//!
//! Walks a subtree in document order and reports every comment node that
//! carries an HST payload.
//!
//! ```text
//! comment text ──trim──► "{...}"? ──no──► ignored
//!                           │yes
//!                           ▼
//!                     serde_json::from_str
//!                     │            │
//!                 malformed      object
//!                     │            │
//!                 warn! skip   HST-Type / HST-End? ──no──► ignored
//!                                  │yes
//!                                  ▼
//!                          callback(node, &HstComment)
//! ```

use crate::dom::{DomTree, NodeId};
use crate::model::{HstComment, END_KEY, TYPE_KEY};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Counters from one [`HstCommentProcessor::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessStats {
    /// Comment nodes visited.
    pub comments_seen: usize,
    /// Comments passed to the callback.
    pub hst_comments: usize,
    /// Comments that looked like HST JSON but failed to parse.
    pub malformed: usize,
}

/// Outcome of parsing a single comment body.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedComment {
    Hst(HstComment),
    Malformed(String),
    Unrecognised,
}

/// Parse one comment body.
pub fn parse_comment(text: &str) -> ParsedComment {
    let trimmed = text.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return ParsedComment::Unrecognised;
    }
    if !trimmed.contains(TYPE_KEY) && !trimmed.contains(END_KEY) {
        return ParsedComment::Unrecognised;
    }
    match serde_json::from_str::<Map<String, Value>>(trimmed) {
        Ok(data) => HstComment::from_object(data)
            .map_or(ParsedComment::Unrecognised, ParsedComment::Hst),
        Err(err) => ParsedComment::Malformed(err.to_string()),
    }
}

#[derive(Debug, Default)]
pub struct HstCommentProcessor;

impl HstCommentProcessor {
    /// Visit the comments below `root` and call `callback` for every HST
    /// comment, in document order.
    pub fn run<F>(tree: &DomTree, root: NodeId, mut callback: F) -> ProcessStats
    where
        F: FnMut(NodeId, &HstComment),
    {
        let mut stats = ProcessStats::default();
        for node in tree.descendants(root) {
            let Some(text) = tree.comment_text(node) else {
                continue;
            };
            stats.comments_seen += 1;
            match parse_comment(text) {
                ParsedComment::Hst(comment) => {
                    stats.hst_comments += 1;
                    callback(node, &comment);
                }
                ParsedComment::Malformed(reason) => {
                    stats.malformed += 1;
                    warn!(node = node.index(), error = %reason, "Skipping malformed HST comment");
                }
                ParsedComment::Unrecognised => {}
            }
        }
        debug!(
            comments = stats.comments_seen,
            hst = stats.hst_comments,
            malformed = stats.malformed,
            "Processed HST comments"
        );
        stats
    }
}
