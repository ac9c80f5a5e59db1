#![forbid(unsafe_code)]

//! Node classification.
//!
//! A node's [`Category`] depends on its kind, its tag's inline bit and the
//! categories of all of its children. Results are memoized on the arena slot
//! and tagged with the document version, so any mutation anywhere in the tree
//! invalidates every memo at once.

use crate::document::Document;
use crate::node::{NodeData, NodeId};
use crate::tag::TagFlags;

/// Layout category of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Stale handle.
    Unknown,
    /// Flows within a line: text and inline elements with inline content.
    Inline,
    /// Laid out on its own line and holds only inline content.
    Block,
    /// Holds at least one non-inline child.
    Container,
}

impl Document {
    /// Classify `id`, reusing the memo when the tree has not changed since.
    #[must_use]
    pub fn category(&self, id: NodeId) -> Category {
        let Some(record) = self.record(id) else {
            return Category::Unknown;
        };
        let flags = match &record.data {
            NodeData::Text(_) => return Category::Inline,
            NodeData::Element(el) => el.flags,
            NodeData::Fragment => TagFlags::empty(),
        };
        let version = self.version();
        if let Some((seen, category)) = record.category.get()
            && seen == version
        {
            return category;
        }
        // Malformed markup can nest blocks inside inline tags; such a node is
        // a container whatever its tag says.
        let category = if !record.children.iter().all(|&c| self.is_inline(c)) {
            Category::Container
        } else if flags.contains(TagFlags::INLINE) {
            Category::Inline
        } else {
            Category::Block
        };
        tracing::trace!(node = ?id, ?category, version, "classified node");
        record.category.set(Some((version, category)));
        category
    }

    #[must_use]
    pub fn is_inline(&self, id: NodeId) -> bool {
        self.category(id) == Category::Inline
    }

    #[must_use]
    pub fn is_block(&self, id: NodeId) -> bool {
        self.category(id) == Category::Block
    }

    #[must_use]
    pub fn is_container(&self, id: NodeId) -> bool {
        self.category(id) == Category::Container
    }

    /// Atomic element: line break, rule, embedded media or form control.
    #[must_use]
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.tag_flags(id).contains(TagFlags::LEAF)
    }
}
