#![forbid(unsafe_code)]

//! Tree operation errors.

use std::fmt;

use crate::node::NodeId;
use crate::tag::Tag;

/// Failure of a primitive tree operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The handle refers to a node that no longer exists.
    StaleNode(NodeId),
    /// A text node was asked to hold children.
    NotAContainer(NodeId),
    /// An atomic leaf element was asked to hold children.
    LeafCannotHaveChildren { parent: NodeId, tag: Tag },
    /// The insertion would make a node its own ancestor.
    HierarchyCycle { parent: NodeId, child: NodeId },
    /// The reference node is not a child of the given parent.
    NotAChild { parent: NodeId, node: NodeId },
    /// A character offset past the end of a text node.
    OffsetOutOfBounds {
        node: NodeId,
        offset: usize,
        length: usize,
    },
    /// A text-only operation was applied to a non-text node.
    NotText(NodeId),
    /// An element-only operation was applied to a non-element node.
    NotElement(NodeId),
}

impl DomError {
    /// Whether this error is a rejected cursor filler (appending to a node
    /// that cannot hold children).
    #[must_use]
    pub fn is_fixup_failure(&self) -> bool {
        matches!(
            self,
            Self::LeafCannotHaveChildren { .. } | Self::NotAContainer(_)
        )
    }
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleNode(id) => write!(f, "stale node handle {id}"),
            Self::NotAContainer(id) => write!(f, "text node {id} cannot hold children"),
            Self::LeafCannotHaveChildren { parent, tag } => {
                write!(f, "leaf <{tag}> {parent} cannot hold children")
            }
            Self::HierarchyCycle { parent, child } => {
                write!(f, "inserting {child} into {parent} would create a cycle")
            }
            Self::NotAChild { parent, node } => write!(f, "{node} is not a child of {parent}"),
            Self::OffsetOutOfBounds {
                node,
                offset,
                length,
            } => write!(f, "offset {offset} out of bounds for {node} (length {length})"),
            Self::NotText(id) => write!(f, "{id} is not a text node"),
            Self::NotElement(id) => write!(f, "{id} is not an element"),
        }
    }
}

impl std::error::Error for DomError {}
