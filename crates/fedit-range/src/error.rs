#![forbid(unsafe_code)]

//! Range operation errors.

use std::fmt;

use fedit_dom::{DomError, NodeId};

/// Failure of a range-level operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// A boundary refers to a node that is gone or detached from the tree
    /// the operation works on.
    Stale { node: NodeId },
    /// A primitive tree operation failed.
    Dom(DomError),
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stale { node } => write!(f, "range boundary {node} does not resolve"),
            Self::Dom(e) => write!(f, "tree operation failed: {e}"),
        }
    }
}

impl std::error::Error for RangeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Dom(e) => Some(e),
            Self::Stale { .. } => None,
        }
    }
}

impl From<DomError> for RangeError {
    fn from(err: DomError) -> Self {
        match err {
            DomError::StaleNode(node) => Self::Stale { node },
            other => Self::Dom(other),
        }
    }
}
