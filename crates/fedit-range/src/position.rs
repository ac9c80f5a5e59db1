#![forbid(unsafe_code)]

//! Boundary points and ranges.
//!
//! A [`Position`] is a `(container, offset)` pair: a character index inside a
//! text node, a child index anywhere else. A [`Range`] is a plain value;
//! operations that move content across its boundaries hand back an updated
//! range rather than patching it in place.
//!
//! # Ordering
//!
//! Points compare in tree order. A point inside an element sorts before
//! every point inside its `offset`-th child and after every point inside the
//! children before it:
//!
//! ```text
//!   (p,0) < ("ab",0) < ("ab",2) < (p,1) < ("cd",0) < (p,2)
//!   p = [ "ab", "cd" ]
//! ```

use std::cmp::Ordering;

use fedit_dom::{DomError, Document, NodeId};

use crate::error::RangeError;

/// A boundary point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    #[must_use]
    pub const fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    /// Point just before `node` in its parent.
    #[must_use]
    pub fn before(doc: &Document, node: NodeId) -> Option<Self> {
        Some(Self::new(doc.parent(node)?, doc.index_of(node)?))
    }

    /// Point just after `node` in its parent.
    #[must_use]
    pub fn after(doc: &Document, node: NodeId) -> Option<Self> {
        Some(Self::new(doc.parent(node)?, doc.index_of(node)? + 1))
    }

    /// Whether the container is alive and the offset within its length.
    #[must_use]
    pub fn is_valid(&self, doc: &Document) -> bool {
        doc.is_alive(self.node) && self.offset <= doc.length(self.node)
    }
}

/// Root-first chain of `node`'s inclusive ancestors.
fn path_from_top(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let mut path: Vec<NodeId> = doc.ancestors(node).collect();
    path.reverse();
    path
}

/// Order two boundary points in tree order.
///
/// Points in disconnected trees are ordered by their container handles so the
/// result is at least consistent.
#[must_use]
pub fn compare_points(doc: &Document, a: Position, b: Position) -> Ordering {
    if a.node == b.node {
        return a.offset.cmp(&b.offset);
    }
    let pa = path_from_top(doc, a.node);
    let pb = path_from_top(doc, b.node);
    let shared = pa.iter().zip(&pb).take_while(|(x, y)| x == y).count();
    let index = |n: NodeId| doc.index_of(n).unwrap_or(0);
    if shared == 0 {
        a.node.cmp(&b.node)
    } else if shared == pa.len() {
        // a's container is an ancestor of b's.
        if index(pb[shared]) < a.offset {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    } else if shared == pb.len() {
        if index(pa[shared]) < b.offset {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    } else {
        index(pa[shared]).cmp(&index(pb[shared]))
    }
}

/// A selection between two boundary points, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Range with the given endpoints, taken as already ordered.
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Empty range at `at`.
    #[must_use]
    pub const fn collapsed(at: Position) -> Self {
        Self { start: at, end: at }
    }

    /// Range from `start` to `end`, collapsing onto `end` when the two are
    /// out of order.
    #[must_use]
    pub fn from_points(doc: &Document, start: Position, end: Position) -> Self {
        if compare_points(doc, end, start) == Ordering::Less {
            Self::collapsed(end)
        } else {
            Self { start, end }
        }
    }

    /// Move the start boundary. A start past the current end collapses the
    /// range onto it.
    #[must_use]
    pub fn set_start(self, doc: &Document, start: Position) -> Self {
        if compare_points(doc, start, self.end) == Ordering::Greater {
            Self::collapsed(start)
        } else {
            Self { start, ..self }
        }
    }

    /// Move the end boundary. An end before the current start collapses the
    /// range onto it.
    #[must_use]
    pub fn set_end(self, doc: &Document, end: Position) -> Self {
        if compare_points(doc, end, self.start) == Ordering::Less {
            Self::collapsed(end)
        } else {
            Self { end, ..self }
        }
    }

    /// Range around `node` in its parent, or `None` for a parentless node.
    #[must_use]
    pub fn select_node(doc: &Document, node: NodeId) -> Option<Self> {
        Some(Self {
            start: Position::before(doc, node)?,
            end: Position::after(doc, node)?,
        })
    }

    /// Range over everything inside `node`.
    #[must_use]
    pub fn select_node_contents(doc: &Document, node: NodeId) -> Self {
        Self {
            start: Position::new(node, 0),
            end: Position::new(node, doc.length(node)),
        }
    }

    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Empty range at the start (or end) boundary.
    #[must_use]
    pub fn collapse(self, to_start: bool) -> Self {
        if to_start {
            Self::collapsed(self.start)
        } else {
            Self::collapsed(self.end)
        }
    }

    /// Deepest node containing both boundary containers.
    #[must_use]
    pub fn common_ancestor(&self, doc: &Document) -> Option<NodeId> {
        doc.common_ancestor(self.start.node, self.end.node)
    }

    /// Whether `node` lies inside this range.
    ///
    /// With `partial`, any overlap counts; otherwise the node must sit wholly
    /// between the boundaries. A parentless node is judged by its contents.
    #[must_use]
    pub fn contains(&self, doc: &Document, node: NodeId, partial: bool) -> bool {
        let around = Self::select_node(doc, node)
            .unwrap_or_else(|| Self::select_node_contents(doc, node));
        if partial {
            let ends_before_start =
                compare_points(doc, self.start, around.end) != Ordering::Less;
            let starts_after_end =
                compare_points(doc, self.end, around.start) != Ordering::Greater;
            !ends_before_start && !starts_after_end
        } else {
            compare_points(doc, self.start, around.start) != Ordering::Greater
                && compare_points(doc, self.end, around.end) != Ordering::Less
        }
    }

    /// Check that both boundaries resolve inside the current tree.
    pub fn validate(&self, doc: &Document) -> Result<(), RangeError> {
        for point in [self.start, self.end] {
            if !doc.is_alive(point.node) {
                return Err(RangeError::Stale { node: point.node });
            }
            let length = doc.length(point.node);
            if point.offset > length {
                return Err(RangeError::Dom(DomError::OffsetOutOfBounds {
                    node: point.node,
                    offset: point.offset,
                    length,
                }));
            }
        }
        Ok(())
    }

    /// Whether both boundaries are valid and inside `root`.
    #[must_use]
    pub fn is_within(&self, doc: &Document, root: NodeId) -> bool {
        self.validate(doc).is_ok()
            && doc.contains(root, self.start.node)
            && doc.contains(root, self.end.node)
    }
}
