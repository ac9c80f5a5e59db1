#![forbid(unsafe_code)]

//! Filtered depth-first traversal.
//!
//! A [`TreeWalker`] holds only a root and a cursor; it borrows the
//! [`Document`] per step, so the tree may be mutated between steps. The walker
//! never climbs above its root; only `previous_node` can yield the root
//! itself.

use bitflags::bitflags;

use crate::document::Document;
use crate::node::{NodeId, NodeKind};

bitflags! {
    /// Node kinds a walker may yield.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeMask: u16 {
        const ELEMENT  = 1;
        const TEXT     = 1 << 2;
        const FRAGMENT = 1 << 10;
        const ALL = Self::ELEMENT.bits() | Self::TEXT.bits() | Self::FRAGMENT.bits();
    }
}

impl NodeMask {
    fn admits(self, kind: NodeKind) -> bool {
        match kind {
            NodeKind::Element => self.contains(Self::ELEMENT),
            NodeKind::Text => self.contains(Self::TEXT),
            NodeKind::Fragment => self.contains(Self::FRAGMENT),
        }
    }
}

/// Predicate type used by walkers built from plain functions.
pub type NodeFilter = fn(&Document, NodeId) -> bool;

/// Accept every node the mask admits.
pub fn accept_all(_: &Document, _: NodeId) -> bool {
    true
}

/// Cursor over the subtree under `root`.
#[derive(Debug, Clone)]
pub struct TreeWalker<F = NodeFilter> {
    root: NodeId,
    current: NodeId,
    mask: NodeMask,
    filter: F,
}

impl<F> TreeWalker<F>
where
    F: Fn(&Document, NodeId) -> bool,
{
    /// Walker positioned on `root`.
    pub fn new(root: NodeId, mask: NodeMask, filter: F) -> Self {
        Self {
            root,
            current: root,
            mask,
            filter,
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn set_current(&mut self, node: NodeId) {
        self.current = node;
    }

    fn accepts(&self, doc: &Document, node: NodeId) -> bool {
        doc.kind(node).is_some_and(|k| self.mask.admits(k)) && (self.filter)(doc, node)
    }

    /// Next accepted node in document order.
    pub fn next_node(&mut self, doc: &Document) -> Option<NodeId> {
        let mut current = self.current;
        loop {
            let mut node = doc.first_child(current);
            while node.is_none() {
                if current == self.root {
                    break;
                }
                node = doc.next_sibling(current);
                if node.is_none() {
                    match doc.parent(current) {
                        Some(parent) => current = parent,
                        None => break,
                    }
                }
            }
            let node = node?;
            if self.accepts(doc, node) {
                self.current = node;
                return Some(node);
            }
            current = node;
        }
    }

    /// Previous accepted node in document order (the mirror of
    /// [`next_node`](Self::next_node)).
    pub fn previous_node(&mut self, doc: &Document) -> Option<NodeId> {
        let mut current = self.current;
        loop {
            if current == self.root {
                return None;
            }
            let node = match doc.previous_sibling(current) {
                Some(mut node) => {
                    while let Some(last) = doc.last_child(node) {
                        node = last;
                    }
                    node
                }
                None => doc.parent(current)?,
            };
            if self.accepts(doc, node) {
                self.current = node;
                return Some(node);
            }
            current = node;
        }
    }

    /// Previous accepted node in post-order: a node's subtree is visited,
    /// last child first, before the node's earlier siblings.
    pub fn previous_post_order_node(&mut self, doc: &Document) -> Option<NodeId> {
        let mut current = self.current;
        loop {
            let mut node = doc.last_child(current);
            while node.is_none() {
                if current == self.root {
                    break;
                }
                node = doc.previous_sibling(current);
                if node.is_none() {
                    match doc.parent(current) {
                        Some(parent) => current = parent,
                        None => break,
                    }
                }
            }
            let node = node?;
            if self.accepts(doc, node) {
                self.current = node;
                return Some(node);
            }
            current = node;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Attributes;
    use crate::tag::Tag;

    /// `root > [p > ["a", b > "b"], p > "c"]`
    fn sample() -> (Document, Vec<NodeId>) {
        let mut doc = Document::new();
        let root = doc.root();
        let p1 = doc.create_element(Tag::P, Attributes::new());
        let a = doc.create_text("a");
        let b = doc.create_element(Tag::B, Attributes::new());
        let bt = doc.create_text("b");
        let p2 = doc.create_element(Tag::P, Attributes::new());
        let c = doc.create_text("c");
        doc.append_child(root, p1).unwrap();
        doc.append_child(p1, a).unwrap();
        doc.append_child(p1, b).unwrap();
        doc.append_child(b, bt).unwrap();
        doc.append_child(root, p2).unwrap();
        doc.append_child(p2, c).unwrap();
        (doc, vec![p1, a, b, bt, p2, c])
    }

    #[test]
    fn forward_text_walk() {
        let (doc, n) = sample();
        let mut walker = TreeWalker::new(doc.root(), NodeMask::TEXT, accept_all as NodeFilter);
        let mut seen = Vec::new();
        while let Some(node) = walker.next_node(&doc) {
            seen.push(node);
        }
        assert_eq!(seen, vec![n[1], n[3], n[5]]);
    }

    #[test]
    fn backward_walk_mirrors_forward() {
        let (doc, n) = sample();
        let mut walker = TreeWalker::new(doc.root(), NodeMask::ALL, accept_all as NodeFilter);
        walker.set_current(n[5]);
        let mut seen = Vec::new();
        while let Some(node) = walker.previous_node(&doc) {
            seen.push(node);
        }
        assert_eq!(seen, vec![n[4], n[3], n[2], n[1], n[0], doc.root()]);
    }

    #[test]
    fn post_order_backward() {
        let (doc, n) = sample();
        let mut walker = TreeWalker::new(doc.root(), NodeMask::ALL, accept_all as NodeFilter);
        walker.set_current(n[4]);
        // p2's own subtree first, then back through p1 in post-order.
        let mut seen = Vec::new();
        while let Some(node) = walker.previous_post_order_node(&doc) {
            seen.push(node);
        }
        assert_eq!(seen, vec![n[5], n[0], n[2], n[3], n[1]]);
    }

    #[test]
    fn never_leaves_root() {
        let (doc, n) = sample();
        let mut walker = TreeWalker::new(n[0], NodeMask::ALL, accept_all as NodeFilter);
        let mut seen = Vec::new();
        while let Some(node) = walker.next_node(&doc) {
            seen.push(node);
        }
        assert_eq!(seen, vec![n[1], n[2], n[3]]);
        assert_eq!(walker.previous_node(&doc), Some(n[2]));
    }

    #[test]
    fn predicate_filters() {
        let (doc, n) = sample();
        let mut walker = TreeWalker::new(doc.root(), NodeMask::TEXT, |d: &Document, id: NodeId| {
            d.text(id) != Some("b")
        });
        assert_eq!(walker.next_node(&doc), Some(n[1]));
        assert_eq!(walker.next_node(&doc), Some(n[5]));
        assert_eq!(walker.next_node(&doc), None);
    }
}
