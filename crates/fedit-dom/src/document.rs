#![forbid(unsafe_code)]

//! Arena-backed document tree.
//!
//! Nodes live in a slot vector and are addressed by generational
//! [`NodeId`]s. A parent owns its children through a `Vec<NodeId>`; the
//! `parent` link is a plain back-reference used only for upward traversal.
//! Each node also caches its position in that list, so sibling steps are
//! constant time.
//!
//! ```text
//!  slots: [ root(div) | p | "one" | p | "two" | <free> ]
//!                 │       ▲          ▲
//!  children ──────┴───────┴──────────┘
//!  free list: [5]   version: 17
//! ```
//!
//! # Invariants
//!
//! 1. A node has at most one parent, and appears exactly once in that
//!    parent's child list.
//! 2. Text nodes never have children; leaf elements never have children.
//! 3. Fragments never have a parent.
//! 4. `version` strictly increases on every structural or content mutation,
//!    which invalidates every memoized node category at once.
//! 5. A child's cached `sibling_index` equals its position in its parent's
//!    child list.

use std::cell::Cell;
use std::fmt;

use crate::category::Category;
use crate::error::DomError;
use crate::node::{Attributes, NodeData, NodeId, NodeKind};
use crate::tag::{Tag, TagFlags};

pub(crate) struct NodeRecord {
    pub(crate) data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    sibling_index: usize,
    pub(crate) category: Cell<Option<(u64, Category)>>,
}

struct Slot {
    generation: u32,
    record: Option<NodeRecord>,
}

/// Tag and attributes used whenever a default block has to be synthesized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTemplate {
    pub tag: Tag,
    pub attributes: Attributes,
}

impl Default for BlockTemplate {
    fn default() -> Self {
        Self {
            tag: Tag::Div,
            attributes: Attributes::new(),
        }
    }
}

impl BlockTemplate {
    #[must_use]
    pub fn new(tag: impl Into<Tag>, attributes: Attributes) -> Self {
        Self {
            tag: tag.into(),
            attributes,
        }
    }
}

/// A mutable document tree with a single editing root.
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    version: u64,
    block: BlockTemplate,
    errors: Vec<DomError>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root)
            .field("live_nodes", &self.node_count())
            .field("version", &self.version)
            .field("block", &self.block.tag)
            .field("errors", &self.errors.len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document whose root is a `div` and whose default block is `div`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_block_template(BlockTemplate::default())
    }

    #[must_use]
    pub fn with_block_template(block: BlockTemplate) -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId::new(0, 0),
            version: 0,
            block,
            errors: Vec::new(),
        };
        doc.root = doc.alloc(NodeData::element(Tag::Div, Attributes::new()));
        doc
    }

    // ====================================================================
    // Arena bookkeeping
    // ====================================================================

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let record = NodeRecord {
            data,
            parent: None,
            children: Vec::new(),
            sibling_index: 0,
            category: Cell::new(None),
        };
        self.touch();
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.record = Some(record);
            return NodeId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            record: Some(record),
        });
        NodeId::new(index, 0)
    }

    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let Some(slot) = self.slots.get_mut(node.index()) else {
                continue;
            };
            if slot.generation != node.generation() {
                continue;
            }
            if let Some(record) = slot.record.take() {
                stack.extend(record.children);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(node.index() as u32);
            }
        }
        self.touch();
    }

    pub(crate) fn record(&self, id: NodeId) -> Option<&NodeRecord> {
        let slot = self.slots.get(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.record.as_ref()
    }

    fn record_mut(&mut self, id: NodeId) -> Option<&mut NodeRecord> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.record.as_mut()
    }

    fn live(&self, id: NodeId) -> Result<&NodeRecord, DomError> {
        self.record(id).ok_or(DomError::StaleNode(id))
    }

    /// Refresh the cached positions of `parent`'s children from `from` on.
    fn reindex(&mut self, parent: NodeId, from: usize) {
        let children = match self.record(parent) {
            Some(record) if from < record.children.len() => record.children[from..].to_vec(),
            _ => return,
        };
        for (offset, child) in children.into_iter().enumerate() {
            if let Some(record) = self.record_mut(child) {
                record.sibling_index = from + offset;
            }
        }
    }

    fn touch(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Mutation counter; bumped by every change to the tree.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether `id` refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.record(id).is_some()
    }

    /// Number of live nodes, including detached ones and fragments.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|s| s.record.is_some()).count()
    }

    /// The editing root.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn block_template(&self) -> &BlockTemplate {
        &self.block
    }

    pub fn set_block_template(&mut self, block: BlockTemplate) {
        self.block = block;
    }

    // ====================================================================
    // Error sink
    // ====================================================================

    /// Record a non-fatal failure; the operation that hit it carries on.
    pub fn report(&mut self, err: DomError) {
        tracing::warn!(error = %err, "tree fix-up failed");
        self.errors.push(err);
    }

    #[must_use]
    pub fn errors(&self) -> &[DomError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<DomError> {
        std::mem::take(&mut self.errors)
    }

    // ====================================================================
    // Creation
    // ====================================================================

    pub fn create_text(&mut self, data: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(data.into()))
    }

    pub fn create_element(&mut self, tag: impl Into<Tag>, attrs: Attributes) -> NodeId {
        self.alloc(NodeData::element(tag.into(), attrs))
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeData::Fragment)
    }

    /// A bare element built from the block template, without any filler.
    pub fn create_default_block(&mut self) -> NodeId {
        let BlockTemplate { tag, attributes } = self.block.clone();
        self.create_element(tag, attributes)
    }

    /// Copy of a node without its children.
    pub fn clone_shallow(&mut self, id: NodeId) -> Result<NodeId, DomError> {
        let data = self.live(id)?.data.clone();
        Ok(self.alloc(data))
    }

    /// Copy of a node and its whole subtree.
    pub fn clone_deep(&mut self, id: NodeId) -> Result<NodeId, DomError> {
        let copy = self.clone_shallow(id)?;
        let children = self.children(id).to_vec();
        for child in children {
            let child_copy = self.clone_deep(child)?;
            self.append_child(copy, child_copy)?;
        }
        Ok(copy)
    }

    // ====================================================================
    // Inspection
    // ====================================================================

    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.record(id).map(|r| r.data.kind())
    }

    #[must_use]
    pub fn is_text(&self, id: NodeId) -> bool {
        self.kind(id) == Some(NodeKind::Text)
    }

    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.kind(id) == Some(NodeKind::Element)
    }

    #[must_use]
    pub fn is_fragment(&self, id: NodeId) -> bool {
        self.kind(id) == Some(NodeKind::Fragment)
    }

    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&Tag> {
        match &self.record(id)?.data {
            NodeData::Element(el) => Some(&el.tag),
            _ => None,
        }
    }

    /// Whether `id` is an element of kind `tag`.
    #[must_use]
    pub fn has_tag(&self, id: NodeId, tag: &Tag) -> bool {
        self.tag(id) == Some(tag)
    }

    /// Capability bits of an element; empty for anything else.
    #[must_use]
    pub fn tag_flags(&self, id: NodeId) -> TagFlags {
        match self.record(id).map(|r| &r.data) {
            Some(NodeData::Element(el)) => el.flags,
            _ => TagFlags::empty(),
        }
    }

    #[must_use]
    pub fn attrs(&self, id: NodeId) -> Option<&Attributes> {
        match &self.record(id)?.data {
            NodeData::Element(el) => Some(&el.attrs),
            _ => None,
        }
    }

    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)?.get(name)
    }

    pub fn set_attr(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let record = self.record_mut(id).ok_or(DomError::StaleNode(id))?;
        match &mut record.data {
            NodeData::Element(el) => {
                el.attrs.set(name, value);
            }
            _ => return Err(DomError::NotElement(id)),
        }
        self.touch();
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        let removed = match &mut self.record_mut(id)?.data {
            NodeData::Element(el) => el.attrs.remove(name),
            _ => None,
        };
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.record(id)?.data {
            NodeData::Text(data) => Some(data),
            _ => None,
        }
    }

    /// Character count of a text node; zero for anything else.
    #[must_use]
    pub fn text_len(&self, id: NodeId) -> usize {
        self.text(id).map_or(0, |t| t.chars().count())
    }

    /// Characters for text nodes, children for everything else.
    #[must_use]
    pub fn length(&self, id: NodeId) -> usize {
        match self.record(id) {
            Some(NodeRecord {
                data: NodeData::Text(data),
                ..
            }) => data.chars().count(),
            Some(record) => record.children.len(),
            None => 0,
        }
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.record(id)?.parent
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.record(id).map_or(&[], |r| r.children.as_slice())
    }

    #[must_use]
    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Position of `id` within its parent's children.
    #[must_use]
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let record = self.record(id)?;
        record.parent?;
        Some(record.sibling_index)
    }

    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id)?;
        self.child(parent, index + 1)
    }

    #[must_use]
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id)?;
        index.checked_sub(1).and_then(|i| self.child(parent, i))
    }

    /// `node` and each of its ancestors, innermost first.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = self.is_alive(node).then_some(node);
        std::iter::successors(start, move |&n| self.parent(n))
    }

    /// Whether `node` is `ancestor` or lies inside it.
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|n| n == ancestor)
    }

    /// Deepest node containing both `a` and `b`.
    #[must_use]
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let chain: Vec<NodeId> = self.ancestors(a).collect();
        self.ancestors(b).find(|n| chain.contains(n))
    }

    /// Nodes strictly inside `id`, in document order.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root: id,
            next: self.first_child(id),
        }
    }

    /// Concatenated text of every text node under `id`.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .filter_map(|n| self.text(n))
            .collect()
    }

    // ====================================================================
    // Structural mutation
    // ====================================================================

    /// Insert `child` into `parent` before `reference` (or at the end).
    ///
    /// A fragment child moves its children instead and is left empty. A
    /// child that already has a parent is moved.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        let parent_record = self.live(parent)?;
        match &parent_record.data {
            NodeData::Text(_) => return Err(DomError::NotAContainer(parent)),
            NodeData::Element(el) if el.flags.contains(TagFlags::LEAF) => {
                return Err(DomError::LeafCannotHaveChildren {
                    parent,
                    tag: el.tag.clone(),
                });
            }
            _ => {}
        }
        let child_kind = self.live(child)?.data.kind();
        if let Some(reference) = reference
            && self.parent(reference) != Some(parent)
        {
            return Err(DomError::NotAChild {
                parent,
                node: reference,
            });
        }

        if child_kind == NodeKind::Fragment {
            if child == parent {
                return Err(DomError::HierarchyCycle { parent, child });
            }
            let moved = std::mem::take(
                &mut self
                    .record_mut(child)
                    .ok_or(DomError::StaleNode(child))?
                    .children,
            );
            let mut index = self.insertion_index(parent, reference);
            for node in moved {
                self.attach(parent, node, index);
                index += 1;
            }
            self.touch();
            return Ok(());
        }

        if self.contains(child, parent) {
            return Err(DomError::HierarchyCycle { parent, child });
        }
        let reference = if reference == Some(child) {
            self.next_sibling(child)
        } else {
            reference
        };
        self.detach(child);
        let index = self.insertion_index(parent, reference);
        self.attach(parent, child, index);
        self.touch();
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` at `index` among `parent`'s children (clamped).
    pub fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), DomError> {
        let reference = self.child(parent, index);
        self.insert_before(parent, child, reference)
    }

    /// Put `new` where `old` is; `old` ends up detached.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) -> Result<(), DomError> {
        let Some(parent) = self.parent(old) else {
            return Ok(());
        };
        self.insert_before(parent, new, Some(old))?;
        self.detach(old);
        Ok(())
    }

    fn insertion_index(&self, parent: NodeId, reference: Option<NodeId>) -> usize {
        reference
            .filter(|&r| self.parent(r) == Some(parent))
            .and_then(|r| self.index_of(r))
            .unwrap_or_else(|| self.children(parent).len())
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, index: usize) {
        if let Some(record) = self.record_mut(child) {
            record.parent = Some(parent);
        }
        let Some(record) = self.record_mut(parent) else {
            return;
        };
        let index = index.min(record.children.len());
        record.children.insert(index, child);
        self.reindex(parent, index);
    }

    /// Remove `id` from its parent, keeping it alive.
    pub fn detach(&mut self, id: NodeId) -> NodeId {
        let Some(parent) = self.parent(id) else {
            return id;
        };
        let index = self.index_of(id).unwrap_or(0);
        if let Some(record) = self.record_mut(parent) {
            if record.children.get(index) == Some(&id) {
                record.children.remove(index);
            } else {
                record.children.retain(|&c| c != id);
            }
        }
        if let Some(record) = self.record_mut(id) {
            record.parent = None;
            record.sibling_index = 0;
        }
        self.reindex(parent, index);
        self.touch();
        id
    }

    /// Detach `id` and free it together with its subtree.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        self.detach(id);
        self.release(id);
    }

    /// Free every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        for child in children {
            self.remove(child);
        }
    }

    /// Move every child of `id` into a new fragment.
    pub fn empty(&mut self, id: NodeId) -> NodeId {
        let frag = self.create_fragment();
        let children = match self.record_mut(id) {
            Some(record) => std::mem::take(&mut record.children),
            None => Vec::new(),
        };
        for (index, child) in children.iter().enumerate() {
            if let Some(record) = self.record_mut(*child) {
                record.parent = Some(frag);
                record.sibling_index = index;
            }
        }
        if let Some(record) = self.record_mut(frag) {
            record.children = children;
        }
        self.touch();
        frag
    }

    // ====================================================================
    // Text mutation
    // ====================================================================

    fn text_mut(&mut self, id: NodeId) -> Result<&mut String, DomError> {
        match &mut self.record_mut(id).ok_or(DomError::StaleNode(id))?.data {
            NodeData::Text(data) => Ok(data),
            _ => Err(DomError::NotText(id)),
        }
    }

    /// Divide a text node at `offset`; the right half becomes a new sibling
    /// inserted immediately after it and is returned.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, DomError> {
        let data = self.text_mut(id)?;
        let length = data.chars().count();
        if offset > length {
            return Err(DomError::OffsetOutOfBounds {
                node: id,
                offset,
                length,
            });
        }
        let at = byte_offset(data, offset);
        let tail = data.split_off(at);
        let after = self.create_text(tail);
        if let Some(parent) = self.parent(id) {
            let reference = self.next_sibling(id);
            self.insert_before(parent, after, reference)?;
        }
        self.touch();
        Ok(after)
    }

    pub fn append_text(&mut self, id: NodeId, more: &str) -> Result<(), DomError> {
        self.text_mut(id)?.push_str(more);
        self.touch();
        Ok(())
    }

    pub fn set_text(&mut self, id: NodeId, data: impl Into<String>) -> Result<(), DomError> {
        *self.text_mut(id)? = data.into();
        self.touch();
        Ok(())
    }

    /// Remove `count` characters starting at `offset`.
    pub fn delete_text(&mut self, id: NodeId, offset: usize, count: usize) -> Result<(), DomError> {
        let data = self.text_mut(id)?;
        let length = data.chars().count();
        if offset > length {
            return Err(DomError::OffsetOutOfBounds {
                node: id,
                offset,
                length,
            });
        }
        let start = byte_offset(data, offset);
        let end = byte_offset(data, (offset + count).min(length));
        data.replace_range(start..end, "");
        self.touch();
        Ok(())
    }
}

/// Byte index of the `chars`-th character of `s` (or its length).
pub(crate) fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

/// Pre-order iterator over the nodes inside a subtree.
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.first_child(current).or_else(|| {
            let mut node = current;
            loop {
                if node == self.root {
                    return None;
                }
                if let Some(sibling) = self.doc.next_sibling(node) {
                    return Some(sibling);
                }
                node = self.doc.parent(node)?;
            }
        });
        Some(current)
    }
}
