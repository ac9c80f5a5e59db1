#![forbid(unsafe_code)]

//! Structural queries over a [`Document`].

use crate::document::Document;
use crate::node::{Attributes, NodeId};
use crate::tag::Tag;
use crate::walker::{NodeFilter, NodeMask, TreeWalker};

/// Class marking a background-colour span.
pub const HIGHLIGHT_CLASS: &str = "highlight";
/// Class marking a text-colour span.
pub const COLOUR_CLASS: &str = "colour";
/// Class marking a font-family span.
pub const FONT_FAMILY_CLASS: &str = "font";
/// Class marking a font-size span.
pub const FONT_SIZE_CLASS: &str = "size";

fn is_block_filter(doc: &Document, id: NodeId) -> bool {
    doc.is_block(id)
}

impl Document {
    /// Whether two nodes could be merged into one: same kind and tag, same
    /// `class` and `style`, neither a leaf nor a link.
    #[must_use]
    pub fn are_alike(&self, a: NodeId, b: NodeId) -> bool {
        if self.is_leaf(a) || self.kind(a).is_none() || self.kind(a) != self.kind(b) {
            return false;
        }
        if self.tag(a) != self.tag(b) || self.has_tag(a, &Tag::A) {
            return false;
        }
        match (self.attrs(a), self.attrs(b)) {
            (Some(x), Some(y)) => x.class() == y.class() && x.style() == y.style(),
            (None, None) => true,
            _ => false,
        }
    }

    /// Element of kind `tag` carrying every attribute in `attrs` verbatim.
    #[must_use]
    pub fn has_tag_attributes(&self, node: NodeId, tag: &Tag, attrs: &Attributes) -> bool {
        self.has_tag(node, tag)
            && attrs
                .iter()
                .all(|(name, value)| self.attr(node, name) == Some(value))
    }

    /// Closest inclusive ancestor of `node` below `root` matching
    /// [`has_tag_attributes`](Self::has_tag_attributes).
    #[must_use]
    pub fn get_nearest(
        &self,
        node: NodeId,
        root: NodeId,
        tag: &Tag,
        attrs: &Attributes,
    ) -> Option<NodeId> {
        self.ancestors(node)
            .take_while(|&n| n != root)
            .find(|&n| self.has_tag_attributes(n, tag, attrs))
    }

    /// Human-readable element path from just below `root` down to `node`,
    /// e.g. `DIV>B.bold[dir=rtl]`.
    #[must_use]
    pub fn get_path(&self, node: NodeId, root: NodeId) -> String {
        let mut chain: Vec<NodeId> = self
            .ancestors(node)
            .take_while(|&n| n != root)
            .filter(|&n| self.is_element(n))
            .collect();
        chain.reverse();
        let mut path = String::new();
        for id in chain {
            let (Some(tag), Some(attrs)) = (self.tag(id), self.attrs(id)) else {
                continue;
            };
            if !path.is_empty() {
                path.push('>');
            }
            path.push_str(&tag.name().to_ascii_uppercase());
            if let Some(value) = attrs.get("id").filter(|v| !v.is_empty()) {
                path.push('#');
                path.push_str(value);
            }
            let mut classes: Vec<&str> = attrs.class_names().collect();
            classes.sort_unstable();
            if !classes.is_empty() {
                path.push('.');
                path.push_str(&classes.join("."));
            }
            if let Some(dir) = attrs.get("dir").filter(|v| !v.is_empty()) {
                path.push_str(&format!("[dir={dir}]"));
            }
            let style = |prop: &str| attrs.style_property(prop).unwrap_or("").replace(' ', "");
            if classes.contains(&HIGHLIGHT_CLASS) {
                path.push_str(&format!("[backgroundColor={}]", style("background-color")));
            }
            if classes.contains(&COLOUR_CLASS) {
                path.push_str(&format!("[color={}]", style("color")));
            }
            if classes.contains(&FONT_FAMILY_CLASS) {
                path.push_str(&format!("[fontFamily={}]", style("font-family")));
            }
            if classes.contains(&FONT_SIZE_CLASS) {
                path.push_str(&format!(
                    "[fontSize={}]",
                    attrs.style_property("font-size").unwrap_or("")
                ));
            }
        }
        path
    }

    /// Walker over the block elements under `root`, positioned on `node`.
    #[must_use]
    pub fn block_walker(&self, node: NodeId, root: NodeId) -> TreeWalker {
        let mut walker = TreeWalker::new(root, NodeMask::ELEMENT, is_block_filter as NodeFilter);
        walker.set_current(node);
        walker
    }

    /// Nearest block before `node` in document order, excluding `root`.
    #[must_use]
    pub fn previous_block(&self, node: NodeId, root: NodeId) -> Option<NodeId> {
        self.block_walker(node, root)
            .previous_node(self)
            .filter(|&n| n != root)
    }

    /// Nearest block after `node` in document order, excluding `root`.
    #[must_use]
    pub fn next_block(&self, node: NodeId, root: NodeId) -> Option<NodeId> {
        self.block_walker(node, root)
            .next_node(self)
            .filter(|&n| n != root)
    }
}
