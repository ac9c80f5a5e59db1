#![forbid(unsafe_code)]

//! Block-level commands: quotes, lists, alignment and direction.
//!
//! Structural commands go through [`Editor::modify_blocks`]: the selection is
//! widened to whole blocks, extracted up to the root, handed to a modifier
//! as a fragment, and the modifier's result is put back where the blocks
//! were. Like containers meeting at either seam are merged afterwards, so
//! making a list next to a list extends it.

use fedit_dom::{Attributes, Document, NodeId, Tag, TagFlags};
use fedit_range::{
    Position, Range, RangeError, expand_to_block_boundaries, extract_contents, fix_container,
    fix_cursor, get_end_block, get_start_block, insert_node_in_range, merge_containers,
    move_boundaries_down, move_boundaries_up, split_before,
};

use crate::bookmark::range_from_bookmark;
use crate::editor::Editor;
use crate::error::EditorError;

impl Editor {
    /// Call `f` on each block the selection (or `range`) touches, in order,
    /// until it returns `true`.
    ///
    /// With `mutates`, the call is one undoable command.
    pub fn for_each_block(
        &mut self,
        mut f: impl FnMut(&mut Document, NodeId) -> bool,
        mutates: bool,
        range: Option<Range>,
    ) -> Result<(), EditorError> {
        let root = self.root();
        let mut range = range.unwrap_or_else(|| self.selection());
        if mutates {
            range = self.save_undo_state(range)?;
        }

        let start = get_start_block(&self.doc, &range, root);
        let end = get_end_block(&self.doc, &range, root);
        if let (Some(mut block), Some(end)) = (start, end) {
            loop {
                if f(&mut self.doc, block) || block == end {
                    break;
                }
                match self.doc.next_block(block, root) {
                    Some(next) => block = next,
                    None => break,
                }
            }
        }

        if mutates {
            self.finish_command(range);
            self.doc_was_changed();
        }
        Ok(())
    }

    /// Replace the blocks covered by the selection (or `range`) with what
    /// `modifier` makes of them.
    ///
    /// The modifier receives the extracted blocks as a fragment and returns
    /// the node to insert in their place.
    pub fn modify_blocks(
        &mut self,
        modifier: impl FnOnce(&mut Editor, NodeId) -> Result<NodeId, RangeError>,
        range: Option<Range>,
    ) -> Result<(), EditorError> {
        let _span = tracing::debug_span!("fedit.editor.modify_blocks").entered();
        let root = self.root();
        let mut range = range.unwrap_or_else(|| self.selection());
        if !range.is_collapsed() {
            range = move_boundaries_down(&self.doc, range);
        }
        let range = self.bookmark_for_command(range)?;

        let range = expand_to_block_boundaries(&self.doc, range, root);
        let range = move_boundaries_up(&self.doc, range, Some(root), Some(root), root);

        // Extracting everything leaves a filler block behind.
        let whole = range.start == Position::new(root, 0)
            && range.end == Position::new(root, self.doc.length(root));
        let (frag, caret) = extract_contents(&mut self.doc, range, Some(root), root)?;
        let filler = if whole { self.doc.first_child(root) } else { None };

        let modified = modifier(self, frag)?;
        let inserted = insert_node_in_range(&mut self.doc, caret, modified)?;
        if modified != frag {
            self.doc.remove(frag);
        }
        if self.doc.is_fragment(modified) {
            self.doc.remove(modified);
        }
        if let Some(filler) = filler
            && self.doc.length(root) > 1
        {
            self.doc.remove(filler);
        }

        let Range { start, end } = inserted;
        if end.offset < self.doc.length(end.node)
            && let Some(after) = self.doc.child(end.node, end.offset)
        {
            merge_containers(&mut self.doc, after, root)?;
        }
        if let Some(first) = self.doc.child(start.node, start.offset) {
            merge_containers(&mut self.doc, first, root)?;
        }

        let range = range_from_bookmark(&mut self.doc, root).unwrap_or(inserted);
        self.finish_command(range);
        self.doc_was_changed();
        Ok(())
    }

    // ====================================================================
    // Quotes
    // ====================================================================

    /// Wrap the selected blocks in a `blockquote`.
    pub fn increase_quote_level(&mut self, range: Option<Range>) -> Result<(), EditorError> {
        self.modify_blocks(
            |editor, frag| {
                let attrs = editor.config.tag_attributes.for_tag(&Tag::Blockquote);
                let quote = editor.doc.create_element(Tag::Blockquote, attrs);
                editor.doc.append_child(quote, frag)?;
                Ok(quote)
            },
            range,
        )
    }

    /// Unwrap the outermost quote around the selected blocks.
    pub fn decrease_quote_level(&mut self, range: Option<Range>) -> Result<(), EditorError> {
        self.modify_blocks(
            |editor, frag| {
                let doc = &mut editor.doc;
                let quotes: Vec<NodeId> = doc
                    .descendants(frag)
                    .filter(|&n| {
                        doc.has_tag(n, &Tag::Blockquote)
                            && doc.parent(n).is_some_and(|p| {
                                doc.get_nearest(p, frag, &Tag::Blockquote, &Attributes::new())
                                    .is_none()
                            })
                    })
                    .collect();
                for quote in quotes {
                    replace_with_children(doc, quote)?;
                }
                Ok(frag)
            },
            range,
        )
    }

    // ====================================================================
    // Lists
    // ====================================================================

    pub fn make_unordered_list(&mut self, range: Option<Range>) -> Result<(), EditorError> {
        self.modify_blocks(
            |editor, frag| {
                editor.make_list(frag, Tag::Ul)?;
                Ok(frag)
            },
            range,
        )
    }

    pub fn make_ordered_list(&mut self, range: Option<Range>) -> Result<(), EditorError> {
        self.modify_blocks(
            |editor, frag| {
                editor.make_list(frag, Tag::Ol)?;
                Ok(frag)
            },
            range,
        )
    }

    /// Turn every block in `frag` into an item of a `list_tag` list,
    /// extending a preceding list of the same kind. Items of the other list
    /// kind get their list retagged.
    fn make_list(&mut self, frag: NodeId, list_tag: Tag) -> Result<(), RangeError> {
        let list_attrs = self.config.tag_attributes.for_tag(&list_tag);
        let item_attrs = self.config.tag_attributes.for_tag(&Tag::Li);
        let doc = &mut self.doc;

        let mut walker = doc.block_walker(frag, frag);
        while let Some(mut node) = walker.next_node(doc) {
            if let Some(item) = doc.parent(node).filter(|&p| doc.has_tag(p, &Tag::Li)) {
                node = item;
                if let Some(last) = doc.last_child(item) {
                    walker.set_current(last);
                }
            }

            if !doc.has_tag(node, &Tag::Li) {
                let item = doc.create_element(Tag::Li, item_attrs.clone());
                if let Some(dir) = doc.attr(node, "dir").map(str::to_owned) {
                    doc.set_attr(item, "dir", dir)?;
                }
                match doc.previous_sibling(node).filter(|&p| doc.has_tag(p, &list_tag)) {
                    Some(list) => {
                        doc.append_child(list, item)?;
                        doc.detach(node);
                    }
                    None => {
                        let list = doc.create_element(list_tag.clone(), list_attrs.clone());
                        doc.append_child(list, item)?;
                        doc.replace_with(node, list)?;
                    }
                }
                let content = doc.empty(node);
                doc.append_child(item, content)?;
                doc.remove(content);
                doc.remove(node);
                walker.set_current(item);
            } else if let Some(list) = doc.parent(node)
                && !doc.has_tag(list, &list_tag)
                && doc.tag_flags(list).contains(TagFlags::LIST)
            {
                let retagged = doc.create_element(list_tag.clone(), list_attrs.clone());
                let content = doc.empty(list);
                doc.append_child(retagged, content)?;
                doc.remove(content);
                doc.replace_with(list, retagged)?;
                doc.remove(list);
            }
        }
        Ok(())
    }

    /// Turn list items back into default blocks.
    pub fn remove_list(&mut self, range: Option<Range>) -> Result<(), EditorError> {
        self.modify_blocks(
            |editor, frag| {
                let root = editor.root();
                let doc = &mut editor.doc;
                let lists: Vec<NodeId> = doc
                    .descendants(frag)
                    .filter(|&n| doc.tag_flags(n).contains(TagFlags::LIST))
                    .collect();
                let items: Vec<NodeId> = doc
                    .descendants(frag)
                    .filter(|&n| doc.has_tag(n, &Tag::Li))
                    .collect();

                for list in lists {
                    let content = doc.empty(list);
                    fix_container(doc, content, root)?;
                    doc.replace_with(list, content)?;
                    doc.remove(list);
                    doc.remove(content);
                }
                for item in items {
                    if doc.is_block(item) {
                        let block = doc.create_default_block();
                        let content = doc.empty(item);
                        doc.append_child(block, content)?;
                        doc.remove(content);
                        fix_cursor(doc, block, root);
                        doc.replace_with(item, block)?;
                        doc.remove(item);
                    } else {
                        fix_container(doc, item, root)?;
                        replace_with_children(doc, item)?;
                    }
                }
                Ok(frag)
            },
            range,
        )
    }

    /// Nest the selected list items one level deeper.
    pub fn increase_list_level(&mut self, range: Option<Range>) -> Result<(), EditorError> {
        self.modify_blocks(
            |editor, frag| {
                let items: Vec<NodeId> = editor
                    .doc
                    .descendants(frag)
                    .filter(|&n| editor.doc.has_tag(n, &Tag::Li))
                    .collect();
                for item in items {
                    let doc = &editor.doc;
                    if doc.first_child(item).is_some_and(|f| doc.is_container(f)) {
                        continue;
                    }
                    let Some(list_tag) = doc.parent(item).and_then(|p| doc.tag(p)).cloned() else {
                        continue;
                    };
                    let existing = doc
                        .previous_sibling(item)
                        .and_then(|prev| doc.last_child(prev))
                        .filter(|&last| doc.has_tag(last, &list_tag));
                    let new_parent = match existing {
                        Some(list) => list,
                        None => {
                            let attrs = editor.config.tag_attributes.for_tag(&list_tag);
                            let list = editor.doc.create_element(list_tag, attrs);
                            editor.doc.replace_with(item, list)?;
                            list
                        }
                    };
                    editor.doc.append_child(new_parent, item)?;
                }
                Ok(frag)
            },
            range,
        )
    }

    /// Move the selected list items one level up; items at the top level
    /// leave the list.
    pub fn decrease_list_level(&mut self, range: Option<Range>) -> Result<(), EditorError> {
        self.modify_blocks(
            |editor, frag| {
                let root = editor.root();
                let doc = &mut editor.doc;
                let items: Vec<NodeId> = doc
                    .descendants(frag)
                    .filter(|&n| {
                        doc.has_tag(n, &Tag::Li)
                            && !doc.first_child(n).is_some_and(|f| doc.is_container(f))
                    })
                    .collect();

                for item in items {
                    let Some(mut list) = doc.parent(item) else {
                        continue;
                    };
                    let Some(new_parent) = doc.parent(list) else {
                        continue;
                    };
                    let first = doc.first_child(item);
                    if doc.previous_sibling(item).is_some() {
                        list = split_before(doc, list, Some(item), new_parent, root)?.unwrap_or(list);
                    }

                    if doc.tag_flags(new_parent).contains(TagFlags::LIST) {
                        // `ul > ul > li` becomes `ul > li`.
                        doc.insert_before(new_parent, item, Some(list))?;
                        if doc.first_child(list).is_none() {
                            doc.remove(list);
                        }
                    } else {
                        let mut node = first;
                        while let Some(current) = node {
                            if doc.is_container(current) {
                                break;
                            }
                            node = doc.next_sibling(current);
                            doc.insert_before(new_parent, current, Some(list))?;
                        }
                    }

                    if doc.has_tag(new_parent, &Tag::Li)
                        && let Some(first) = first
                        && doc.previous_sibling(first).is_some()
                        && let Some(outer) = doc.parent(new_parent)
                    {
                        split_before(doc, new_parent, Some(first), outer, root)?;
                    }

                    let mut node = item;
                    while node != frag && doc.is_alive(node) && doc.length(node) == 0 {
                        let Some(parent) = doc.parent(node) else {
                            break;
                        };
                        doc.remove(node);
                        node = parent;
                    }
                }
                fix_container(doc, frag, root)?;
                Ok(frag)
            },
            range,
        )
    }

    // ====================================================================
    // Alignment and direction
    // ====================================================================

    /// Align the selected blocks (`left`, `center`, ...), or clear the
    /// alignment with `None`.
    pub fn set_text_alignment(&mut self, alignment: Option<&str>) -> Result<(), EditorError> {
        self.for_each_block(
            |doc, block| {
                let Some(attrs) = doc.attrs(block) else {
                    return false;
                };
                let mut classes: Vec<String> = attrs
                    .class_names()
                    .filter(|c| !c.starts_with("align"))
                    .map(str::to_owned)
                    .collect();
                let style = with_style_property(attrs.style(), "text-align", alignment);
                if let Some(alignment) = alignment {
                    classes.push(format!("align-{alignment}"));
                }
                let class = classes.join(" ");
                set_or_remove(doc, block, "class", &class);
                set_or_remove(doc, block, "style", &style);
                false
            },
            true,
            None,
        )
    }

    /// Set `dir` on the selected blocks, or remove it with `None`.
    pub fn set_text_direction(&mut self, direction: Option<&str>) -> Result<(), EditorError> {
        self.for_each_block(
            |doc, block| {
                match direction {
                    Some(direction) => {
                        if let Err(err) = doc.set_attr(block, "dir", direction) {
                            doc.report(err);
                        }
                    }
                    None => {
                        doc.remove_attr(block, "dir");
                    }
                }
                false
            },
            true,
            None,
        )
    }
}

/// Replace `node` with its children.
fn replace_with_children(doc: &mut Document, node: NodeId) -> Result<(), RangeError> {
    let content = doc.empty(node);
    doc.replace_with(node, content)?;
    doc.remove(node);
    doc.remove(content);
    Ok(())
}

fn set_or_remove(doc: &mut Document, node: NodeId, name: &str, value: &str) {
    if value.is_empty() {
        doc.remove_attr(node, name);
    } else if let Err(err) = doc.set_attr(node, name, value) {
        doc.report(err);
    }
}

/// `style` with every `property` declaration dropped and, given a value, a
/// fresh one appended.
fn with_style_property(style: &str, property: &str, value: Option<&str>) -> String {
    let mut declarations: Vec<String> = style
        .split(';')
        .map(str::trim)
        .filter(|decl| !decl.is_empty())
        .filter(|decl| {
            decl.split_once(':')
                .is_none_or(|(name, _)| !name.trim().eq_ignore_ascii_case(property))
        })
        .map(str::to_owned)
        .collect();
    if let Some(value) = value {
        declarations.push(format!("{property}: {value}"));
    }
    if declarations.is_empty() {
        String::new()
    } else {
        format!("{};", declarations.join("; "))
    }
}
