#![forbid(unsafe_code)]

//! Structural cleanup for markup entering the editor, and block splitting.

use fedit_dom::{
    Attributes, Document, NodeId, NodeMask, Tag, TreeWalker, ZWS, accept_all, has_content,
    is_whitespace_char,
};

use crate::error::RangeError;
use crate::mutate::{fix_container, fix_cursor, split};

/// Remove empty text nodes, and inline elements left without children,
/// throughout the subtree of `node`. Leaves are kept.
pub fn remove_empty_inlines(doc: &mut Document, node: NodeId) {
    let children = doc.children(node).to_vec();
    for &child in children.iter().rev() {
        if doc.is_element(child) && !doc.is_leaf(child) {
            remove_empty_inlines(doc, child);
            if doc.is_inline(child) && doc.first_child(child).is_none() {
                doc.remove(child);
            }
        } else if doc.text(child).is_some_and(str::is_empty) {
            doc.remove(child);
        }
    }
}

fn is_br_or_content(doc: &Document, id: NodeId) -> bool {
    match doc.text(id) {
        Some(text) => has_content(text),
        None => doc.has_tag(id, &Tag::Br),
    }
}

/// Whether `br` ends a visible line in its block: something visible follows
/// it, or, with `if_empty_block`, nothing visible precedes it.
fn is_line_break(doc: &Document, br: NodeId, if_empty_block: bool) -> bool {
    let Some(block) = doc
        .ancestors(br)
        .skip(1)
        .find(|&n| !doc.is_inline(n))
    else {
        return false;
    };
    let mut walker = TreeWalker::new(
        block,
        NodeMask::ELEMENT | NodeMask::TEXT,
        is_br_or_content as fn(&Document, NodeId) -> bool,
    );
    walker.set_current(br);
    if walker.next_node(doc).is_some() {
        return true;
    }
    if_empty_block && walker.previous_node(doc).is_none()
}

/// Drop the `br` elements under `node` that do not break a line, and turn
/// the rest into block boundaries by fixing their containers.
///
/// Every `br` is judged in its original context before any is touched, so
/// of two adjacent breaks the second still counts.
pub fn cleanup_brs(
    doc: &mut Document,
    node: NodeId,
    root: NodeId,
    keep_for_blank_line: bool,
) -> Result<(), RangeError> {
    let brs: Vec<NodeId> = doc
        .descendants(node)
        .filter(|&n| doc.has_tag(n, &Tag::Br))
        .collect();
    let breaks: Vec<bool> = brs
        .iter()
        .map(|&br| is_line_break(doc, br, keep_for_blank_line))
        .collect();
    tracing::trace!(count = brs.len(), "cleaning line breaks");
    for (&br, breaks_line) in brs.iter().zip(breaks).rev() {
        let Some(parent) = doc.parent(br) else {
            continue;
        };
        if !breaks_line {
            doc.remove(br);
        } else if !doc.is_inline(parent) {
            fix_container(doc, parent, root)?;
        }
    }
    Ok(())
}

/// Strip zero-width placeholders from every text node under `root`, except
/// those directly inside `keep`. A node holding only a placeholder is
/// removed, along with any inline ancestors it leaves empty.
pub fn remove_zws(doc: &mut Document, root: NodeId, keep: Option<NodeId>) {
    let mut walker = TreeWalker::new(root, NodeMask::TEXT, accept_all);
    while let Some(node) = walker.next_node(doc) {
        let Some(parent) = doc.parent(node) else {
            continue;
        };
        if Some(parent) == keep {
            continue;
        }
        let Some(text) = doc.text(node) else {
            continue;
        };
        if !text.contains(ZWS) {
            continue;
        }
        let stripped: String = text.chars().filter(|&c| c != ZWS).collect();
        if !stripped.is_empty() {
            if let Err(err) = doc.set_text(node, stripped) {
                doc.report(err);
            }
            continue;
        }
        let mut top = node;
        let mut parent = parent;
        loop {
            doc.remove(top);
            top = parent;
            if top == root || !doc.is_inline(top) || doc.length(top) > 0 {
                break;
            }
            let Some(up) = doc.parent(top) else {
                break;
            };
            parent = up;
        }
        walker.set_current(top);
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Before,
    After,
}

/// Whether inline content sits next to `node` on `side` before the nearest
/// block boundary under `scope`.
fn inline_content_beside(doc: &Document, scope: NodeId, node: NodeId, side: Side) -> bool {
    let mut walker = TreeWalker::new(scope, NodeMask::ELEMENT | NodeMask::TEXT, accept_all);
    walker.set_current(node);
    loop {
        let next = match side {
            Side::Before => walker.previous_post_order_node(doc),
            Side::After => walker.next_node(doc),
        };
        let Some(sibling) = next else {
            return false;
        };
        if doc.has_tag(sibling, &Tag::Img) || doc.text(sibling).is_some_and(has_content) {
            return true;
        }
        if !doc.is_inline(sibling) {
            return false;
        }
    }
}

/// Collapse insignificant whitespace at the edges of text nodes under
/// `node`.
///
/// An edge run becomes a single space when inline content follows on that
/// side within the block, and is dropped otherwise. Text left empty is
/// removed. Nothing inside `pre` (or anything when `preserve` is set) is
/// touched.
pub fn collapse_whitespace(doc: &mut Document, node: NodeId, preserve: bool) {
    let scope = doc
        .ancestors(node)
        .find(|&n| !doc.is_inline(n))
        .unwrap_or(node);
    let mut i = 0;
    while let Some(child) = doc.child(node, i) {
        i += 1;
        if doc.is_element(child) {
            if doc.first_child(child).is_some() {
                let preserve = preserve || doc.has_tag(child, &Tag::Pre);
                collapse_whitespace(doc, child, preserve);
            }
            continue;
        }
        let Some(data) = doc.text(child) else {
            continue;
        };
        let starts_ws = data.chars().next().is_none_or(is_whitespace_char);
        let ends_ws = data.chars().last().is_none_or(is_whitespace_char);
        if preserve || (!starts_ws && !ends_ws) {
            continue;
        }
        let mut data = data.to_owned();
        if starts_ws {
            let pad = if inline_content_beside(doc, scope, child, Side::Before) { " " } else { "" };
            data = format!("{pad}{}", data.trim_start_matches(is_whitespace_char));
        }
        if ends_ws {
            let pad = if inline_content_beside(doc, scope, child, Side::After) { " " } else { "" };
            data = format!("{}{pad}", data.trim_end_matches(is_whitespace_char));
        }
        if data.is_empty() {
            doc.remove(child);
            i -= 1;
        } else if let Err(err) = doc.set_text(child, data) {
            doc.report(err);
        }
    }
}

/// Split `block` at `(node, offset)` and return the new block after it.
///
/// The new block is a `dd` after a `dt`, a `dt` after a `dd`, another `li`
/// after an `li`, and the document's default block otherwise. It keeps the
/// original's `dir`.
pub fn split_block(
    doc: &mut Document,
    block: NodeId,
    node: NodeId,
    offset: usize,
    root: NodeId,
) -> Result<NodeId, RangeError> {
    let (tag, attrs) = match doc.tag(block) {
        Some(Tag::Dt) => (Tag::Dd, Attributes::new()),
        Some(Tag::Dd) => (Tag::Dt, Attributes::new()),
        Some(Tag::Li) => (Tag::Li, Attributes::new()),
        _ => {
            let template = doc.block_template();
            (template.tag.clone(), template.attributes.clone())
        }
    };
    let stop = doc.parent(block).unwrap_or(root);
    let after = match split(doc, node, offset, stop, root)? {
        Some(after) => after,
        None => {
            let fresh = doc.create_element(tag, attrs);
            let reference = doc.next_sibling(block);
            doc.insert_before(stop, fresh, reference)?;
            fix_cursor(doc, fresh, root);
            return Ok(fresh);
        }
    };
    if doc.has_tag_attributes(after, &tag, &attrs) {
        return Ok(after);
    }

    let dir = doc.attr(after, "dir").map(str::to_owned);
    let fresh = doc.create_element(tag, attrs);
    if let Some(dir) = dir {
        doc.set_attr(fresh, "dir", dir)?;
    }
    doc.replace_with(after, fresh)?;
    let content = doc.empty(after);
    doc.append_child(fresh, content)?;
    doc.remove(content);
    doc.remove(after);
    tracing::debug!(block = ?block, new = ?fresh, "split block");
    Ok(fresh)
}
