#![forbid(unsafe_code)]

//! Composite range operations: insert, extract, delete, and fragment
//! insertion.

use fedit_dom::{Attributes, Document, NodeId, Tag, ZWS};

use crate::boundary::{get_end_block, get_start_block, move_boundaries_down, move_boundaries_up};
use crate::error::RangeError;
use crate::mutate::{fix_cursor, merge_containers, merge_inlines, merge_with_block, split};
use crate::position::{Position, Range};

/// Insert `node` (or a fragment's children) at the start of `range`,
/// splitting a text boundary if needed.
///
/// The returned range spans the inserted content when `range` was a caret,
/// and otherwise keeps its end on the same content as before.
pub fn insert_node_in_range(
    doc: &mut Document,
    range: Range,
    node: NodeId,
) -> Result<Range, RangeError> {
    range.validate(doc)?;
    let collapsed = range.is_collapsed();
    let Range { start, end } = range;
    let (mut start_node, mut start_offset) = (start.node, start.offset);
    let (mut end_node, mut end_offset) = (end.node, end.offset);

    if doc.is_text(start_node) {
        let parent = doc
            .parent(start_node)
            .ok_or(RangeError::Stale { node: start_node })?;
        if start_offset == doc.text_len(start_node) {
            start_offset = doc.index_of(start_node).unwrap_or(0) + 1;
            if collapsed {
                end_node = parent;
                end_offset = start_offset;
            }
        } else {
            if start_offset > 0 {
                let after = doc.split_text(start_node, start_offset)?;
                if end_node == start_node {
                    end_offset = end_offset.saturating_sub(start_offset);
                    end_node = after;
                } else if end_node == parent {
                    end_offset += 1;
                }
                start_node = after;
            }
            start_offset = doc.index_of(start_node).unwrap_or(0);
        }
        start_node = parent;
    }

    let before = doc.children(start_node).len();
    let reference = doc.child(start_node, start_offset);
    doc.insert_before(start_node, node, reference)?;
    if start_node == end_node {
        end_offset += doc.children(start_node).len() - before;
    }

    Ok(Range::from_points(
        doc,
        Position::new(start_node, start_offset),
        Position::new(end_node, end_offset),
    ))
}

/// Move everything between the boundaries of `range` into a new fragment.
///
/// Both boundaries are split up to `common` (by default the range's common
/// ancestor, or its parent when that is text). Text exposed on both sides
/// of the seam is joined, and the returned caret sits at the seam.
pub fn extract_contents(
    doc: &mut Document,
    range: Range,
    common: Option<NodeId>,
    root: NodeId,
) -> Result<(NodeId, Range), RangeError> {
    range.validate(doc)?;
    let common = match common.or_else(|| range.common_ancestor(doc)) {
        Some(common) => common,
        None => return Err(RangeError::Stale { node: range.end.node }),
    };
    let common = if doc.is_text(common) {
        doc.parent(common).ok_or(RangeError::Stale { node: common })?
    } else {
        common
    };
    let _span = tracing::debug_span!("fedit.range.extract", common = ?common).entered();

    let end_node = split(doc, range.end.node, range.end.offset, common, root)?;
    let mut start_node = split(doc, range.start.node, range.start.offset, common, root)?;
    let frag = doc.create_fragment();
    while start_node != end_node {
        let Some(node) = start_node else {
            break;
        };
        start_node = doc.next_sibling(node);
        doc.append_child(frag, node)?;
    }

    let offset = end_node
        .and_then(|n| doc.index_of(n))
        .unwrap_or_else(|| doc.length(common));
    let mut caret = Position::new(common, offset);

    // Adjacent text would leave two carets at one visual spot.
    if let Some(after) = doc.child(common, offset)
        && let Some(before) = doc.previous_sibling(after)
        && doc.is_text(before)
        && let Some(text) = doc.text(after).map(str::to_owned)
    {
        caret = Position::new(before, doc.text_len(before));
        doc.append_text(before, &text)?;
        doc.remove(after);
    }

    fix_cursor(doc, common, root);
    tracing::debug!(extracted = doc.length(frag), "extracted range contents");
    Ok((frag, Range::collapsed(caret)))
}

/// Delete the contents of `range` and join the blocks it started and ended
/// in. Returns the removed content and the caret where it was.
///
/// Afterwards `root` always holds at least one block.
pub fn delete_contents(
    doc: &mut Document,
    range: Range,
    root: NodeId,
) -> Result<(NodeId, Range), RangeError> {
    range.validate(doc)?;
    if range.is_collapsed() {
        return Ok((doc.create_fragment(), range));
    }
    let _span = tracing::debug_span!("fedit.range.delete").entered();
    let start_block = get_start_block(doc, &range, root);
    let end_block = get_end_block(doc, &range, root);
    let needs_merge = start_block != end_block;

    let range = move_boundaries_down(doc, range);
    let range = move_boundaries_up(doc, range, start_block, end_block, root);
    let (frag, range) = extract_contents(doc, range, None, root)?;
    let mut range = move_boundaries_down(doc, range);

    if needs_merge
        && let Some(start) = start_block
        && doc.is_alive(start)
        && let Some(end) = get_end_block(doc, &range, root)
        && end != start
    {
        range = merge_with_block(doc, start, end, root)?;
    }

    if let Some(start) = start_block
        && doc.is_alive(start)
    {
        fix_cursor(doc, start, root);
    }

    let first = doc.first_child(root);
    let range = if first.is_none_or(|f| doc.has_tag(f, &Tag::Br)) {
        fix_cursor(doc, root, root);
        match doc.first_child(root) {
            Some(block) => Range::select_node_contents(doc, block),
            None => Range::collapsed(Position::new(root, 0)),
        }
    } else {
        range.collapse(true)
    };
    Ok((frag, range))
}

/// Whether `node` shows nothing: no text beyond whitespace and cursor
/// placeholders, and no leaf other than a line break.
fn is_blank(doc: &Document, node: NodeId) -> bool {
    doc.text_content(node)
        .chars()
        .all(|c| c.is_whitespace() || c == ZWS)
        && !doc
            .descendants(node)
            .any(|n| doc.is_leaf(n) && !doc.has_tag(n, &Tag::Br))
}

/// Remove `node`, then each ancestor below `root` that this leaves empty.
fn remove_blank_chain(doc: &mut Document, node: NodeId, root: NodeId) {
    let mut node = node;
    loop {
        let parent = doc.parent(node);
        doc.remove(node);
        match parent {
            Some(parent) if parent != root && doc.first_child(parent).is_none() => node = parent,
            _ => break,
        }
    }
}

fn attached(doc: &Document, node: NodeId, root: NodeId) -> bool {
    doc.is_alive(node) && doc.contains(root, node)
}

/// Insert the content of `frag` at `range`, replacing any selection.
///
/// Inline-only content goes in at the caret and is merged with its
/// neighbours. Block content splits the tree up to the nearest quote (or
/// `root`); leading and trailing inline runs of the fragment join the text
/// on either side of the split, and empty blocks left at the seams are
/// dropped. The returned range covers the inserted content, or is a caret
/// after it for inline content.
///
/// `frag` is consumed.
pub fn insert_fragment(
    doc: &mut Document,
    range: Range,
    frag: NodeId,
    root: NodeId,
) -> Result<Range, RangeError> {
    range.validate(doc)?;
    let _span = tracing::debug_span!("fedit.range.insert_fragment").entered();
    let all_inline = doc.children(frag).iter().all(|&c| doc.is_inline(c));

    let mut range = range;
    if !range.is_collapsed() {
        let (deleted, caret) = delete_contents(doc, range, root)?;
        doc.remove(deleted);
        range = caret;
    }
    let range = move_boundaries_down(doc, range);

    if all_inline {
        let mut range = insert_node_in_range(doc, range, frag)?;
        doc.remove(frag);
        if range.start.node != range.end.node {
            range = merge_inlines(doc, range.end.node, range);
        }
        range = merge_inlines(doc, range.start.node, range);
        tracing::debug!("inserted inline fragment");
        return Ok(range.collapse(false));
    }

    // Split up to the nearest quote, or the root.
    let split_point = range.start.node;
    let stop = doc
        .parent(split_point)
        .and_then(|p| doc.get_nearest(p, root, &Tag::Blockquote, &Attributes::new()))
        .unwrap_or(root);
    let after_split = split(doc, split_point, range.start.offset, stop, root)?;
    let node_after = match after_split {
        Some(node) => node,
        None => {
            let block = doc.create_default_block();
            fix_cursor(doc, block, root);
            doc.append_child(stop, block)?;
            block
        }
    };
    let mut node_before = match doc.previous_sibling(node_after) {
        Some(node) => node,
        None => {
            let block = doc.create_default_block();
            fix_cursor(doc, block, root);
            doc.insert_before(stop, block, Some(node_after))?;
            block
        }
    };

    // Step into the edges either side of the split.
    let mut start_node = node_before;
    let mut start_offset = doc.length(start_node);
    while let Some(child) = doc.last_child(start_node)
        && doc.is_element(child)
    {
        if doc.has_tag(child, &Tag::Br) {
            start_offset = start_offset.saturating_sub(1);
            break;
        }
        if doc.is_leaf(child) {
            break;
        }
        start_node = child;
        start_offset = doc.length(child);
    }
    let mut end_node = node_after;
    let mut end_offset = 0;
    while let Some(child) = doc.first_child(end_node)
        && doc.is_element(child)
        && !doc.is_leaf(child)
    {
        end_node = child;
    }

    // Inline runs at the edges of the fragment join the flanking text.
    let start_anchor = doc.child(start_node, start_offset);
    while let Some(child) = doc.first_child(frag)
        && doc.is_inline(child)
    {
        doc.insert_before(start_node, child, start_anchor)?;
    }
    while let Some(child) = doc.last_child(frag)
        && doc.is_inline(child)
    {
        let first = doc.first_child(end_node);
        doc.insert_before(end_node, child, first)?;
        end_offset += 1;
    }

    let mut node = frag;
    while let Some(block) = doc.next_block(node, root) {
        fix_cursor(doc, block, root);
        node = block;
    }
    doc.insert_before(stop, frag, Some(node_after))?;
    doc.remove(frag);

    // Drop empty blocks left at either seam, then merge like containers.
    let next = doc.next_sibling(node_before).unwrap_or(node_after);
    if let Some(block) = doc.previous_block(next, root)
        && is_blank(doc, block)
    {
        remove_blank_chain(doc, block, root);
    }
    if !attached(doc, node_before, root) {
        node_before = doc.previous_sibling(next).unwrap_or(next);
    }
    if !attached(doc, start_node, root) {
        match doc.previous_sibling(next) {
            Some(before) => {
                start_node = before;
                start_offset = doc.length(before);
            }
            None => {
                start_node = doc.parent(next).unwrap_or(root);
                start_offset = 0;
            }
        }
    }
    if attached(doc, next, root) && doc.is_container(next) {
        merge_containers(doc, next, root)?;
    }

    let prev = doc.previous_sibling(node_after);
    let trailing = if doc.is_block(node_after) {
        Some(node_after)
    } else {
        doc.next_block(node_after, root)
    };
    if let Some(block) = trailing
        && is_blank(doc, block)
    {
        remove_blank_chain(doc, block, root);
    }
    let node_after = if attached(doc, node_after, root) {
        Some(node_after)
    } else {
        prev.and_then(|p| doc.next_sibling(p))
    };
    if end_offset == 0
        && let Some(prev) = prev
    {
        end_node = prev;
        end_offset = doc.length(prev);
    }
    if let Some(after) = node_after
        && doc.is_container(after)
    {
        merge_containers(doc, after, root)?;
    }

    let within = |doc: &Document, p: Position| attached(doc, p.node, root) && p.is_valid(doc);
    let mut start = Position::new(start_node, start_offset);
    let mut end = Position::new(end_node, end_offset);
    if !within(doc, start) {
        start = Position::new(root, 0);
    }
    if !within(doc, end) {
        end = start;
    }
    tracing::debug!(before = ?node_before, "inserted block fragment");
    Ok(move_boundaries_down(doc, Range::from_points(doc, start, end)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedit_dom::{parse_fragment, serialize_children};

    fn load(markup: &str) -> Document {
        let mut doc = Document::new();
        let root = doc.root();
        let frag = parse_fragment(&mut doc, markup).unwrap();
        doc.append_child(root, frag).unwrap();
        doc
    }

    fn html(doc: &Document) -> String {
        serialize_children(doc, doc.root())
    }

    fn text(doc: &Document, n: usize) -> NodeId {
        doc.descendants(doc.root())
            .filter(|&id| doc.is_text(id))
            .nth(n)
            .unwrap()
    }

    #[test]
    fn insert_node_splits_text() {
        let mut doc = load("<p>abcd</p>");
        let p = doc.first_child(doc.root()).unwrap();
        let t = text(&doc, 0);
        let img = doc.create_element(Tag::Img, Attributes::new());
        let r = insert_node_in_range(&mut doc, Range::collapsed(Position::new(t, 2)), img).unwrap();
        assert_eq!(html(&doc), "<p>ab<img>cd</p>");
        assert_eq!(r.start, Position::new(p, 1));
        assert_eq!(r.end, Position::new(text(&doc, 1), 0));
    }

    #[test]
    fn insert_node_at_text_end_selects_it() {
        let mut doc = load("<p>ab</p>");
        let p = doc.first_child(doc.root()).unwrap();
        let t = text(&doc, 0);
        let br = doc.create_element(Tag::Br, Attributes::new());
        let r = insert_node_in_range(&mut doc, Range::collapsed(Position::new(t, 2)), br).unwrap();
        assert_eq!(html(&doc), "<p>ab<br></p>");
        assert_eq!(r, Range::new(Position::new(p, 1), Position::new(p, 2)));
    }

    #[test]
    fn extract_middle_of_text() {
        let mut doc = load("<p>abcdef</p>");
        let root = doc.root();
        let t = text(&doc, 0);
        let r = Range::new(Position::new(t, 1), Position::new(t, 4));
        let (frag, caret) = extract_contents(&mut doc, r, None, root).unwrap();
        assert_eq!(html(&doc), "<p>aef</p>");
        assert_eq!(serialize_children(&doc, frag), "bcd");
        assert_eq!(caret, Range::collapsed(Position::new(text(&doc, 0), 1)));
    }

    #[test]
    fn delete_across_blocks_merges_them() {
        let mut doc = load("<p>one</p><p>two</p>");
        let root = doc.root();
        let r = Range::new(Position::new(text(&doc, 0), 1), Position::new(text(&doc, 1), 1));
        let (frag, caret) = delete_contents(&mut doc, r, root).unwrap();
        assert_eq!(html(&doc), "<p>owo</p>");
        assert_eq!(serialize_children(&doc, frag), "<p>ne</p><p>t</p>");
        assert_eq!(caret, Range::collapsed(Position::new(text(&doc, 0), 1)));
    }

    #[test]
    fn delete_everything_leaves_one_block() {
        let mut doc = load("<p>one</p><p>two</p>");
        let root = doc.root();
        let all = Range::select_node_contents(&doc, root);
        let (_, caret) = delete_contents(&mut doc, all, root).unwrap();
        assert_eq!(html(&doc), "<p><br></p>");
        let p = doc.first_child(root).unwrap();
        assert_eq!(caret, Range::collapsed(Position::new(p, 0)));
    }

    #[test]
    fn delete_rejects_stale_range() {
        let mut doc = load("<p>one</p>");
        let root = doc.root();
        let t = text(&doc, 0);
        doc.remove(t);
        let err = delete_contents(&mut doc, Range::collapsed(Position::new(t, 0)), root);
        assert_eq!(err.unwrap_err(), RangeError::Stale { node: t });
    }

    #[test]
    fn inline_fragment_merges_with_neighbours() {
        let mut doc = load("<p>abcd</p>");
        let root = doc.root();
        let t = text(&doc, 0);
        let frag = parse_fragment(&mut doc, "<b>x</b>y").unwrap();
        let r = insert_fragment(&mut doc, Range::collapsed(Position::new(t, 2)), frag, root).unwrap();
        assert_eq!(html(&doc), "<p>ab<b>x</b>ycd</p>");
        assert_eq!(r, Range::collapsed(Position::new(text(&doc, 2), 1)));
        assert!(!doc.is_alive(frag));
    }

    #[test]
    fn block_fragment_splits_paragraph() {
        let mut doc = load("<p>abcd</p>");
        let root = doc.root();
        let t = text(&doc, 0);
        let frag = parse_fragment(&mut doc, "<h1>X</h1>").unwrap();
        let r = insert_fragment(&mut doc, Range::collapsed(Position::new(t, 2)), frag, root).unwrap();
        assert_eq!(html(&doc), "<p>ab</p><h1>X</h1><p>cd</p>");
        let p = doc.first_child(root).unwrap();
        assert_eq!(r.start, Position::new(p, 1));
        assert_eq!(r.end, Position::new(text(&doc, 1), 1));
    }

    #[test]
    fn block_fragment_at_end_leaves_no_empty_block() {
        let mut doc = load("<p>abcd</p>");
        let root = doc.root();
        let t = text(&doc, 0);
        let frag = parse_fragment(&mut doc, "<h1>X</h1>").unwrap();
        insert_fragment(&mut doc, Range::collapsed(Position::new(t, 4)), frag, root).unwrap();
        assert_eq!(html(&doc), "<p>abcd</p><h1>X</h1>");
    }

    #[test]
    fn block_fragment_after_formatted_run_leaves_no_placeholder_block() {
        let mut doc = load("<div><b>abc</b></div>");
        let root = doc.root();
        let t = text(&doc, 0);
        let frag = parse_fragment(&mut doc, "<h1>X</h1>").unwrap();
        let r = insert_fragment(&mut doc, Range::collapsed(Position::new(t, 3)), frag, root).unwrap();
        assert_eq!(html(&doc), "<div><b>abc</b></div><h1>X</h1>");
        assert!(r.is_within(&doc, root));
    }

    #[test]
    fn block_fragment_before_formatted_run_leaves_no_placeholder_block() {
        let mut doc = load("<div><b>abc</b></div>");
        let root = doc.root();
        let t = text(&doc, 0);
        let frag = parse_fragment(&mut doc, "<h1>X</h1>").unwrap();
        let r = insert_fragment(&mut doc, Range::collapsed(Position::new(t, 0)), frag, root).unwrap();
        assert_eq!(html(&doc), "<h1>X</h1><div><b>abc</b></div>");
        assert!(r.is_within(&doc, root));
    }

    #[test]
    fn placeholder_only_block_is_blank() {
        let mut doc = load("<div><b>\u{200B}</b></div><div><img></div>");
        let root = doc.root();
        let first = doc.child(root, 0).unwrap();
        let second = doc.child(root, 1).unwrap();
        assert!(is_blank(&doc, first));
        assert!(!is_blank(&doc, second));
    }

    #[test]
    fn cut_and_paste_across_formatted_blocks() {
        let mut doc = load("<div><b>ab</b>cd</div><div>ef</div>");
        let root = doc.root();
        let r = Range::new(Position::new(text(&doc, 0), 1), Position::new(text(&doc, 2), 1));
        let (frag, caret) = delete_contents(&mut doc, r, root).unwrap();
        assert_eq!(html(&doc), "<div><b>a</b>f</div>");
        insert_fragment(&mut doc, caret, frag, root).unwrap();

        let blocks: Vec<String> = doc
            .children(root)
            .iter()
            .map(|&b| doc.text_content(b).replace(ZWS, ""))
            .collect();
        assert_eq!(blocks, ["a", "bcd", "e", "f"]);
        assert!(doc.children(root).iter().all(|&b| !is_blank(&doc, b)));
    }

    #[test]
    fn block_fragment_hoists_edge_inlines() {
        let mut doc = load("<p>abcd</p>");
        let root = doc.root();
        let t = text(&doc, 0);
        let frag = parse_fragment(&mut doc, "x<h1>Y</h1>z").unwrap();
        insert_fragment(&mut doc, Range::collapsed(Position::new(t, 2)), frag, root).unwrap();
        assert_eq!(html(&doc), "<p>abx</p><h1>Y</h1><p>zcd</p>");
    }

    #[test]
    fn lists_merge_at_seams() {
        let mut doc = load("<ul><li>a</li></ul><p>b</p>");
        let root = doc.root();
        let p = doc.child(root, 1).unwrap();
        let frag = parse_fragment(&mut doc, "<ul><li>x</li></ul>").unwrap();
        insert_fragment(&mut doc, Range::collapsed(Position::new(p, 0)), frag, root).unwrap();
        assert_eq!(html(&doc), "<ul><li>a</li><li>x</li></ul><p>b</p>");
    }
}
