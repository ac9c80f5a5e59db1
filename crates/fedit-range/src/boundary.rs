#![forbid(unsafe_code)]

//! Boundary movement and block lookup.
//!
//! Ranges describe the same selection at many depths: `(p, 1)` and
//! `("ab", 2)` can denote one caret. Operations pick the depth that suits
//! them: deleting wants boundaries as high as possible to avoid splitting,
//! typing wants them down in text.

use fedit_dom::{Document, NodeId, NodeMask, Tag, TreeWalker, has_content};

use crate::position::{Position, Range};

/// Node ending just before `(node, offset)`, descending to the deepest
/// last child. Returns `node` itself when `offset` is 0 or `node` is text.
#[must_use]
pub fn get_node_before(doc: &Document, node: NodeId, offset: usize) -> NodeId {
    let mut node = node;
    let mut offset = offset;
    while offset > 0 && !doc.is_text(node) {
        let Some(child) = doc.child(node, offset - 1) else {
            break;
        };
        node = child;
        offset = doc.children(node).len();
    }
    node
}

/// Node starting just after `(node, offset)`. Past the last child this is
/// the next sibling of the nearest ancestor that has one, which may lie
/// outside the editing root.
#[must_use]
pub fn get_node_after(doc: &Document, node: NodeId, offset: usize) -> Option<NodeId> {
    if doc.is_text(node) {
        return Some(node);
    }
    if let Some(child) = doc.child(node, offset) {
        return Some(child);
    }
    doc.ancestors(node).find_map(|n| doc.next_sibling(n))
}

/// Push both boundaries down into the deepest containers they touch.
///
/// The end may step back over one trailing `br`. A collapsed range comes
/// back spanning from the end of the content before the caret to the start
/// of the content after it.
#[must_use]
pub fn move_boundaries_down(doc: &Document, range: Range) -> Range {
    let Range { start, end } = range;
    let (mut start_node, mut start_offset) = (start.node, start.offset);
    let (mut end_node, mut end_offset) = (end.node, end.offset);
    let mut may_skip_br = true;

    while !doc.is_text(start_node) {
        match doc.child(start_node, start_offset) {
            Some(child) if !doc.is_leaf(child) => {
                start_node = child;
                start_offset = 0;
            }
            _ => break,
        }
    }

    if end_offset > 0 {
        while !doc.is_text(end_node) {
            let child = end_offset.checked_sub(1).and_then(|i| doc.child(end_node, i));
            match child {
                Some(child) if !doc.is_leaf(child) => {
                    end_node = child;
                    end_offset = doc.length(child);
                }
                Some(child) if may_skip_br && doc.has_tag(child, &Tag::Br) => {
                    end_offset -= 1;
                    may_skip_br = false;
                }
                _ => break,
            }
        }
    } else {
        while let Some(child) = doc.first_child(end_node)
            && !doc.is_text(end_node)
            && !doc.is_leaf(child)
        {
            end_node = child;
        }
    }

    let start = Position::new(start_node, start_offset);
    let end = Position::new(end_node, end_offset);
    if range.is_collapsed() {
        range.set_start(doc, end).set_end(doc, start)
    } else {
        range.set_start(doc, start).set_end(doc, end)
    }
}

/// Lift both boundaries as high as they go without changing what is
/// selected.
///
/// The start climbs while it sits at offset 0; the end climbs while it sits
/// at the end of its container, first stepping over one `br`. Neither rises
/// past `root` or its limit. `start_max` defaults to the common ancestor and
/// `end_max` to `start_max`.
#[must_use]
pub fn move_boundaries_up(
    doc: &Document,
    range: Range,
    start_max: Option<NodeId>,
    end_max: Option<NodeId>,
    root: NodeId,
) -> Range {
    let start_max = start_max.or_else(|| range.common_ancestor(doc));
    let end_max = end_max.or(start_max);
    let Range { start, end } = range;
    let (mut start_node, mut start_offset) = (start.node, start.offset);
    let (mut end_node, mut end_offset) = (end.node, end.offset);
    let mut may_skip_br = true;

    while start_offset == 0
        && Some(start_node) != start_max
        && start_node != root
        && let Some(up) = Position::before(doc, start_node)
    {
        start_node = up.node;
        start_offset = up.offset;
    }

    loop {
        if may_skip_br
            && !doc.is_text(end_node)
            && doc
                .child(end_node, end_offset)
                .is_some_and(|c| doc.has_tag(c, &Tag::Br))
        {
            end_offset += 1;
            may_skip_br = false;
        }
        if Some(end_node) == end_max || end_node == root || end_offset != doc.length(end_node) {
            break;
        }
        let Some(up) = Position::after(doc, end_node) else {
            break;
        };
        end_node = up.node;
        end_offset = up.offset;
    }

    range
        .set_start(doc, Position::new(start_node, start_offset))
        .set_end(doc, Position::new(end_node, end_offset))
}

/// First block the range at least partly covers.
#[must_use]
pub fn get_start_block(doc: &Document, range: &Range, root: NodeId) -> Option<NodeId> {
    let container = range.start.node;
    let block = if doc.is_inline(container) {
        doc.previous_block(container, root)
    } else if container != root && doc.is_block(container) {
        Some(container)
    } else {
        let before = get_node_before(doc, container, range.start.offset);
        doc.next_block(before, root)
    };
    block.filter(|&b| range.contains(doc, b, true))
}

/// Last block the range at least partly covers.
#[must_use]
pub fn get_end_block(doc: &Document, range: &Range, root: NodeId) -> Option<NodeId> {
    let container = range.end.node;
    let block = if doc.is_inline(container) {
        doc.previous_block(container, root)
    } else if container != root && doc.is_block(container) {
        Some(container)
    } else {
        let after = get_node_after(doc, container, range.end.offset)
            .filter(|&n| doc.contains(root, n))
            .unwrap_or_else(|| {
                let mut last = root;
                while let Some(child) = doc.last_child(last) {
                    last = child;
                }
                last
            });
        doc.previous_block(after, root)
    };
    block.filter(|&b| range.contains(doc, b, true))
}

fn is_content(doc: &Document, id: NodeId) -> bool {
    match doc.text(id) {
        Some(text) => has_content(text),
        None => doc.has_tag(id, &Tag::Img),
    }
}

fn content_walker(root: NodeId, current: NodeId) -> TreeWalker {
    let mut walker = TreeWalker::new(
        root,
        NodeMask::ELEMENT | NodeMask::TEXT,
        is_content as fn(&Document, NodeId) -> bool,
    );
    walker.set_current(current);
    walker
}

/// Whether nothing but whitespace precedes the start within its block.
#[must_use]
pub fn starts_at_block_boundary(doc: &Document, range: &Range, root: NodeId) -> bool {
    let Position { node, offset } = range.start;
    let after_cursor = if doc.is_text(node) {
        if offset > 0 {
            return false;
        }
        node
    } else {
        match get_node_after(doc, node, offset).filter(|&n| doc.contains(root, n)) {
            Some(after) => after,
            None => {
                let before = get_node_before(doc, node, offset);
                if doc.text_len(before) > 0 {
                    return false;
                }
                before
            }
        }
    };
    let block = get_start_block(doc, range, root).unwrap_or(root);
    content_walker(block, after_cursor).previous_node(doc).is_none()
}

/// Whether nothing but whitespace follows the end within its block.
#[must_use]
pub fn ends_at_block_boundary(doc: &Document, range: &Range, root: NodeId) -> bool {
    let Position { node, offset } = range.end;
    let current = if doc.is_text(node) {
        let length = doc.text_len(node);
        if length > 0 && offset < length {
            return false;
        }
        node
    } else {
        get_node_before(doc, node, offset)
    };
    let block = get_end_block(doc, range, root).unwrap_or(root);
    content_walker(block, current).next_node(doc).is_none()
}

/// Widen the range to cover its start and end blocks whole.
///
/// Left unchanged when either end has no block.
#[must_use]
pub fn expand_to_block_boundaries(doc: &Document, range: Range, root: NodeId) -> Range {
    let start = get_start_block(doc, &range, root).and_then(|b| Position::before(doc, b));
    let end = get_end_block(doc, &range, root).and_then(|b| Position::after(doc, b));
    match (start, end) {
        (Some(start), Some(end)) => range.set_start(doc, start).set_end(doc, end),
        _ => range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedit_dom::parse_fragment;

    fn load(markup: &str) -> Document {
        let mut doc = Document::new();
        let root = doc.root();
        let frag = parse_fragment(&mut doc, markup).unwrap();
        doc.append_child(root, frag).unwrap();
        doc
    }

    fn text(doc: &Document, n: usize) -> NodeId {
        doc.descendants(doc.root())
            .filter(|&id| doc.is_text(id))
            .nth(n)
            .unwrap()
    }

    #[test]
    fn node_before_and_after() {
        let doc = load("<p><b>ab</b>cd</p><p>ef</p>");
        let root = doc.root();
        let p = doc.first_child(root).unwrap();
        assert_eq!(get_node_before(&doc, p, 1), text(&doc, 0));
        assert_eq!(get_node_before(&doc, p, 0), p);
        assert_eq!(get_node_after(&doc, p, 1), Some(text(&doc, 1)));
        assert_eq!(get_node_after(&doc, p, 2), doc.child(root, 1));
        assert_eq!(get_node_after(&doc, root, 2), None);
    }

    #[test]
    fn down_lands_in_text() {
        let doc = load("<p><b>ab</b>cd</p>");
        let p = doc.first_child(doc.root()).unwrap();
        let r = move_boundaries_down(&doc, Range::new(Position::new(p, 0), Position::new(p, 2)));
        assert_eq!(r.start, Position::new(text(&doc, 0), 0));
        assert_eq!(r.end, Position::new(text(&doc, 1), 2));
    }

    #[test]
    fn down_skips_one_trailing_br() {
        let doc = load("<p>ab<br></p>");
        let p = doc.first_child(doc.root()).unwrap();
        let r = move_boundaries_down(&doc, Range::new(Position::new(p, 0), Position::new(p, 2)));
        assert_eq!(r.end, Position::new(text(&doc, 0), 2));
    }

    #[test]
    fn down_from_caret_spans_neighbours() {
        let doc = load("<p>ab<i>cd</i></p>");
        let p = doc.first_child(doc.root()).unwrap();
        let r = move_boundaries_down(&doc, Range::collapsed(Position::new(p, 1)));
        assert_eq!(r.start, Position::new(text(&doc, 0), 2));
        assert_eq!(r.end, Position::new(text(&doc, 1), 0));
    }

    #[test]
    fn up_stops_at_limits() {
        let doc = load("<div><p><b>ab</b></p><p>cd</p></div>");
        let root = doc.root();
        let div = doc.first_child(root).unwrap();
        let r = Range::new(Position::new(text(&doc, 0), 0), Position::new(text(&doc, 1), 2));
        let up = move_boundaries_up(&doc, r, None, None, root);
        assert_eq!(up.start, Position::new(div, 0));
        assert_eq!(up.end, Position::new(div, 2));
        let p1 = doc.child(div, 0).unwrap();
        let p2 = doc.child(div, 1).unwrap();
        let held = move_boundaries_up(&doc, r, Some(p1), Some(p2), root);
        assert_eq!(held.start, Position::new(p1, 0));
        assert_eq!(held.end, Position::new(p2, 1));
    }

    #[test]
    fn up_steps_over_br() {
        let doc = load("<p>ab<br></p>");
        let root = doc.root();
        let p = doc.first_child(root).unwrap();
        let r = Range::new(Position::new(text(&doc, 0), 1), Position::new(p, 1));
        let up = move_boundaries_up(&doc, r, None, None, root);
        assert_eq!(up.end, Position::new(p, 2));
        let up = move_boundaries_up(&doc, r, None, Some(root), root);
        assert_eq!(up.end, Position::new(root, 1));
        assert_eq!(up.start, Position::new(text(&doc, 0), 1));
    }

    #[test]
    fn start_and_end_blocks() {
        let doc = load("<p>ab</p><blockquote><p>cd</p></blockquote><p>ef</p>");
        let root = doc.root();
        let p1 = doc.child(root, 0).unwrap();
        let p3 = doc.child(root, 2).unwrap();
        let r = Range::new(Position::new(text(&doc, 0), 1), Position::new(text(&doc, 2), 1));
        assert_eq!(get_start_block(&doc, &r, root), Some(p1));
        assert_eq!(get_end_block(&doc, &r, root), Some(p3));
        let all = Range::select_node_contents(&doc, root);
        assert_eq!(get_start_block(&doc, &all, root), Some(p1));
        assert_eq!(get_end_block(&doc, &all, root), Some(p3));
        let quote = doc.child(root, 1).unwrap();
        let inner = doc.first_child(quote).unwrap();
        let at_quote = Range::collapsed(Position::new(quote, 0));
        assert_eq!(get_start_block(&doc, &at_quote, root), None);
        let r = Range::new(Position::new(quote, 0), Position::new(quote, 1));
        assert_eq!(get_start_block(&doc, &r, root), Some(inner));
        assert_eq!(get_end_block(&doc, &r, root), Some(inner));
    }

    #[test]
    fn block_boundary_checks() {
        let doc = load("<p> <b>ab</b>cd</p>");
        let root = doc.root();
        let ab = text(&doc, 1);
        let cd = text(&doc, 2);
        assert!(starts_at_block_boundary(&doc, &Range::collapsed(Position::new(ab, 0)), root));
        assert!(!starts_at_block_boundary(&doc, &Range::collapsed(Position::new(ab, 1)), root));
        assert!(!starts_at_block_boundary(&doc, &Range::collapsed(Position::new(cd, 0)), root));
        assert!(ends_at_block_boundary(&doc, &Range::collapsed(Position::new(cd, 2)), root));
        assert!(!ends_at_block_boundary(&doc, &Range::collapsed(Position::new(ab, 2)), root));
    }

    #[test]
    fn image_counts_as_content() {
        let doc = load("<p><img src=\"x\">ab</p>");
        let root = doc.root();
        let ab = text(&doc, 0);
        assert!(!starts_at_block_boundary(&doc, &Range::collapsed(Position::new(ab, 0)), root));
    }

    #[test]
    fn expand_covers_whole_blocks() {
        let doc = load("<p>ab</p><p>cd</p><p>ef</p>");
        let root = doc.root();
        let r = Range::new(Position::new(text(&doc, 0), 1), Position::new(text(&doc, 1), 1));
        let wide = expand_to_block_boundaries(&doc, r, root);
        assert_eq!(wide.start, Position::new(root, 0));
        assert_eq!(wide.end, Position::new(root, 2));
    }
}
