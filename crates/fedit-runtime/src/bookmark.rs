#![forbid(unsafe_code)]

//! Selection bookmarks.
//!
//! A bookmark is a pair of hidden `input` sentinels placed at the selection
//! boundaries. They survive serialization, so a checkpoint carries its own
//! selection, and they survive tree surgery that would invalidate plain
//! positions. Every save must be matched by a [`range_from_bookmark`], which
//! removes both sentinels again.

use std::cmp::Ordering;

use fedit_dom::{Attributes, Document, NodeId, Tag};
use fedit_range::{Position, Range, RangeError, compare_points, insert_node_in_range, merge_inlines};

/// `id` of the sentinel marking the selection start.
pub const START_SELECTION_ID: &str = "fedit-selection-start";
/// `id` of the sentinel marking the selection end.
pub const END_SELECTION_ID: &str = "fedit-selection-end";

fn sentinel(doc: &mut Document, id: &str) -> NodeId {
    let attrs: Attributes = [("id", id), ("type", "hidden")].into_iter().collect();
    doc.create_element(Tag::Input, attrs)
}

/// Whether `node` is one of the two bookmark sentinels.
#[must_use]
pub fn is_bookmark(doc: &Document, node: NodeId) -> bool {
    doc.has_tag(node, &Tag::Input)
        && matches!(
            doc.attr(node, "id"),
            Some(START_SELECTION_ID | END_SELECTION_ID)
        )
}

fn find_sentinel(doc: &Document, root: NodeId, id: &str) -> Option<NodeId> {
    doc.descendants(root)
        .find(|&n| doc.has_tag(n, &Tag::Input) && doc.attr(n, "id") == Some(id))
}

/// Insert the sentinels at the boundaries of `range` and return the range
/// between them.
pub fn save_range_to_bookmark(doc: &mut Document, range: Range) -> Result<Range, RangeError> {
    let mut start = sentinel(doc, START_SELECTION_ID);
    let mut end = sentinel(doc, END_SELECTION_ID);

    let range = insert_node_in_range(doc, range, start)?;
    insert_node_in_range(doc, range.collapse(false), end)?;

    let (Some(start_at), Some(end_at)) = (Position::before(doc, start), Position::before(doc, end))
    else {
        return Err(RangeError::Stale { node: start });
    };
    // A caret can end up with the end sentinel placed first.
    if compare_points(doc, end_at, start_at) == Ordering::Less {
        doc.set_attr(start, "id", END_SELECTION_ID)?;
        doc.set_attr(end, "id", START_SELECTION_ID)?;
        std::mem::swap(&mut start, &mut end);
    }

    match (Position::after(doc, start), Position::before(doc, end)) {
        (Some(from), Some(to)) => Ok(Range::new(from, to)),
        _ => Err(RangeError::Stale { node: start }),
    }
}

/// Remove the sentinels under `root` and return the range they marked.
///
/// Text split by the sentinels is joined back. A caret that ends up between
/// elements is moved into an adjacent text node. Returns `None`, removing
/// nothing, unless both sentinels are present.
pub fn range_from_bookmark(doc: &mut Document, root: NodeId) -> Option<Range> {
    let start = find_sentinel(doc, root, START_SELECTION_ID)?;
    let end = find_sentinel(doc, root, END_SELECTION_ID)?;

    let start_container = doc.parent(start)?;
    let end_container = doc.parent(end)?;
    let start_offset = doc.index_of(start)?;
    let mut end_offset = doc.index_of(end)?;
    if start_container == end_container {
        end_offset = end_offset.saturating_sub(1);
    }
    doc.remove(start);
    doc.remove(end);

    let mut range = Range::from_points(
        doc,
        Position::new(start_container, start_offset),
        Position::new(end_container, end_offset),
    );
    range = merge_inlines(doc, start_container, range);
    if start_container != end_container {
        range = merge_inlines(doc, end_container, range);
    }

    if range.is_collapsed() && !doc.is_text(range.start.node) {
        let Position { node, offset } = range.start;
        let after = doc.child(node, offset).filter(|&n| doc.is_text(n));
        let before = offset
            .checked_sub(1)
            .and_then(|i| doc.child(node, i))
            .filter(|&n| doc.is_text(n));
        if let Some(text) = after {
            range = Range::collapsed(Position::new(text, 0));
        } else if let Some(text) = before {
            range = Range::collapsed(Position::new(text, doc.text_len(text)));
        }
    }
    Some(range)
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

    fn first_text(doc: &Document) -> NodeId {
        doc.descendants(doc.root()).find(|&n| doc.is_text(n)).unwrap()
    }

    #[test]
    fn sentinels_serialize_around_selection() {
        let mut doc = load("<p>abcd</p>");
        let text = first_text(&doc);
        let range = Range::new(Position::new(text, 1), Position::new(text, 3));
        save_range_to_bookmark(&mut doc, range).unwrap();
        assert_eq!(
            serialize_children(&doc, doc.root()),
            "<p>a<input id=\"fedit-selection-start\" type=\"hidden\">bc\
             <input id=\"fedit-selection-end\" type=\"hidden\">d</p>"
        );
    }

    #[test]
    fn round_trip_restores_text_selection() {
        let mut doc = load("<p>abcd</p>");
        let root = doc.root();
        let text = first_text(&doc);
        let range = Range::new(Position::new(text, 1), Position::new(text, 3));
        save_range_to_bookmark(&mut doc, range).unwrap();

        let restored = range_from_bookmark(&mut doc, root).unwrap();
        assert_eq!(serialize_children(&doc, root), "<p>abcd</p>");
        let text = first_text(&doc);
        assert_eq!(restored, Range::new(Position::new(text, 1), Position::new(text, 3)));
    }

    #[test]
    fn caret_round_trip() {
        let mut doc = load("<p>abcd</p>");
        let root = doc.root();
        let text = first_text(&doc);
        save_range_to_bookmark(&mut doc, Range::collapsed(Position::new(text, 2))).unwrap();
        assert!(find_sentinel(&doc, root, START_SELECTION_ID).is_some());

        let restored = range_from_bookmark(&mut doc, root).unwrap();
        let text = first_text(&doc);
        assert!(restored.is_collapsed());
        assert_eq!(restored.start, Position::new(text, 2));
        assert!(doc.descendants(root).all(|n| !is_bookmark(&doc, n)));
    }

    #[test]
    fn caret_between_elements_moves_into_text() {
        let mut doc = load("<p><b>ab</b>cd</p>");
        let root = doc.root();
        let p = doc.first_child(root).unwrap();
        save_range_to_bookmark(&mut doc, Range::collapsed(Position::new(p, 1))).unwrap();
        let restored = range_from_bookmark(&mut doc, root).unwrap();
        let cd = doc.child(p, 1).unwrap();
        assert_eq!(restored.start, Position::new(cd, 0));
    }

    #[test]
    fn survives_markup_round_trip() {
        let mut doc = load("<p>one</p><p>two</p>");
        let root = doc.root();
        let texts: Vec<NodeId> = doc.descendants(root).filter(|&n| doc.is_text(n)).collect();
        let range = Range::new(Position::new(texts[0], 1), Position::new(texts[1], 2));
        save_range_to_bookmark(&mut doc, range).unwrap();
        let markup = serialize_children(&doc, root);

        let mut copy = Document::new();
        let copy_root = copy.root();
        let frag = parse_fragment(&mut copy, &markup).unwrap();
        copy.append_child(copy_root, frag).unwrap();
        let restored = range_from_bookmark(&mut copy, copy_root).unwrap();

        assert_eq!(serialize_children(&copy, copy_root), "<p>one</p><p>two</p>");
        assert_eq!(copy.text(restored.start.node), Some("one"));
        assert_eq!(restored.start.offset, 1);
        assert_eq!(copy.text(restored.end.node), Some("two"));
        assert_eq!(restored.end.offset, 2);
    }

    #[test]
    fn missing_end_sentinel_leaves_tree_alone() {
        let mut doc = load("<p>a<input id=\"fedit-selection-start\" type=\"hidden\">b</p>");
        let root = doc.root();
        assert!(range_from_bookmark(&mut doc, root).is_none());
        assert!(find_sentinel(&doc, root, START_SELECTION_ID).is_some());
    }
}
