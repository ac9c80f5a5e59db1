#![forbid(unsafe_code)]

//! Structural tree mutators.
//!
//! These are the building blocks every range operation reduces to: splitting
//! a subtree at a point, merging like siblings back together, and the two
//! normalizations that keep the tree editable (`fix_cursor` for focusable
//! content, `fix_container` for the no-mixed-children rule).
//!
//! Any function here that can move content across a caller's range takes
//! that range by value and returns the rewritten one.

use fedit_dom::{Attributes, Document, NodeId, Tag, TagFlags, ZWS};

use crate::error::RangeError;
use crate::position::{Position, Range};

// ============================================================================
// Normalization
// ============================================================================

/// Whether `node` holds something a caret can sit next to: non-empty text or
/// a leaf element.
fn has_focusable_content(doc: &Document, node: NodeId) -> bool {
    doc.descendants(node)
        .any(|n| doc.is_leaf(n) || doc.text(n).is_some_and(|t| !t.is_empty()))
}

/// Make `node` focusable if it is empty.
///
/// - `root` with no children, or only a leading `br`, gets a default block.
/// - An inline element loses its leading empty text and, if nothing is
///   left, receives a zero-width placeholder.
/// - A block or container with no focusable content receives a `br` at the
///   bottom of its last non-inline descendant.
///
/// Nodes that already satisfy this are left untouched. A rejected filler is
/// reported to the document's error sink and otherwise ignored.
pub fn fix_cursor(doc: &mut Document, node: NodeId, root: NodeId) -> NodeId {
    let original = node;
    let mut node = node;

    if node == root {
        let first = doc.first_child(node);
        if first.is_none_or(|f| doc.has_tag(f, &Tag::Br)) {
            let block = doc.create_default_block();
            let placed = match first {
                Some(br) => doc.replace_with(br, block).map(|()| Some(br)),
                None => doc.append_child(node, block).map(|()| None),
            };
            match placed {
                Ok(replaced) => {
                    if let Some(br) = replaced {
                        doc.remove(br);
                    }
                    node = block;
                }
                Err(err) => {
                    doc.report(err);
                    doc.remove(block);
                }
            }
        }
    }

    if !doc.is_alive(node) || doc.is_text(node) {
        return original;
    }

    let mut target = node;
    let filler = if doc.is_inline(node) {
        while let Some(child) = doc.first_child(node)
            && doc.text(child).is_some_and(str::is_empty)
        {
            doc.remove(child);
        }
        doc.first_child(node)
            .is_none()
            .then(|| doc.create_text(ZWS.to_string()))
    } else if !has_focusable_content(doc, node) {
        while let Some(child) = doc
            .children(target)
            .iter()
            .rev()
            .copied()
            .find(|&c| doc.is_element(c))
            && !doc.is_inline(child)
        {
            target = child;
        }
        Some(doc.create_element(Tag::Br, Attributes::new()))
    } else {
        None
    };

    if let Some(filler) = filler
        && let Err(err) = doc.append_child(target, filler)
    {
        doc.report(err);
        doc.remove(filler);
    }
    original
}

/// Wrap every run of inline children of `container` in a default block and
/// recurse into child containers.
///
/// A `br` ends the current run: it is replaced by the wrapper built so far,
/// or dropped when no run precedes it.
pub fn fix_container(
    doc: &mut Document,
    container: NodeId,
    root: NodeId,
) -> Result<NodeId, RangeError> {
    let mut wrapper: Option<NodeId> = None;
    let mut i = 0;
    while let Some(child) = doc.child(container, i) {
        let is_br = doc.has_tag(child, &Tag::Br);
        if !is_br && doc.is_inline(child) {
            let block = match wrapper {
                Some(block) => block,
                None => {
                    let block = doc.create_default_block();
                    wrapper = Some(block);
                    block
                }
            };
            doc.append_child(block, child)?;
            continue;
        }
        match (wrapper.take(), is_br) {
            (Some(block), true) => {
                fix_cursor(doc, block, root);
                doc.replace_with(child, block)?;
                doc.remove(child);
                i += 1;
                continue;
            }
            (None, true) => {
                doc.remove(child);
                continue;
            }
            (Some(block), false) => {
                fix_cursor(doc, block, root);
                doc.insert_before(container, block, Some(child))?;
                i += 1;
            }
            (None, false) => {}
        }
        if doc.is_container(child) {
            fix_container(doc, child, root)?;
        }
        i += 1;
    }
    if let Some(block) = wrapper {
        fix_cursor(doc, block, root);
        doc.append_child(container, block)?;
    }
    Ok(container)
}

// ============================================================================
// Split
// ============================================================================

/// Split the tree at `(node, offset)` up to, but excluding, `stop`.
///
/// Returns the node that now starts the right-hand side at `stop`'s level,
/// or `None` when the split point was at the very end. Every original/clone
/// pair is made focusable before the next level is split.
pub fn split(
    doc: &mut Document,
    node: NodeId,
    offset: usize,
    stop: NodeId,
    root: NodeId,
) -> Result<Option<NodeId>, RangeError> {
    if !doc.is_alive(node) {
        return Err(RangeError::Stale { node });
    }
    tracing::debug!(node = ?node, offset, stop = ?stop, "split");
    if doc.is_text(node) {
        if node == stop {
            return Ok(None);
        }
        let after = doc.split_text(node, offset)?;
        return match doc.parent(node) {
            Some(parent) => split_before(doc, parent, Some(after), stop, root),
            None => Ok(Some(after)),
        };
    }
    let at = doc.child(node, offset);
    split_before(doc, node, at, stop, root)
}

/// Split `node` before its child `at` (or after its last child), climbing
/// until `stop`.
pub fn split_before(
    doc: &mut Document,
    mut node: NodeId,
    mut at: Option<NodeId>,
    stop: NodeId,
    root: NodeId,
) -> Result<Option<NodeId>, RangeError> {
    loop {
        if node == stop || !doc.is_element(node) {
            return Ok(at);
        }

        let clone = doc.clone_shallow(node)?;
        let mut next = at;
        while let Some(child) = next {
            next = doc.next_sibling(child);
            doc.append_child(clone, child)?;
        }

        // Keep list numbering continuous inside quotes.
        if doc.has_tag(node, &Tag::Ol)
            && doc
                .get_nearest(node, root, &Tag::Blockquote, &Attributes::new())
                .is_some()
        {
            let start = doc
                .attr(node, "start")
                .and_then(|s| s.trim().parse::<i64>().ok())
                .filter(|&s| s != 0)
                .unwrap_or(1);
            let remaining = doc.length(node) as i64;
            doc.set_attr(clone, "start", (start + remaining - 1).to_string())?;
        }

        // Each side must be focusable before the level above is split.
        fix_cursor(doc, node, root);
        fix_cursor(doc, clone, root);

        let Some(parent) = doc.parent(node) else {
            return Ok(Some(clone));
        };
        let reference = doc.next_sibling(node);
        doc.insert_before(parent, clone, reference)?;

        at = Some(clone);
        node = parent;
    }
}

// ============================================================================
// Merges
// ============================================================================

/// Merge adjacent alike inline children throughout the subtree of `node`
/// (or of its parent, for a text node), rewriting `range` to follow the
/// merged content.
///
/// Running it twice is the same as running it once.
pub fn merge_inlines(doc: &mut Document, node: NodeId, range: Range) -> Range {
    let node = if doc.is_text(node) {
        match doc.parent(node) {
            Some(parent) => parent,
            None => return range,
        }
    } else {
        node
    };
    if !doc.is_element(node) {
        return range;
    }
    let mut range = range;
    merge_inlines_in(doc, node, &mut range);
    range
}

fn merge_inlines_in(doc: &mut Document, node: NodeId, range: &mut Range) {
    let children = doc.children(node).to_vec();
    let mut pending: Vec<NodeId> = Vec::new();
    for l in (0..children.len()).rev() {
        let child = children[l];
        let prev = l.checked_sub(1).map(|p| children[p]);
        if let Some(prev) = prev
            && doc.is_inline(child)
            && doc.are_alike(child, prev)
            && !doc.tag_flags(child).contains(TagFlags::LEAF)
        {
            let prev_len = doc.length(prev);
            for point in [&mut range.start, &mut range.end] {
                if point.node == child {
                    *point = Position::new(prev, point.offset + prev_len);
                } else if point.node == node {
                    if point.offset > l {
                        point.offset -= 1;
                    } else if point.offset == l {
                        *point = Position::new(prev, prev_len);
                    }
                }
            }
            doc.detach(child);
            if let Some(text) = doc.text(child).map(str::to_owned) {
                if let Err(err) = doc.append_text(prev, &text) {
                    doc.report(err);
                }
            } else {
                pending.push(doc.empty(child));
            }
            doc.remove(child);
        } else if doc.is_element(child) {
            while let Some(frag) = pending.pop() {
                if let Err(err) = doc.append_child(child, frag) {
                    doc.report(err);
                }
                doc.remove(frag);
            }
            merge_inlines_in(doc, child, range);
        }
    }
}

/// Append the content of `next` to `block`, returning a caret at the join.
///
/// `next` is detached together with any chain of single-child ancestors it
/// was the only content of. A trailing `br` in `block` that only kept it
/// focusable is removed first.
pub fn merge_with_block(
    doc: &mut Document,
    block: NodeId,
    next: NodeId,
    root: NodeId,
) -> Result<Range, RangeError> {
    let mut container = next;
    while let Some(parent) = doc.parent(container)
        && parent != root
        && doc.length(parent) == 1
    {
        container = parent;
    }
    doc.detach(container);

    let mut offset = doc.length(block);
    if let Some(last) = doc.last_child(block)
        && doc.has_tag(last, &Tag::Br)
    {
        doc.remove(last);
        offset -= 1;
    }

    let moved = doc.empty(next);
    doc.append_child(block, moved)?;
    doc.remove(moved);
    doc.remove(container);

    tracing::debug!(block = ?block, offset, "merged block");
    let range = Range::collapsed(Position::new(block, offset));
    Ok(merge_inlines(doc, block, range))
}

/// Merge `node` into its previous sibling when the two are alike, then
/// cascade into the first absorbed child.
///
/// A list item merges only when it holds nothing but a nested list; if its
/// previous sibling is then not a container, the sibling's content is first
/// wrapped in a block.
pub fn merge_containers(doc: &mut Document, node: NodeId, root: NodeId) -> Result<(), RangeError> {
    let prev = doc.previous_sibling(node);
    let first = doc.first_child(node);
    let is_list_item = doc.has_tag(node, &Tag::Li);

    if is_list_item && !first.is_some_and(|f| doc.tag_flags(f).contains(TagFlags::LIST)) {
        return Ok(());
    }

    match prev {
        Some(prev) if doc.are_alike(prev, node) => {
            if !doc.is_container(prev) {
                if !is_list_item {
                    return Ok(());
                }
                let block = doc.create_default_block();
                let content = doc.empty(prev);
                doc.append_child(block, content)?;
                doc.remove(content);
                doc.append_child(prev, block)?;
            }
            doc.detach(node);
            let needs_fix = !doc.is_container(node);
            let content = doc.empty(node);
            doc.append_child(prev, content)?;
            doc.remove(content);
            doc.remove(node);
            tracing::debug!(into = ?prev, "merged containers");
            if needs_fix {
                fix_container(doc, prev, root)?;
            }
            if let Some(first) = first
                && doc.is_alive(first)
            {
                merge_containers(doc, first, root)?;
            }
        }
        _ if is_list_item => {
            let block = doc.create_default_block();
            doc.insert_before(node, block, first)?;
            fix_cursor(doc, block, root);
        }
        _ => {}
    }
    Ok(())
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

    fn nth_text(doc: &Document, n: usize) -> NodeId {
        doc.descendants(doc.root())
            .filter(|&id| doc.is_text(id))
            .nth(n)
            .unwrap()
    }

    #[test]
    fn split_text_up_to_root() {
        let mut doc = load("<div>abcd</div>");
        let root = doc.root();
        let t = nth_text(&doc, 0);
        let after = split(&mut doc, t, 2, root, root).unwrap().unwrap();
        assert_eq!(html(&doc), "<div>ab</div><div>cd</div>");
        assert_eq!(doc.index_of(after), Some(1));
    }

    #[test]
    fn split_at_start_leaves_focusable_left_side() {
        let mut doc = load("<p><b>xy</b></p>");
        let root = doc.root();
        let t = nth_text(&doc, 0);
        split(&mut doc, t, 0, root, root).unwrap();
        assert_eq!(html(&doc), "<p><b>\u{200B}</b></p><p><b>xy</b></p>");
    }

    #[test]
    fn split_at_stop_returns_child() {
        let mut doc = load("<p>a</p><p>b</p>");
        let root = doc.root();
        let second = doc.child(root, 1);
        assert_eq!(split(&mut doc, root, 1, root, root).unwrap(), second);
        assert_eq!(split(&mut doc, root, 2, root, root).unwrap(), None);
    }

    #[test]
    fn split_ordered_list_in_quote_keeps_numbering() {
        let mut doc = load("<blockquote><ol><li>a</li><li>b</li><li>c</li></ol></blockquote>");
        let root = doc.root();
        let quote = doc.first_child(root).unwrap();
        let ol = doc.first_child(quote).unwrap();
        split(&mut doc, ol, 2, quote, root).unwrap();
        assert_eq!(
            html(&doc),
            "<blockquote><ol><li>a</li><li>b</li></ol><ol start=\"2\"><li>c</li></ol></blockquote>"
        );
    }

    #[test]
    fn merge_adjacent_bold() {
        let mut doc = load("<p><b>x</b><b>y</b></p>");
        let p = doc.first_child(doc.root()).unwrap();
        let y = nth_text(&doc, 1);
        let range = Range::collapsed(Position::new(y, 1));
        let range = merge_inlines(&mut doc, p, range);
        assert_eq!(html(&doc), "<p><b>xy</b></p>");
        let merged = nth_text(&doc, 0);
        assert_eq!(range.start, Position::new(merged, 2));
    }

    #[test]
    fn merge_respects_class_and_leaves() {
        let mut doc = load("<p><b class=\"a\">x</b><b>y</b><br><br><a>l</a><a>m</a></p>");
        let p = doc.first_child(doc.root()).unwrap();
        let range = Range::collapsed(Position::new(p, 0));
        merge_inlines(&mut doc, p, range);
        assert_eq!(
            html(&doc),
            "<p><b class=\"a\">x</b><b>y</b><br><br><a>l</a><a>m</a></p>"
        );
    }

    #[test]
    fn merge_rewrites_container_offsets() {
        let mut doc = load("<p>a<i>b</i><i>c</i>d</p>");
        let p = doc.first_child(doc.root()).unwrap();
        let range = Range::new(Position::new(p, 2), Position::new(p, 4));
        let range = merge_inlines(&mut doc, p, range);
        assert_eq!(html(&doc), "<p>a<i>bc</i>d</p>");
        let bc = nth_text(&doc, 1);
        assert_eq!(range.start, Position::new(bc, 1));
        assert_eq!(range.end, Position::new(p, 3));
    }

    #[test]
    fn merge_with_block_drops_filler_br() {
        let mut doc = load("<div>ab<br></div><div><span>cd</span></div>");
        let root = doc.root();
        let first = doc.child(root, 0).unwrap();
        let second = doc.child(root, 1).unwrap();
        let range = merge_with_block(&mut doc, first, second, root).unwrap();
        assert_eq!(html(&doc), "<div>ab<span>cd</span></div>");
        assert!(!doc.is_alive(second));
        assert_eq!(range.start, Position::new(first, 1));
    }

    #[test]
    fn merge_containers_joins_lists() {
        let mut doc = load("<ul><li>a</li></ul><ul><li>b</li></ul>");
        let root = doc.root();
        let second = doc.child(root, 1).unwrap();
        merge_containers(&mut doc, second, root).unwrap();
        assert_eq!(html(&doc), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn merge_containers_skips_plain_list_items() {
        let mut doc = load("<ul><li>a</li><li>b</li></ul>");
        let ul = doc.first_child(doc.root()).unwrap();
        let second = doc.child(ul, 1).unwrap();
        let root = doc.root();
        merge_containers(&mut doc, second, root).unwrap();
        assert_eq!(html(&doc), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn fix_cursor_fills_empty_nodes_only() {
        let mut doc = load("<div></div><div>ab</div><p><b></b></p>");
        let root = doc.root();
        for i in 0..3 {
            let block = doc.child(root, i).unwrap();
            fix_cursor(&mut doc, block, root);
        }
        assert_eq!(html(&doc), "<div><br></div><div>ab</div><p><b></b><br></p>");
        let b = doc.first_child(doc.child(root, 2).unwrap()).unwrap();
        fix_cursor(&mut doc, b, root);
        fix_cursor(&mut doc, b, root);
        assert_eq!(doc.text_content(b), ZWS.to_string());
    }

    #[test]
    fn fix_cursor_gives_root_a_block() {
        let mut doc = Document::new();
        let root = doc.root();
        fix_cursor(&mut doc, root, root);
        assert_eq!(html(&doc), "<div><br></div>");
        let mut doc = load("<br>");
        let root = doc.root();
        fix_cursor(&mut doc, root, root);
        assert_eq!(html(&doc), "<div><br></div>");
    }

    #[test]
    fn fix_cursor_reports_rejected_filler() {
        let mut doc = Document::new();
        let root = doc.root();
        let iframe = doc.create_element(Tag::Iframe, Attributes::new());
        fix_cursor(&mut doc, iframe, root);
        assert_eq!(doc.errors().len(), 1);
        assert!(doc.errors()[0].is_fixup_failure());
        assert!(doc.children(iframe).is_empty());
    }

    #[test]
    fn fix_container_wraps_inline_runs() {
        let mut doc = load("a<b>b</b><br>c<p>d</p>e");
        let root = doc.root();
        fix_container(&mut doc, root, root).unwrap();
        assert_eq!(
            html(&doc),
            "<div>a<b>b</b></div><div>c</div><p>d</p><div>e</div>"
        );
        fix_container(&mut doc, root, root).unwrap();
        assert_eq!(
            html(&doc),
            "<div>a<b>b</b></div><div>c</div><p>d</p><div>e</div>"
        );
    }

    #[test]
    fn fix_container_drops_isolated_br() {
        let mut doc = load("<p>a</p><br><p>b</p>");
        let root = doc.root();
        fix_container(&mut doc, root, root).unwrap();
        assert_eq!(html(&doc), "<p>a</p><p>b</p>");
    }

    #[test]
    fn fix_container_recurses() {
        let mut doc = load("<blockquote>x<p>y</p></blockquote>");
        let root = doc.root();
        fix_container(&mut doc, root, root).unwrap();
        assert_eq!(html(&doc), "<blockquote><div>x</div><p>y</p></blockquote>");
    }
}
