#![forbid(unsafe_code)]

//! End-to-end editing scenarios driven through the public range API.
//!
//! Validates:
//! - Splitting a block at the caret.
//! - Select-all deletion leaving one focusable block.
//! - Merging adjacent formatted runs.
//! - Pasting blocks into the middle of a quote.
//! - Normalizing loose markup before it is edited.

use fedit_dom::{Document, NodeId, parse_fragment, serialize_children};
use fedit_range::{
    Position, Range, cleanup_brs, collapse_whitespace, delete_contents, expand_to_block_boundaries,
    fix_container, fix_cursor, insert_fragment, merge_inlines, move_boundaries_down, split_block,
};

// ============================================================================
// Helpers
// ============================================================================

fn load(markup: &str) -> Document {
    let mut doc = Document::new();
    let root = doc.root();
    let frag = parse_fragment(&mut doc, markup).expect("markup parses");
    doc.append_child(root, frag).expect("fragment appends");
    doc
}

fn html(doc: &Document) -> String {
    serialize_children(doc, doc.root())
}

fn texts(doc: &Document) -> Vec<NodeId> {
    doc.descendants(doc.root())
        .filter(|&id| doc.is_text(id))
        .collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn enter_in_middle_of_block() {
    let mut doc = load("<div>abcd</div>");
    let root = doc.root();
    let block = doc.first_child(root).expect("block");
    let text = texts(&doc)[0];

    let new_block = split_block(&mut doc, block, text, 2, root).expect("split");
    let caret = move_boundaries_down(&doc, Range::collapsed(Position::new(new_block, 0)));

    assert_eq!(html(&doc), "<div>ab</div><div>cd</div>");
    let cd = texts(&doc)[1];
    assert_eq!(doc.text(cd), Some("cd"));
    assert_eq!(caret.start, Position::new(cd, 0));
}

#[test]
fn select_all_then_delete() {
    let mut doc = load("<p>one</p><p>two</p>");
    let root = doc.root();
    let all = Range::select_node_contents(&doc, root);

    let (removed, caret) = delete_contents(&mut doc, all, root).expect("delete");

    assert_eq!(html(&doc), "<p><br></p>");
    assert_eq!(serialize_children(&doc, removed), "<p>one</p><p>two</p>");
    let block = doc.first_child(root).expect("block");
    assert!(caret.is_collapsed());
    assert_eq!(caret.start.node, block);
}

#[test]
fn adjacent_bold_runs_merge() {
    let mut doc = load("<p><b>x</b><b>y</b></p>");
    let p = doc.first_child(doc.root()).expect("paragraph");
    merge_inlines(&mut doc, p, Range::collapsed(Position::new(p, 0)));
    assert_eq!(html(&doc), "<p><b>xy</b></p>");
}

#[test]
fn paste_blocks_inside_quote() {
    let mut doc = load("<blockquote><p>abcd</p></blockquote>");
    let root = doc.root();
    let text = texts(&doc)[0];
    let frag = parse_fragment(&mut doc, "<p>one</p><p>two</p>").expect("paste parses");

    insert_fragment(&mut doc, Range::collapsed(Position::new(text, 2)), frag, root)
        .expect("insert");

    assert_eq!(
        html(&doc),
        "<blockquote><p>ab</p><p>one</p><p>two</p><p>cd</p></blockquote>"
    );
}

#[test]
fn paste_over_selection_replaces_it() {
    let mut doc = load("<p>hello world</p>");
    let root = doc.root();
    let text = texts(&doc)[0];
    let frag = parse_fragment(&mut doc, "<i>there</i>").expect("paste parses");
    let selection = Range::new(Position::new(text, 6), Position::new(text, 11));

    let caret = insert_fragment(&mut doc, selection, frag, root).expect("insert");

    assert_eq!(html(&doc), "<p>hello <i>there</i></p>");
    assert!(caret.is_collapsed());
}

#[test]
fn loose_markup_is_normalized() {
    let mut doc = load("  one<br>two<br><p> three </p>four ");
    let root = doc.root();
    collapse_whitespace(&mut doc, root, false);
    cleanup_brs(&mut doc, root, root, true).expect("cleanup");
    fix_container(&mut doc, root, root).expect("fix container");
    fix_cursor(&mut doc, root, root);

    assert_eq!(
        html(&doc),
        "<div>one</div><div>two</div><p>three</p><div>four</div>"
    );
}

#[test]
fn expand_then_delete_empties_covered_blocks() {
    let mut doc = load("<p>one</p><p>two</p><p>three</p>");
    let root = doc.root();
    let t = texts(&doc);
    let partial = Range::new(Position::new(t[0], 1), Position::new(t[1], 1));
    let whole = expand_to_block_boundaries(&doc, partial, root);

    delete_contents(&mut doc, whole, root).expect("delete");

    assert_eq!(html(&doc), "<p><br></p><p>three</p>");
}
