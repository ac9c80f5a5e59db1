#![no_main]

use arbitrary::Arbitrary;
use fedit_dom::{Document, NodeId, parse_fragment_lossy};
use fedit_range::{Position, Range, compare_points, delete_contents, fix_container, fix_cursor};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    markup: String,
    start: (u8, u8),
    end: (u8, u8),
}

fn texts(doc: &Document) -> Vec<NodeId> {
    doc.descendants(doc.root())
        .filter(|&id| doc.is_text(id))
        .collect()
}

fn mixed_children(doc: &Document) -> Option<NodeId> {
    std::iter::once(doc.root())
        .chain(doc.descendants(doc.root()))
        .find(|&id| {
            let kids = doc.children(id);
            kids.iter().any(|&k| doc.is_inline(k)) && kids.iter().any(|&k| !doc.is_inline(k))
        })
}

fn position(doc: &Document, texts: &[NodeId], (n, offset): (u8, u8)) -> Position {
    let node = texts[n as usize % texts.len()];
    let len = doc.text_len(node);
    Position::new(node, offset as usize % (len + 1))
}

fuzz_target!(|input: Input| {
    let mut doc = Document::new();
    let root = doc.root();
    let frag = parse_fragment_lossy(&mut doc, &input.markup);
    if doc.append_child(root, frag).is_err() {
        return;
    }
    doc.remove(frag);
    if fix_container(&mut doc, root, root).is_err() {
        return;
    }
    let blocks: Vec<NodeId> = doc
        .descendants(root)
        .filter(|&n| doc.is_block(n))
        .collect();
    for block in blocks {
        fix_cursor(&mut doc, block, root);
    }

    // Markup that nests blocks in inlines is out of reach of the fix-ups.
    let texts = texts(&doc);
    if texts.is_empty() || mixed_children(&doc).is_some() {
        return;
    }
    let mut start = position(&doc, &texts, input.start);
    let mut end = position(&doc, &texts, input.end);
    if compare_points(&doc, end, start).is_lt() {
        std::mem::swap(&mut start, &mut end);
    }

    let Ok((removed, caret)) = delete_contents(&mut doc, Range::new(start, end), root) else {
        return;
    };
    doc.remove(removed);

    // The root keeps a block and the caret stays inside the document.
    assert!(doc.first_child(root).is_some(), "root left empty");
    assert!(caret.is_within(&doc, root), "caret escaped the document");

    assert_eq!(mixed_children(&doc), None, "node with mixed children");
});
