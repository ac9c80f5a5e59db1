#![forbid(unsafe_code)]

//! Property tests for the markup reader/writer and node classification.
//!
//! Validates:
//! - Lossy parsing never panics and always yields markup that parses strictly.
//! - Serialized output is a fixed point of parse-then-serialize.
//! - Categories agree with their definition on every node of generated trees.
//! - Pre-order traversal visits every descendant exactly once.
//! - Sibling navigation agrees with child lists after arbitrary moves.

use proptest::prelude::*;

use fedit_dom::{
    Category, Document, NodeId, NodeMask, TreeWalker, accept_all, markup, parse_fragment,
    parse_fragment_lossy, serialize_children,
};

// ============================================================================
// Strategy helpers
// ============================================================================

fn inline_markup() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        4 => "[a-z ]{1,6}",
        1 => Just("<br>".to_string()),
        1 => Just("<img src=\"x.png\">".to_string()),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        (
            prop::sample::select(vec!["b", "i", "u", "span", "a"]),
            prop::collection::vec(inner, 1..4),
        )
            .prop_map(|(tag, kids)| format!("<{tag}>{}</{tag}>", kids.concat()))
    })
}

fn block_markup() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["div", "p", "h1", "pre"]),
        prop::collection::vec(inline_markup(), 0..4),
    )
        .prop_map(|(tag, kids)| format!("<{tag}>{}</{tag}>", kids.concat()))
}

fn document_markup() -> impl Strategy<Value = String> {
    let top = prop_oneof![
        3 => block_markup(),
        1 => prop::collection::vec(block_markup(), 1..3)
            .prop_map(|blocks| format!("<blockquote>{}</blockquote>", blocks.concat())),
        1 => inline_markup(),
    ];
    prop::collection::vec(top, 1..5).prop_map(|parts| parts.concat())
}

fn all_nodes(doc: &Document, root: NodeId) -> Vec<NodeId> {
    let mut walker = TreeWalker::new(root, NodeMask::ALL, accept_all as fedit_dom::NodeFilter);
    let mut nodes = Vec::new();
    while let Some(node) = walker.next_node(doc) {
        nodes.push(node);
    }
    nodes
}

// ============================================================================
// Invariant 1: lossy parsing is total and yields well-formed output
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn lossy_parse_output_reparses_strictly(input in "[<>/a-z=\"' &;!-]{0,120}") {
        let mut doc = Document::new();
        let frag = parse_fragment_lossy(&mut doc, &input);
        let once = serialize_children(&doc, frag);
        let again = parse_fragment(&mut doc, &once);
        prop_assert!(again.is_ok(), "serialized output failed to parse: {once:?}");
        if let Ok(again) = again {
            prop_assert_eq!(serialize_children(&doc, again), once);
        }
    }
}

// ============================================================================
// Invariant 2: serialize(parse(x)) is a fixed point
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn generated_documents_are_stable(input in document_markup()) {
        let mut doc = Document::new();
        let frag = parse_fragment(&mut doc, &input).unwrap();
        prop_assert_eq!(serialize_children(&doc, frag), input.clone());
        prop_assert!(doc.errors().is_empty());
    }
}

// ============================================================================
// Invariant 3: classification agrees with its definition
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn categories_follow_children(input in document_markup()) {
        let mut doc = Document::new();
        let frag = parse_fragment(&mut doc, &input).unwrap();
        let root = doc.root();
        doc.append_child(root, frag).unwrap();

        for node in all_nodes(&doc, root) {
            let children = doc.children(node);
            let category = doc.category(node);
            if doc.is_text(node) {
                prop_assert_eq!(category, Category::Inline);
                continue;
            }
            let all_inline = children.iter().all(|&c| doc.is_inline(c));
            match category {
                Category::Container => prop_assert!(!all_inline),
                Category::Inline => {
                    prop_assert!(all_inline);
                    prop_assert!(doc.tag(node).is_some_and(|t| t.is_default_inline()));
                }
                Category::Block => {
                    prop_assert!(all_inline);
                    prop_assert!(!doc.tag(node).is_some_and(|t| t.is_default_inline()));
                }
                Category::Unknown => prop_assert!(false, "live node classified unknown"),
            }
        }
    }

    #[test]
    fn walker_matches_descendants(input in document_markup()) {
        let mut doc = Document::new();
        let frag = parse_fragment(&mut doc, &input).unwrap();
        let root = doc.root();
        doc.append_child(root, frag).unwrap();

        let walked = all_nodes(&doc, root);
        let listed: Vec<NodeId> = doc.descendants(root).collect();
        prop_assert_eq!(&walked, &listed);

        let mut unique = walked.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), walked.len());
        prop_assert_eq!(markup::serialize_children(&doc, root), input);
    }
}

// ============================================================================
// Invariant 5: sibling positions follow every structural edit
// ============================================================================

#[derive(Debug, Clone)]
enum Edit {
    MoveBefore(usize, usize),
    Append(usize, usize),
    Remove(usize),
    Unwrap(usize),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Edit::MoveBefore(a, b)),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Edit::Append(a, b)),
        1 => any::<usize>().prop_map(Edit::Remove),
        1 => any::<usize>().prop_map(Edit::Unwrap),
    ]
}

fn pick(nodes: &[NodeId], i: usize) -> NodeId {
    nodes[i % nodes.len()]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn sibling_links_match_child_lists(
        input in document_markup(),
        edits in prop::collection::vec(edit_strategy(), 1..30)
    ) {
        let mut doc = Document::new();
        let frag = parse_fragment(&mut doc, &input).unwrap();
        let root = doc.root();
        doc.append_child(root, frag).unwrap();

        for edit in &edits {
            let nodes = all_nodes(&doc, root);
            if nodes.is_empty() {
                break;
            }
            // Rejected edits leave the tree untouched.
            match *edit {
                Edit::MoveBefore(a, b) => {
                    let (a, b) = (pick(&nodes, a), pick(&nodes, b));
                    if let Some(parent) = doc.parent(b) {
                        let _ = doc.insert_before(parent, a, Some(b));
                    }
                }
                Edit::Append(a, b) => {
                    let (a, b) = (pick(&nodes, a), pick(&nodes, b));
                    let _ = doc.append_child(b, a);
                }
                Edit::Remove(a) => doc.remove(pick(&nodes, a)),
                Edit::Unwrap(a) => {
                    let node = pick(&nodes, a);
                    let content = doc.empty(node);
                    if let Some(parent) = doc.parent(node) {
                        let _ = doc.insert_before(parent, content, Some(node));
                    }
                    doc.remove(content);
                }
            }

            for parent in std::iter::once(root).chain(all_nodes(&doc, root)) {
                let children = doc.children(parent).to_vec();
                for (i, &child) in children.iter().enumerate() {
                    prop_assert_eq!(doc.parent(child), Some(parent));
                    prop_assert_eq!(doc.index_of(child), Some(i));
                    prop_assert_eq!(doc.next_sibling(child), children.get(i + 1).copied());
                    let previous = i.checked_sub(1).map(|j| children[j]);
                    prop_assert_eq!(doc.previous_sibling(child), previous);
                }
            }
        }
    }
}
