#![forbid(unsafe_code)]

//! Property tests for the undo history.
//!
//! Validates:
//! - Undo walks back through pushed checkpoints in reverse order.
//! - Redo after undo returns to the newest checkpoint.
//! - Size-based thinning keeps `min(pushed, undo_limit)` checkpoints, newest last.
//! - The hard depth ceiling is never exceeded.
//! - Editor undo/redo restores the exact markup of each checkpoint.

use fedit_range::{Position, Range};
use proptest::prelude::*;

use fedit_runtime::{Editor, EditorConfig, SnapshotStore, UndoConfig};

// ============================================================================
// Strategy helpers
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Push(String),
    Undo,
    Redo,
}

fn snapshot_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,12}".prop_map(|s| format!("<div>{s}</div>"))
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => snapshot_strategy().prop_map(Op::Push),
        2 => Just(Op::Undo),
        2 => Just(Op::Redo),
    ]
}

// ============================================================================
// Undo walks back in order
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn undo_returns_checkpoints_in_reverse(
        snapshots in prop::collection::vec(snapshot_strategy(), 2..40)
    ) {
        let mut store = SnapshotStore::new(UndoConfig::unlimited());
        for s in &snapshots {
            store.push(s.as_str());
        }
        for expected in snapshots.iter().rev().skip(1) {
            let restored = store.undo().unwrap();
            prop_assert_eq!(&*restored, expected.as_str());
        }
        prop_assert!(store.undo().is_none());
        prop_assert!(!store.can_undo());
    }

    #[test]
    fn redo_returns_to_newest(
        snapshots in prop::collection::vec(snapshot_strategy(), 2..30),
        undos in 1usize..30
    ) {
        let mut store = SnapshotStore::new(UndoConfig::unlimited());
        for s in &snapshots {
            store.push(s.as_str());
        }
        for _ in 0..undos.min(snapshots.len() - 1) {
            store.undo();
        }
        while store.redo().is_some() {}
        prop_assert_eq!(
            store.current().map(|s| s.to_string()),
            snapshots.last().cloned()
        );
        prop_assert!(!store.can_redo());
    }
}

// ============================================================================
// Thinning keeps the newest checkpoints
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn thinning_keeps_newest(
        snapshots in prop::collection::vec(snapshot_strategy(), 1..40),
        limit in 1usize..10
    ) {
        // Every generated checkpoint is larger than the threshold.
        let mut store = SnapshotStore::new(UndoConfig::thinned(4, limit));
        for s in &snapshots {
            store.push(s.as_str());
        }
        prop_assert_eq!(store.undo_depth(), snapshots.len().min(limit));
        prop_assert_eq!(
            store.current().map(|s| s.to_string()),
            snapshots.last().cloned()
        );

        let kept: Vec<String> = {
            let mut kept = vec![store.current().unwrap().to_string()];
            while let Some(s) = store.undo() {
                kept.push(s.to_string());
            }
            kept.reverse();
            kept
        };
        let expected: Vec<String> = snapshots[snapshots.len() - kept.len()..].to_vec();
        prop_assert_eq!(kept, expected);
    }

    #[test]
    fn small_documents_are_not_thinned(
        count in 1usize..30,
        limit in 1usize..5
    ) {
        let mut store = SnapshotStore::new(UndoConfig::thinned(1_000, limit));
        for i in 0..count {
            store.push(format!("<div>{i}</div>"));
        }
        prop_assert_eq!(store.undo_depth(), count);
    }

    #[test]
    fn depth_ceiling_holds(
        max_depth in 1usize..20,
        ops in prop::collection::vec(op_strategy(), 1..100)
    ) {
        let mut store = SnapshotStore::new(UndoConfig::with_max_depth(max_depth));
        for op in &ops {
            match op {
                Op::Push(s) => store.push(s.as_str()),
                Op::Undo => { store.undo(); }
                Op::Redo => { store.redo(); }
            }
            prop_assert!(
                store.undo_depth() <= max_depth,
                "undo_depth {} exceeds {} after {:?}",
                store.undo_depth(), max_depth, op
            );
        }
    }

    #[test]
    fn push_clears_redo(
        snapshots in prop::collection::vec(snapshot_strategy(), 2..20),
        extra in snapshot_strategy()
    ) {
        let mut store = SnapshotStore::new(UndoConfig::unlimited());
        for s in &snapshots {
            store.push(s.as_str());
        }
        store.undo();
        prop_assert!(store.can_redo());
        store.push(extra.as_str());
        prop_assert!(!store.can_redo());
        prop_assert_eq!(store.redo_depth(), 0);
    }
}

// ============================================================================
// Editor history
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn editor_undo_restores_each_state(
        words in prop::collection::vec("[a-z]{1,8}", 1..8)
    ) {
        let mut editor = Editor::new(EditorConfig::default()).unwrap();
        editor.set_markup("<div>start</div>").unwrap();

        let doc = editor.document();
        let text = doc.descendants(doc.root()).find(|&n| doc.is_text(n)).unwrap();
        editor.set_selection(Range::collapsed(Position::new(text, 5)));

        let mut states = vec![editor.markup()];
        for word in &words {
            editor.insert_markup(&format!("<b>{word}</b>"), false).unwrap();
            states.push(editor.markup());
        }

        for expected in states.iter().rev().skip(1) {
            prop_assert!(editor.undo());
            prop_assert_eq!(&editor.markup(), expected);
        }
        prop_assert!(!editor.undo());

        for expected in states.iter().skip(1) {
            prop_assert!(editor.redo());
            prop_assert_eq!(&editor.markup(), expected);
        }
        prop_assert!(!editor.redo());
    }
}
