#![forbid(unsafe_code)]

//! FrankenEdit range engine
//!
//! Selections as values, and every structural edit expressed against them.
//!
//! # Key Components
//!
//! - [`Position`] / [`Range`] - Boundary points with tree-order comparison and containment
//! - [`mutate`] - Split, merge and the two cursor/container normalizations
//! - [`boundary`] - Boundary movement up and down the tree, block lookup
//! - [`ops`] - Insert, extract, delete and fragment insertion
//! - [`clean`] - Line-break, placeholder and whitespace cleanup; block splitting
//!
//! # Ranges are values
//!
//! Nothing here holds on to a range. A function that can move content
//! across a caller's boundaries takes the range by value and returns the
//! rewritten one:
//!
//! ```ignore
//! let (removed, caret) = delete_contents(&mut doc, selection, root)?;
//! let selection = insert_fragment(&mut doc, caret, pasted, root)?;
//! ```
//!
//! # Role in FrankenEdit
//! `fedit-range` sits between the document model in `fedit-dom` and the
//! editor session in `fedit-runtime`, which owns the live selection.

pub mod boundary;
pub mod clean;
pub mod error;
pub mod mutate;
pub mod ops;
pub mod position;

pub use boundary::{
    ends_at_block_boundary, expand_to_block_boundaries, get_end_block, get_node_after,
    get_node_before, get_start_block, move_boundaries_down, move_boundaries_up,
    starts_at_block_boundary,
};
pub use clean::{cleanup_brs, collapse_whitespace, remove_empty_inlines, remove_zws, split_block};
pub use error::RangeError;
pub use mutate::{
    fix_container, fix_cursor, merge_containers, merge_inlines, merge_with_block, split,
    split_before,
};
pub use ops::{delete_contents, extract_contents, insert_fragment, insert_node_in_range};
pub use position::{Position, Range, compare_points};
