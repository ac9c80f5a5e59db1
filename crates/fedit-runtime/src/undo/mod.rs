#![forbid(unsafe_code)]

//! Undo history for the editor session.
//!
//! [`SnapshotStore`] holds serialized checkpoints; the editor decides when to
//! record one and how to restore it.

pub mod snapshot_store;

pub use snapshot_store::{SnapshotStore, UndoConfig};
