#![forbid(unsafe_code)]

//! FrankenEdit runtime
//!
//! The editor session: one document, one selection, a snapshot undo
//! history, and the commands a host binds to keys and toolbar buttons.
//!
//! # Key Components
//!
//! - [`Editor`] - Owns the document and selection; every command is a method
//! - [`EditorConfig`] - Default block, per-element default attributes, undo bounds
//! - [`SnapshotStore`] - Bounded stack of serialized checkpoints
//! - [`Format`] / [`FontInfo`] - Inline formatting requests and queries
//! - [`EditorEvent`] - Notifications queued while commands run
//! - [`bookmark`] - Selection sentinels that ride along through serialization
//!
//! # Role in FrankenEdit
//! `fedit-runtime` sits on top of `fedit-range`. It decides when a change
//! becomes an undo checkpoint, keeps the selection valid across commands,
//! and turns formatting and block requests into range operations.
//!
//! ```ignore
//! let mut editor = Editor::with_default_config()?;
//! editor.set_markup("<div>hello</div>")?;
//! editor.move_cursor_to_end();
//! editor.bold()?;
//! assert!(editor.can_undo());
//! ```

mod blocks;
pub mod bookmark;
pub mod config;
mod editor;
pub mod error;
pub mod event;
mod format;
pub mod undo;

pub use bookmark::{END_SELECTION_ID, START_SELECTION_ID, is_bookmark};
pub use config::{ConfigError, EditorConfig, TagAttributes};
pub use editor::Editor;
pub use error::EditorError;
pub use event::EditorEvent;
pub use format::{FontInfo, Format};
pub use undo::{SnapshotStore, UndoConfig};
