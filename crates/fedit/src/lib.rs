#![forbid(unsafe_code)]

//! FrankenEdit public facade crate.
//!
//! Re-exports the types most hosts need from the document, range and
//! runtime crates, plus a prelude for day-to-day use.
//!
//! ```ignore
//! use fedit::prelude::*;
//!
//! let mut editor = Editor::with_default_config()?;
//! editor.set_markup("<div>one</div><div>two</div>")?;
//! editor.move_cursor_to_start();
//! editor.make_unordered_list(None)?;
//! assert_eq!(editor.markup(), "<ul><li>one</li></ul><div>two</div>");
//! ```

pub mod error;

// --- Document re-exports ---------------------------------------------------

pub use fedit_dom::{
    Attributes, BlockTemplate, Category, Document, DomError, MarkupError, NodeId, NodeKind, Tag,
    TagFlags, TreeWalker, ZWS, parse_fragment, parse_fragment_lossy, serialize, serialize_children,
};

// --- Range re-exports ------------------------------------------------------

pub use fedit_range::{
    Position, Range, RangeError, delete_contents, extract_contents, insert_fragment,
    insert_node_in_range,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use fedit_runtime::{
    ConfigError, Editor, EditorConfig, EditorError, EditorEvent, FontInfo, Format, SnapshotStore,
    TagAttributes, UndoConfig,
};

pub use error::{Error, Result};

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{Attributes, Document, Error, NodeId, Position, Range, Result, Tag};

    #[cfg(feature = "runtime")]
    pub use crate::{Editor, EditorConfig, EditorEvent, Format};

    pub use crate::{dom, range};

    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use fedit_dom as dom;
pub use fedit_range as range;
#[cfg(feature = "runtime")]
pub use fedit_runtime as runtime;
