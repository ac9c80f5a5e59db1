#![forbid(unsafe_code)]

//! FrankenEdit document model
//!
//! An arena-backed rich-text document tree and the read-side machinery built
//! on it.
//!
//! # Key Components
//!
//! - [`Document`] - Node arena with a single editing root and a default block template
//! - [`NodeId`] - Generational handle; a stale handle resolves to nothing
//! - [`Tag`] / [`TagFlags`] - Closed set of element kinds with capability bits
//! - [`Category`] - Memoized inline/block/container classification
//! - [`TreeWalker`] - Filtered forward, backward and post-order traversal
//! - [`markup`] - Trusting HTML-subset parser and serializer
//!
//! # Role in FrankenEdit
//! `fedit-dom` is the leaf crate. `fedit-range` implements every structural
//! edit on top of the primitives here, and `fedit-runtime` drives both from an
//! editor session.

pub mod category;
pub mod document;
pub mod error;
pub mod markup;
pub mod node;
pub mod query;
pub mod tag;
pub mod walker;

pub use category::Category;
pub use document::{BlockTemplate, Descendants, Document};
pub use error::DomError;
pub use markup::{MarkupError, parse_fragment, parse_fragment_lossy, serialize, serialize_children};
pub use node::{Attributes, NodeId, NodeKind};
pub use query::{COLOUR_CLASS, FONT_FAMILY_CLASS, FONT_SIZE_CLASS, HIGHLIGHT_CLASS};
pub use tag::{Tag, TagFlags};
pub use walker::{NodeFilter, NodeMask, TreeWalker, accept_all};

/// Zero-width space, used as a focusable placeholder inside empty inlines.
pub const ZWS: char = '\u{200B}';

/// Whitespace as the editor understands it. Non-breaking spaces are content.
#[must_use]
pub fn is_whitespace_char(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Whether `text` holds anything other than editor whitespace.
#[must_use]
pub fn has_content(text: &str) -> bool {
    text.chars().any(|c| !is_whitespace_char(c))
}
