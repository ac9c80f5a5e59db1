#![forbid(unsafe_code)]

//! Editor command errors.

use std::fmt;

use fedit_dom::{DomError, MarkupError};
use fedit_range::RangeError;

use crate::config::ConfigError;

/// Failure of an editor command.
///
/// A failed command may have changed the document; it is still structurally
/// valid, but the caller should treat the current selection as a best guess.
#[derive(Debug)]
pub enum EditorError {
    /// The configuration was rejected.
    Config(ConfigError),
    /// Markup handed to the editor did not parse.
    Markup(MarkupError),
    /// A range operation failed.
    Range(RangeError),
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid editor config: {e}"),
            Self::Markup(e) => write!(f, "markup error: {e}"),
            Self::Range(e) => write!(f, "range error: {e}"),
        }
    }
}

impl std::error::Error for EditorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Markup(e) => Some(e),
            Self::Range(e) => Some(e),
        }
    }
}

impl From<ConfigError> for EditorError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<MarkupError> for EditorError {
    fn from(err: MarkupError) -> Self {
        Self::Markup(err)
    }
}

impl From<RangeError> for EditorError {
    fn from(err: RangeError) -> Self {
        Self::Range(err)
    }
}

impl From<DomError> for EditorError {
    fn from(err: DomError) -> Self {
        Self::Range(err.into())
    }
}
