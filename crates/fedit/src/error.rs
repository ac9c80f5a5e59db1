#![forbid(unsafe_code)]

//! Unified error type.
//!
//! Each crate keeps its own typed error so callers can match on what
//! matters; [`Error`] gathers them for applications that just propagate.
//! Editor errors are flattened into the variant of their cause.

use std::fmt;

use fedit_dom::{DomError, MarkupError};
use fedit_range::RangeError;
#[cfg(feature = "runtime")]
use fedit_runtime::{ConfigError, EditorError};

/// Top-level error type for FrankenEdit.
#[derive(Debug)]
pub enum Error {
    /// A primitive tree operation failed.
    Dom(DomError),
    /// Markup did not parse.
    Markup(MarkupError),
    /// A range operation failed.
    Range(RangeError),
    /// The editor configuration was rejected.
    #[cfg(feature = "runtime")]
    Config(ConfigError),
}

/// Standard result type for FrankenEdit APIs.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Error type label for logs.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Dom(_) => "dom",
            Self::Markup(_) => "markup",
            Self::Range(RangeError::Stale { .. }) => "stale_range",
            Self::Range(RangeError::Dom(_)) => "range",
            #[cfg(feature = "runtime")]
            Self::Config(_) => "config",
        }
    }

    /// Whether the document is still usable as is.
    ///
    /// A stale range is re-resolved by the next command, and a rejected
    /// cursor filler leaves the tree valid. Everything else means the
    /// requested edit did not happen.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Dom(err) | Self::Range(RangeError::Dom(err)) => err.is_fixup_failure(),
            Self::Range(RangeError::Stale { .. }) => true,
            Self::Markup(_) => false,
            #[cfg(feature = "runtime")]
            Self::Config(_) => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dom(err) => write!(f, "{err}"),
            Self::Markup(err) => write!(f, "{err}"),
            Self::Range(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Dom(err) => Some(err),
            Self::Markup(err) => Some(err),
            Self::Range(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Config(err) => Some(err),
        }
    }
}

// ── From conversions ────────────────────────────────────────────────────

impl From<DomError> for Error {
    fn from(err: DomError) -> Self {
        Self::Dom(err)
    }
}

impl From<MarkupError> for Error {
    fn from(err: MarkupError) -> Self {
        Self::Markup(err)
    }
}

impl From<RangeError> for Error {
    fn from(err: RangeError) -> Self {
        Self::Range(err)
    }
}

#[cfg(feature = "runtime")]
impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

#[cfg(feature = "runtime")]
impl From<EditorError> for Error {
    fn from(err: EditorError) -> Self {
        match err {
            EditorError::Config(err) => Self::Config(err),
            EditorError::Markup(err) => Self::Markup(err),
            EditorError::Range(err) => Self::Range(err),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────
