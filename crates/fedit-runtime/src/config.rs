#![forbid(unsafe_code)]

//! Editor configuration.
//!
//! [`EditorConfig`] gathers everything an editor session takes from its host:
//! the block element synthesized whenever inline content needs a home, the
//! default attributes of elements the commands create, and the undo bounds.
//!
//! # Loading
//!
//! With the `config` feature the whole struct can be read from TOML or JSON.
//! Missing keys keep their defaults:
//!
//! ```toml
//! # fedit.toml
//! block_tag = "p"
//!
//! [tag_attributes.a]
//! target = "_blank"
//!
//! [undo]
//! document_size_threshold = 1048576
//! undo_limit = 20
//! ```
//!
//! ```rust,ignore
//! let config = EditorConfig::from_toml_file("fedit.toml")?;
//! let editor = Editor::new(config)?;
//! ```

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use fedit_dom::{Attributes, BlockTemplate, Tag, TagFlags};

use crate::undo::UndoConfig;

// ---------------------------------------------------------------------------
// EditorConfig
// ---------------------------------------------------------------------------

/// Everything an editor session is configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct EditorConfig {
    /// Element name of synthesized blocks.
    pub block_tag: String,

    /// Attributes given to every synthesized block.
    pub block_attributes: BTreeMap<String, String>,

    /// Default attributes of elements created by commands.
    pub tag_attributes: TagAttributes,

    /// Undo history bounds.
    pub undo: UndoConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            block_tag: "div".to_string(),
            block_attributes: BTreeMap::new(),
            tag_attributes: TagAttributes::default(),
            undo: UndoConfig::default(),
        }
    }
}

/// Default attributes per element created by the block and link commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct TagAttributes {
    pub blockquote: BTreeMap<String, String>,
    pub ul: BTreeMap<String, String>,
    pub ol: BTreeMap<String, String>,
    pub li: BTreeMap<String, String>,
    pub a: BTreeMap<String, String>,
}

impl TagAttributes {
    /// Attributes for a new element of kind `tag`; empty for kinds without
    /// configured defaults.
    #[must_use]
    pub fn for_tag(&self, tag: &Tag) -> Attributes {
        let map = match tag {
            Tag::Blockquote => &self.blockquote,
            Tag::Ul => &self.ul,
            Tag::Ol => &self.ol,
            Tag::Li => &self.li,
            Tag::A => &self.a,
            _ => return Attributes::new(),
        };
        to_attributes(map)
    }
}

pub(crate) fn to_attributes(map: &BTreeMap<String, String>) -> Attributes {
    map.iter().collect()
}

impl EditorConfig {
    /// Resolved block element kind.
    #[must_use]
    pub fn block_tag(&self) -> Tag {
        Tag::from_name(&self.block_tag)
    }

    /// Template handed to the document for synthesizing blocks.
    #[must_use]
    pub fn block_template(&self) -> BlockTemplate {
        BlockTemplate::new(self.block_tag(), to_attributes(&self.block_attributes))
    }

    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Check the configuration for values the editor cannot work with.
    ///
    /// Returns a list of problems. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let tag = self.block_tag();
        if matches!(tag, Tag::Other(_)) {
            errors.push(format!("block_tag `{}` is not a known element", self.block_tag));
        } else if tag.flags().intersects(TagFlags::INLINE | TagFlags::VOID) {
            errors.push(format!("block_tag `{}` is not a block element", self.block_tag));
        } else if tag.flags().intersects(TagFlags::LIST | TagFlags::LIST_ITEM | TagFlags::QUOTE) {
            errors.push(format!(
                "block_tag `{}` is reserved for lists and quotes",
                self.block_tag
            ));
        }

        if self.undo.undo_limit == Some(0) {
            errors.push("undo.undo_limit must be > 0".into());
        }
        if self.undo.max_depth == 0 {
            errors.push("undo.max_depth must be > 0".into());
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading an editor configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid_div_without_thresholds() {
        let config = EditorConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.block_tag(), Tag::Div);
        assert!(config.block_attributes.is_empty());
        assert_eq!(config.undo.document_size_threshold, None);
        assert_eq!(config.undo.undo_limit, None);
    }

    #[test]
    fn block_tag_is_case_insensitive() {
        let config = EditorConfig {
            block_tag: "P".into(),
            ..EditorConfig::default()
        };
        assert!(config.validate().is_empty());
        assert_eq!(config.block_template().tag, Tag::P);
    }

    #[test]
    fn inline_and_unknown_block_tags_rejected() {
        for tag in ["span", "br", "blink", "li"] {
            let config = EditorConfig {
                block_tag: tag.into(),
                ..EditorConfig::default()
            };
            assert_eq!(config.validate().len(), 1, "{tag} should be rejected");
        }
    }

    #[test]
    fn multiple_validation_errors_collected() {
        let mut config = EditorConfig::default();
        config.block_tag = "b".into();
        config.undo.undo_limit = Some(0);
        config.undo.max_depth = 0;
        let errors = config.validate();
        assert_eq!(errors.len(), 3, "{errors:?}");
    }

    #[test]
    fn tag_attributes_only_for_configured_kinds() {
        let mut attrs = TagAttributes::default();
        attrs.a.insert("target".into(), "_blank".into());
        assert_eq!(attrs.for_tag(&Tag::A).get("target"), Some("_blank"));
        assert!(attrs.for_tag(&Tag::B).is_empty());
    }

    #[test]
    fn validation_error_display_joins() {
        let err = ConfigError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "validation errors: a; b");
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_partial_override_preserves_defaults() {
        let config = EditorConfig::from_toml_str(
            r#"
            block_tag = "p"
            [undo]
            undo_limit = 5
            "#,
        )
        .expect("valid toml");
        assert_eq!(config.block_tag, "p");
        assert_eq!(config.undo.undo_limit, Some(5));
        assert_eq!(config.undo.max_depth, UndoConfig::default().max_depth);
        assert!(config.tag_attributes.a.is_empty());
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_round_trip() {
        let mut config = EditorConfig::default();
        config.block_attributes.insert("class".into(), "line".into());
        config.tag_attributes.blockquote.insert("type".into(), "cite".into());
        let json = serde_json::to_string(&config).expect("serializes");
        let back = EditorConfig::from_json_str(&json).expect("parses");
        assert_eq!(back, config);
    }

    #[cfg(feature = "config")]
    #[test]
    fn loads_from_file() {
        use std::io::Write as _;
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "block_tag = \"p\"").expect("write");
        let config = EditorConfig::from_toml_file(file.path()).expect("loads");
        assert_eq!(config.block_tag(), Tag::P);
    }

    #[cfg(feature = "config")]
    #[test]
    fn missing_file_is_io_error() {
        let err = EditorConfig::from_json_file("/nonexistent/fedit.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
