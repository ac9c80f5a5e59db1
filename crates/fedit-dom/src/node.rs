#![forbid(unsafe_code)]

//! Node handles and payloads.

use std::fmt;

use smallvec::SmallVec;

use crate::tag::{Tag, TagFlags};

/// Handle to a node in a [`Document`](crate::Document).
///
/// The generation distinguishes a live node from a node that previously
/// occupied the same arena slot; a stale handle resolves to nothing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Arena slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Slot generation this handle was issued for.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Node variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Text,
    Element,
    /// Detached, parentless list of siblings.
    Fragment,
}

#[derive(Debug, Clone)]
pub(crate) struct ElementData {
    pub(crate) tag: Tag,
    pub(crate) flags: TagFlags,
    pub(crate) attrs: Attributes,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Text(String),
    Element(ElementData),
    Fragment,
}

impl NodeData {
    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Self::Text(_) => NodeKind::Text,
            Self::Element(_) => NodeKind::Element,
            Self::Fragment => NodeKind::Fragment,
        }
    }

    pub(crate) fn element(tag: Tag, attrs: Attributes) -> Self {
        let flags = tag.flags();
        Self::Element(ElementData { tag, flags, attrs })
    }
}

/// Element attributes: insertion-ordered, unique lowercase names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: SmallVec<[(String, String); 2]>,
}

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set an attribute, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self
            .entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `class` attribute, or the empty string.
    #[must_use]
    pub fn class(&self) -> &str {
        self.get("class").unwrap_or("")
    }

    /// `style` attribute, or the empty string.
    #[must_use]
    pub fn style(&self) -> &str {
        self.get("style").unwrap_or("")
    }

    /// Whitespace-separated class names.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.class().split_ascii_whitespace()
    }

    /// Value of one declaration inside the `style` attribute.
    ///
    /// Property names compare case-insensitively; the last declaration wins.
    #[must_use]
    pub fn style_property(&self, property: &str) -> Option<&str> {
        self.style()
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .filter(|(name, _)| name.trim().eq_ignore_ascii_case(property))
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
            .last()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (name, value) in iter {
            attrs.set(name, value);
        }
        attrs
    }
}
