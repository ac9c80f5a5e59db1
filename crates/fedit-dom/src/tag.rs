#![forbid(unsafe_code)]

//! Element tags and their structural capabilities.
//!
//! Every known HTML element kind is a variant of [`Tag`]; anything else is
//! carried as [`Tag::Other`] with its lowercased name. The capability bits in
//! [`TagFlags`] are looked up once when an element is created and stored next
//! to it in the arena, so classification never re-matches tag names.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Structural capabilities of an element kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TagFlags: u8 {
        /// Flows within a line when all of its children are inline.
        const INLINE    = 0b0000_0001;
        /// Atomic: never split, never given children.
        const LEAF      = 0b0000_0010;
        /// `ul` / `ol`.
        const LIST      = 0b0000_0100;
        /// `li`.
        const LIST_ITEM = 0b0000_1000;
        /// `blockquote`.
        const QUOTE     = 0b0001_0000;
        /// Serialized without an end tag.
        const VOID      = 0b0010_0000;
    }
}

macro_rules! tags {
    ($($variant:ident => $name:literal [$($flag:ident),*];)*) => {
        /// An element kind.
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum Tag {
            $(
                #[doc = concat!("`<", $name, ">`")]
                $variant,
            )*
            /// Any element name not listed above, lowercased.
            Other(Box<str>),
        }

        impl Tag {
            /// Resolve a tag name, case-insensitively.
            #[must_use]
            pub fn from_name(name: &str) -> Self {
                let lower = name.to_ascii_lowercase();
                match lower.as_str() {
                    $($name => Self::$variant,)*
                    _ => Self::Other(lower.into_boxed_str()),
                }
            }

            /// Lowercase element name.
            #[must_use]
            pub fn name(&self) -> &str {
                match self {
                    $(Self::$variant => $name,)*
                    Self::Other(name) => name,
                }
            }

            /// Capability bits for this kind.
            #[must_use]
            pub const fn flags(&self) -> TagFlags {
                match self {
                    $(Self::$variant => TagFlags::empty()$(.union(TagFlags::$flag))*,)*
                    Self::Other(_) => TagFlags::empty(),
                }
            }
        }
    };
}

tags! {
    // Inline allow-list.
    A => "a" [INLINE];
    Abbr => "abbr" [INLINE];
    Acronym => "acronym" [INLINE];
    B => "b" [INLINE];
    Bdi => "bdi" [INLINE];
    Bdo => "bdo" [INLINE];
    Br => "br" [INLINE, LEAF, VOID];
    Cite => "cite" [INLINE];
    Code => "code" [INLINE];
    Data => "data" [INLINE];
    Del => "del" [INLINE];
    Dfn => "dfn" [INLINE];
    Em => "em" [INLINE];
    Font => "font" [INLINE];
    Hr => "hr" [INLINE, LEAF, VOID];
    I => "i" [INLINE];
    Iframe => "iframe" [INLINE, LEAF];
    Img => "img" [INLINE, LEAF, VOID];
    Input => "input" [INLINE, LEAF, VOID];
    Ins => "ins" [INLINE];
    Kbd => "kbd" [INLINE];
    Q => "q" [INLINE];
    Rp => "rp" [INLINE];
    Rt => "rt" [INLINE];
    Ruby => "ruby" [INLINE];
    S => "s" [INLINE];
    Samp => "samp" [INLINE];
    Small => "small" [INLINE];
    Span => "span" [INLINE];
    Strike => "strike" [INLINE];
    Strong => "strong" [INLINE];
    Sub => "sub" [INLINE];
    Sup => "sup" [INLINE];
    Time => "time" [INLINE];
    U => "u" [INLINE];
    Var => "var" [INLINE];
    Wbr => "wbr" [INLINE, VOID];

    // Blocks and containers.
    Address => "address" [];
    Article => "article" [];
    Aside => "aside" [];
    Blockquote => "blockquote" [QUOTE];
    Body => "body" [];
    Caption => "caption" [];
    Dd => "dd" [];
    Details => "details" [];
    Div => "div" [];
    Dl => "dl" [];
    Dt => "dt" [];
    Figcaption => "figcaption" [];
    Figure => "figure" [];
    Footer => "footer" [];
    H1 => "h1" [];
    H2 => "h2" [];
    H3 => "h3" [];
    H4 => "h4" [];
    H5 => "h5" [];
    H6 => "h6" [];
    Header => "header" [];
    Li => "li" [LIST_ITEM];
    Main => "main" [];
    Nav => "nav" [];
    Ol => "ol" [LIST];
    P => "p" [];
    Pre => "pre" [];
    Section => "section" [];
    Summary => "summary" [];
    Table => "table" [];
    Tbody => "tbody" [];
    Td => "td" [];
    Tfoot => "tfoot" [];
    Th => "th" [];
    Thead => "thead" [];
    Tr => "tr" [];
    Ul => "ul" [LIST];

    // Void elements that never hold content.
    Area => "area" [VOID];
    Base => "base" [VOID];
    Col => "col" [VOID];
    Embed => "embed" [VOID];
    Link => "link" [VOID];
    Meta => "meta" [VOID];
    Param => "param" [VOID];
    Source => "source" [VOID];
    Track => "track" [VOID];
}

impl Tag {
    /// Whether the tag is on the inline allow-list.
    #[must_use]
    pub const fn is_default_inline(&self) -> bool {
        self.flags().contains(TagFlags::INLINE)
    }

    /// Whether elements of this kind are atomic leaves.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.flags().contains(TagFlags::LEAF)
    }

    /// `ul` or `ol`.
    #[must_use]
    pub const fn is_list(&self) -> bool {
        self.flags().contains(TagFlags::LIST)
    }

    /// Whether the element is written without an end tag.
    #[must_use]
    pub const fn is_void(&self) -> bool {
        self.flags().contains(TagFlags::VOID)
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_case_insensitively() {
        assert_eq!(Tag::from_name("DIV"), Tag::Div);
        assert_eq!(Tag::from_name("Strong"), Tag::Strong);
        assert_eq!(Tag::from("li"), Tag::Li);
    }

    #[test]
    fn unknown_names_are_kept_lowercase() {
        let tag = Tag::from_name("X-Widget");
        assert_eq!(tag, Tag::Other("x-widget".into()));
        assert_eq!(tag.name(), "x-widget");
        assert_eq!(tag.flags(), TagFlags::empty());
    }

    #[test]
    fn inline_allow_list() {
        for name in ["a", "b", "br", "code", "img", "span", "sub", "sup", "u", "wbr"] {
            assert!(Tag::from_name(name).is_default_inline(), "{name}");
        }
        for name in ["div", "p", "li", "ul", "blockquote", "h1", "table", "custom"] {
            assert!(!Tag::from_name(name).is_default_inline(), "{name}");
        }
    }

    #[test]
    fn leaves_are_inline_and_atomic() {
        for tag in [Tag::Br, Tag::Hr, Tag::Iframe, Tag::Img, Tag::Input] {
            assert!(tag.is_leaf());
            assert!(tag.is_default_inline());
        }
        assert!(!Tag::Wbr.is_leaf());
        assert!(!Tag::Span.is_leaf());
    }

    #[test]
    fn display_uses_lowercase_name() {
        assert_eq!(Tag::Blockquote.to_string(), "blockquote");
        assert!(Tag::Ul.is_list() && Tag::Ol.is_list() && !Tag::Li.is_list());
        assert!(Tag::Br.is_void() && !Tag::Iframe.is_void());
    }
}
