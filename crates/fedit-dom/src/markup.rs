#![forbid(unsafe_code)]

//! Markup parsing and serialization.
//!
//! A small, trusting HTML-subset reader: it builds whatever element structure
//! the input describes and does not sanitize. The writer is its inverse for
//! trees the editor produces.
//!
//! # Parsing rules
//!
//! - Void elements, leaf elements and `/>` self-closing tags take no children.
//! - An end tag closes the nearest open element of the same name; an end tag
//!   with no open match is ignored. Elements still open at the end of input
//!   are closed implicitly.
//! - Comments, doctypes and processing instructions are skipped.
//! - A `<` that does not start a tag is literal text.
//! - Adjacent text is coalesced into a single text node.

use std::borrow::Cow;
use std::fmt;

use crate::document::Document;
use crate::node::{Attributes, NodeData, NodeId};
use crate::tag::{Tag, TagFlags};

/// Unrecoverable markup syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    /// A `<` opened a tag that never reached its closing `>`.
    UnterminatedTag { offset: usize },
    /// `<!--` with no matching `-->`.
    UnterminatedComment { offset: usize },
}

impl MarkupError {
    /// Byte offset where the offending construct starts.
    #[must_use]
    pub fn offset(&self) -> usize {
        match self {
            Self::UnterminatedTag { offset } | Self::UnterminatedComment { offset } => *offset,
        }
    }
}

impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedTag { offset } => write!(f, "unterminated tag at byte {offset}"),
            Self::UnterminatedComment { offset } => {
                write!(f, "unterminated comment at byte {offset}")
            }
        }
    }
}

impl std::error::Error for MarkupError {}

/// Parse `input` into a new fragment owned by `doc`.
pub fn parse_fragment(doc: &mut Document, input: &str) -> Result<NodeId, MarkupError> {
    Parser::new(doc, input).run()
}

/// Like [`parse_fragment`], but anything after a syntax error is kept as
/// text instead of failing.
pub fn parse_fragment_lossy(doc: &mut Document, input: &str) -> NodeId {
    let mut parser = Parser::new(doc, input);
    match parser.parse() {
        Ok(()) => {}
        Err(err) => {
            tracing::debug!(error = %err, "markup recovered as text");
            let rest = &input[err.offset()..];
            parser.push_text(Cow::Borrowed(rest));
        }
    }
    parser.fragment
}

struct Parser<'d, 'i> {
    doc: &'d mut Document,
    input: &'i str,
    pos: usize,
    fragment: NodeId,
    open: Vec<NodeId>,
}

impl<'d, 'i> Parser<'d, 'i> {
    fn new(doc: &'d mut Document, input: &'i str) -> Self {
        let fragment = doc.create_fragment();
        Self {
            doc,
            input,
            pos: 0,
            fragment,
            open: vec![fragment],
        }
    }

    fn run(mut self) -> Result<NodeId, MarkupError> {
        self.parse()?;
        tracing::trace!(
            bytes = self.input.len(),
            nodes = self.doc.descendants(self.fragment).count(),
            "parsed markup"
        );
        Ok(self.fragment)
    }

    fn bytes(&self) -> &'i [u8] {
        self.input.as_bytes()
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.fragment)
    }

    fn parse(&mut self) -> Result<(), MarkupError> {
        let input = self.input;
        while self.pos < input.len() {
            let rest = &input[self.pos..];
            if rest.starts_with("<!--") {
                let start = self.pos;
                match rest[4..].find("-->") {
                    Some(end) => self.pos += 4 + end + 3,
                    None => return Err(MarkupError::UnterminatedComment { offset: start }),
                }
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                let start = self.pos;
                match rest.find('>') {
                    Some(end) => self.pos += end + 1,
                    None => return Err(MarkupError::UnterminatedTag { offset: start }),
                }
            } else if rest.starts_with("</") && starts_with_letter(&rest[2..]) {
                self.end_tag()?;
            } else if rest.starts_with('<') && starts_with_letter(&rest[1..]) {
                self.start_tag()?;
            } else {
                // Literal text up to the next `<` that could open a tag.
                let skip = usize::from(rest.starts_with('<'));
                let end = rest[skip..].find('<').map_or(rest.len(), |i| i + skip);
                self.push_text(decode_entities(&rest[..end]));
                self.pos += end;
            }
        }
        Ok(())
    }

    fn read_name(&mut self) -> &'i str {
        let bytes = self.bytes();
        let start = self.pos;
        while self.pos < bytes.len()
            && !bytes[self.pos].is_ascii_whitespace()
            && !matches!(bytes[self.pos], b'>' | b'/' | b'=')
        {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        let bytes = self.bytes();
        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn end_tag(&mut self) -> Result<(), MarkupError> {
        let start = self.pos;
        self.pos += 2;
        let tag = Tag::from_name(self.read_name());
        match self.input[self.pos..].find('>') {
            Some(end) => self.pos += end + 1,
            None => {
                self.pos = start;
                return Err(MarkupError::UnterminatedTag { offset: start });
            }
        }
        // The fragment at the bottom of the stack is never closed.
        if let Some(depth) = self
            .open
            .iter()
            .skip(1)
            .rposition(|&n| self.doc.has_tag(n, &tag))
        {
            self.open.truncate(depth + 1);
        }
        Ok(())
    }

    fn start_tag(&mut self) -> Result<(), MarkupError> {
        let start = self.pos;
        self.pos += 1;
        let tag = Tag::from_name(self.read_name());
        let mut attrs = Attributes::new();
        let mut self_closing = false;
        loop {
            self.skip_whitespace();
            let Some(&byte) = self.bytes().get(self.pos) else {
                self.pos = start;
                return Err(MarkupError::UnterminatedTag { offset: start });
            };
            match byte {
                b'>' => {
                    self.pos += 1;
                    break;
                }
                b'/' => {
                    self.pos += 1;
                    if self.bytes().get(self.pos) == Some(&b'>') {
                        self.pos += 1;
                        self_closing = true;
                        break;
                    }
                }
                b'=' => {
                    // A value with no name; read and drop it.
                    self.pos += 1;
                    self.read_value(start)?;
                }
                _ => {
                    let name = self.read_name().to_ascii_lowercase();
                    self.skip_whitespace();
                    let value = if self.bytes().get(self.pos) == Some(&b'=') {
                        self.pos += 1;
                        self.skip_whitespace();
                        self.read_value(start)?
                    } else {
                        Cow::Borrowed("")
                    };
                    if !attrs.contains(&name) {
                        attrs.set(name, value.into_owned());
                    }
                }
            }
        }

        let flags = tag.flags();
        let element = self.doc.create_element(tag, attrs);
        let parent = self.current();
        if let Err(err) = self.doc.append_child(parent, element) {
            self.doc.report(err);
        }
        if !self_closing && !flags.intersects(TagFlags::VOID | TagFlags::LEAF) {
            self.open.push(element);
        }
        Ok(())
    }

    fn read_value(&mut self, tag_start: usize) -> Result<Cow<'i, str>, MarkupError> {
        let bytes = self.bytes();
        match bytes.get(self.pos) {
            Some(&quote @ (b'"' | b'\'')) => {
                let from = self.pos + 1;
                let Some(len) = bytes[from..].iter().position(|&b| b == quote) else {
                    self.pos = tag_start;
                    return Err(MarkupError::UnterminatedTag { offset: tag_start });
                };
                self.pos = from + len + 1;
                Ok(decode_entities(&self.input[from..from + len]))
            }
            _ => {
                let from = self.pos;
                while self.pos < bytes.len()
                    && !bytes[self.pos].is_ascii_whitespace()
                    && bytes[self.pos] != b'>'
                {
                    self.pos += 1;
                }
                Ok(decode_entities(&self.input[from..self.pos]))
            }
        }
    }

    fn push_text(&mut self, text: Cow<'_, str>) {
        if text.is_empty() {
            return;
        }
        let parent = self.current();
        if let Some(last) = self.doc.last_child(parent)
            && self.doc.is_text(last)
        {
            if let Err(err) = self.doc.append_text(last, &text) {
                self.doc.report(err);
            }
            return;
        }
        let node = self.doc.create_text(text.into_owned());
        if let Err(err) = self.doc.append_child(parent, node) {
            self.doc.report(err);
        }
    }
}

fn starts_with_letter(s: &str) -> bool {
    s.starts_with(|c: char| c.is_ascii_alphabetic())
}

/// Resolve character references in `raw`; unknown references stay literal.
#[must_use]
pub fn decode_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest[1..].find(';').and_then(|semi| {
            let name = &rest[1..1 + semi];
            resolve_reference(name).map(|c| (c, semi + 2))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn resolve_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{A0}'),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{A0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

/// Markup for `id` itself and its subtree (outer markup).
#[must_use]
pub fn serialize(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

/// Markup for the children of `id` (inner markup).
#[must_use]
pub fn serialize_children(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    for &child in doc.children(id) {
        write_node(doc, child, &mut out);
    }
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    let Some(record) = doc.record(id) else {
        return;
    };
    match &record.data {
        NodeData::Text(text) => escape_text(text, out),
        NodeData::Fragment => {
            for &child in &record.children {
                write_node(doc, child, out);
            }
        }
        NodeData::Element(el) => {
            out.push('<');
            out.push_str(el.tag.name());
            for (name, value) in el.attrs.iter() {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attr(value, out);
                out.push('"');
            }
            out.push('>');
            if el.flags.contains(TagFlags::VOID) {
                return;
            }
            for &child in &record.children {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(el.tag.name());
            out.push('>');
        }
    }
}
