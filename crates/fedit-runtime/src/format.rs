#![forbid(unsafe_code)]

//! Inline formatting commands.
//!
//! A format is an inline element kind plus the attributes it must carry:
//! `b`, or `span class="colour" style="color:red"`. Adding a format wraps
//! every selected text node (and `br`/`img`) that does not already sit inside
//! a matching element. Removing one unwraps every matching element the
//! selection touches, after rewrapping the unselected parts of it in shallow
//! clones so only the selection loses the format.

use fedit_dom::{
    Attributes, COLOUR_CLASS, Document, DomError, FONT_FAMILY_CLASS, FONT_SIZE_CLASS,
    HIGHLIGHT_CLASS, NodeId, NodeMask, Tag, TreeWalker, ZWS,
};
use fedit_range::{
    Position, Range, RangeError, expand_to_block_boundaries, fix_cursor, insert_node_in_range,
    merge_inlines, move_boundaries_down, move_boundaries_up, remove_zws, split,
};

use crate::bookmark::{range_from_bookmark, save_range_to_bookmark};
use crate::editor::{Editor, normalize_text};
use crate::error::EditorError;

/// An inline element kind with the attributes it must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    pub tag: Tag,
    pub attributes: Attributes,
}

impl Format {
    /// Format matching any element of kind `tag`.
    #[must_use]
    pub fn new(tag: impl Into<Tag>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Attributes::new(),
        }
    }

    #[must_use]
    pub fn with_attributes(tag: impl Into<Tag>, attributes: Attributes) -> Self {
        Self {
            tag: tag.into(),
            attributes,
        }
    }

    /// `span` identified by a class alone; used to remove font styling.
    fn class_span(class: &str) -> Self {
        Self::with_attributes(Tag::Span, [("class", class)].into_iter().collect())
    }

    fn styled_span(class: &str, style: String) -> Self {
        Self::with_attributes(
            Tag::Span,
            [("class", class.to_string()), ("style", style)]
                .into_iter()
                .collect(),
        )
    }
}

/// Font styling in effect at the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontInfo {
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub family: Option<String>,
    pub size: Option<String>,
}

impl Editor {
    // ====================================================================
    // Queries
    // ====================================================================

    /// Whether the whole selection (or `range`) carries the format.
    #[must_use]
    pub fn has_format(&self, tag: &Tag, attributes: &Attributes, range: Option<Range>) -> bool {
        let doc = &self.doc;
        let root = self.root();
        let mut range = range.unwrap_or_else(|| self.selection());
        if !range.is_within(doc, root) {
            return false;
        }

        // A boundary at the very edge of a text node belongs to its neighbour.
        if !range.is_collapsed() {
            let start = range.start.node;
            if doc.is_text(start)
                && range.start.offset == doc.text_len(start)
                && let Some(before) = doc.next_sibling(start).and_then(|n| Position::before(doc, n))
            {
                range = range.set_start(doc, before);
            }
            let end = range.end.node;
            if doc.is_text(end)
                && range.end.offset == 0
                && let Some(after) = doc.previous_sibling(end).and_then(|n| Position::after(doc, n))
            {
                range = range.set_end(doc, after);
            }
        }

        let Some(common) = range.common_ancestor(doc) else {
            return false;
        };
        if doc.get_nearest(common, root, tag, attributes).is_some() {
            return true;
        }
        if doc.is_text(common) {
            return false;
        }

        let mut walker = TreeWalker::new(common, NodeMask::TEXT, move |doc: &Document, node| {
            range.contains(doc, node, true)
        });
        let mut seen = false;
        while let Some(node) = walker.next_node(doc) {
            if doc.get_nearest(node, root, tag, attributes).is_none() {
                return false;
            }
            seen = true;
        }
        seen
    }

    /// Colour, highlight, font family and size declared by the cursor's
    /// ancestors, nearest first. Empty for a selection spanning elements.
    #[must_use]
    pub fn font_info(&self, range: Option<Range>) -> FontInfo {
        let doc = &self.doc;
        let range = range.unwrap_or_else(|| self.selection());
        let mut info = FontInfo::default();
        let Some(common) = range.common_ancestor(doc) else {
            return info;
        };
        if !range.is_collapsed() && !doc.is_text(common) {
            return info;
        }

        let mut seen = 0;
        for element in doc.ancestors(common) {
            if seen == 4 {
                break;
            }
            let Some(attrs) = doc.attrs(element) else {
                continue;
            };
            let slots = [
                (&mut info.color, "color"),
                (&mut info.background_color, "background-color"),
                (&mut info.family, "font-family"),
                (&mut info.size, "font-size"),
            ];
            for (slot, property) in slots {
                if slot.is_none()
                    && let Some(value) = attrs.style_property(property)
                {
                    *slot = Some(value.to_string());
                    seen += 1;
                }
            }
        }
        info
    }

    // ====================================================================
    // Add / remove
    // ====================================================================

    /// Apply `add` and strip `remove` over the selection (or `range`) as one
    /// undoable command. With `partial`, `remove` unwraps whole elements
    /// even where they extend past the selection.
    pub fn change_format(
        &mut self,
        add: Option<&Format>,
        remove: Option<&Format>,
        range: Option<Range>,
        partial: bool,
    ) -> Result<(), EditorError> {
        let _span = tracing::debug_span!(
            "fedit.editor.change_format",
            add = ?add.map(|f| f.tag.name().to_string()),
            remove = ?remove.map(|f| f.tag.name().to_string()),
        )
        .entered();
        let range = range.unwrap_or_else(|| self.selection());
        let mut range = self.save_undo_state(range)?;
        if let Some(format) = remove {
            range = self.remove_format(format, range, partial)?;
        }
        if let Some(format) = add {
            range = self.add_format(format, range)?;
        }
        self.finish_command(range);
        self.doc_was_changed();
        Ok(())
    }

    fn add_format(&mut self, format: &Format, range: Range) -> Result<Range, RangeError> {
        let root = self.root();

        // A caret gets an empty formatted element to type into.
        if range.is_collapsed() {
            let el = self
                .doc
                .create_element(format.tag.clone(), format.attributes.clone());
            fix_cursor(&mut self.doc, el, root);
            insert_node_in_range(&mut self.doc, range, el)?;
            let caret = match self.doc.first_child(el) {
                Some(text) => Position::new(text, self.doc.length(text)),
                None => Position::new(el, 0),
            };
            let block = self
                .doc
                .ancestors(el)
                .find(|&n| !self.doc.is_inline(n))
                .unwrap_or(root);
            remove_zws(&mut self.doc, block, Some(el));
            self.has_zws = true;
            return Ok(Range::collapsed(caret));
        }

        let Some(common) = range.common_ancestor(&self.doc) else {
            return Ok(range);
        };
        // Wrapped nodes must stay under the walker's root.
        let common = if self.doc.is_text(common) {
            self.doc.parent(common).unwrap_or(common)
        } else {
            common
        };
        let filter = move |doc: &Document, node: NodeId| {
            (doc.is_text(node) || doc.has_tag(node, &Tag::Br) || doc.has_tag(node, &Tag::Img))
                && range.contains(doc, node, true)
        };
        let mut walker = TreeWalker::new(common, NodeMask::TEXT | NodeMask::ELEMENT, filter);

        let (mut start_container, mut start_offset) = (range.start.node, range.start.offset);
        let (mut end_container, mut end_offset) = (range.end.node, range.end.offset);
        walker.set_current(start_container);
        if !filter(&self.doc, start_container) {
            let Some(first) = walker.next_node(&self.doc) else {
                return Ok(range);
            };
            start_container = first;
            start_offset = 0;
        }

        let mut current = Some(start_container);
        let mut last = start_container;
        while let Some(mut node) = current {
            let needs_format = self
                .doc
                .get_nearest(node, root, &format.tag, &format.attributes)
                .is_none();
            if needs_format {
                if self.doc.is_text(node) {
                    if node == end_container && self.doc.text_len(node) > end_offset {
                        self.doc.split_text(node, end_offset)?;
                    }
                    if node == start_container && start_offset > 0 {
                        node = self.doc.split_text(node, start_offset)?;
                        if end_container == start_container {
                            end_container = node;
                            end_offset -= start_offset;
                        }
                        start_container = node;
                        start_offset = 0;
                    }
                }
                let el = self
                    .doc
                    .create_element(format.tag.clone(), format.attributes.clone());
                self.doc.replace_with(node, el)?;
                self.doc.append_child(el, node)?;
            }
            last = node;
            walker.set_current(node);
            current = walker.next_node(&self.doc);
        }

        // Outside a text node the end offset may no longer point past the
        // last formatted node.
        if !self.doc.is_text(end_container) {
            let end = if self.doc.is_text(last) {
                Some(Position::new(last, self.doc.text_len(last)))
            } else {
                Position::after(&self.doc, last)
            };
            if let Some(end) = end {
                end_container = end.node;
                end_offset = end.offset;
            }
        }
        tracing::debug!(tag = format.tag.name(), "added format");
        Ok(Range::new(
            Position::new(start_container, start_offset),
            Position::new(end_container, end_offset),
        ))
    }

    fn remove_format(
        &mut self,
        format: &Format,
        range: Range,
        partial: bool,
    ) -> Result<Range, RangeError> {
        let root = self.root();
        let mut range = save_range_to_bookmark(&mut self.doc, range)?;

        // A caret needs a node of its own to break the formatting around.
        let mut fixer = None;
        if range.is_collapsed() {
            let text = self.doc.create_text(ZWS.to_string());
            range = insert_node_in_range(&mut self.doc, range, text)?;
            self.has_zws = true;
            fixer = Some(text);
        }

        let common = range.common_ancestor(&self.doc).unwrap_or(root);
        let block = self
            .doc
            .ancestors(common)
            .find(|&n| !self.doc.is_inline(n))
            .unwrap_or(root);

        let format_tags: Vec<NodeId> = self
            .doc
            .descendants(block)
            .filter(|&n| {
                self.doc.has_tag_attributes(n, &format.tag, &format.attributes)
                    && range.contains(&self.doc, n, true)
            })
            .collect();

        let mut to_wrap = Vec::new();
        if !partial {
            for &el in &format_tags {
                examine_node(&mut self.doc, &range, el, el, &mut to_wrap)?;
            }
        }
        for (exemplar, node) in to_wrap {
            let el = self.doc.clone_shallow(exemplar)?;
            self.doc.replace_with(node, el)?;
            self.doc.append_child(el, node)?;
        }
        for el in format_tags {
            let children = self.doc.empty(el);
            self.doc.replace_with(el, children)?;
            self.doc.remove(el);
            self.doc.remove(children);
        }

        let mut range = range_from_bookmark(&mut self.doc, root).unwrap_or(range);
        if fixer.is_some() {
            range = range.collapse(false);
        }
        range = merge_inlines(&mut self.doc, block, range);
        if let Some(fixer) = fixer
            && self.doc.is_alive(fixer)
        {
            range = Range::collapsed(Position::new(fixer, self.doc.text_len(fixer)));
        }
        tracing::debug!(tag = format.tag.name(), partial, "removed format");
        Ok(range)
    }

    // ====================================================================
    // Shortcuts
    // ====================================================================

    fn toggle_tag(&mut self, add: Option<Tag>, remove: Option<Tag>) -> Result<(), EditorError> {
        let add = add.map(Format::new);
        let remove = remove.map(Format::new);
        self.change_format(add.as_ref(), remove.as_ref(), None, false)
    }

    pub fn bold(&mut self) -> Result<(), EditorError> {
        self.toggle_tag(Some(Tag::B), None)
    }

    pub fn italic(&mut self) -> Result<(), EditorError> {
        self.toggle_tag(Some(Tag::I), None)
    }

    pub fn underline(&mut self) -> Result<(), EditorError> {
        self.toggle_tag(Some(Tag::U), None)
    }

    pub fn strikethrough(&mut self) -> Result<(), EditorError> {
        self.toggle_tag(Some(Tag::S), None)
    }

    /// Subscript; drops superscript from the selection.
    pub fn subscript(&mut self) -> Result<(), EditorError> {
        self.toggle_tag(Some(Tag::Sub), Some(Tag::Sup))
    }

    /// Superscript; drops subscript from the selection.
    pub fn superscript(&mut self) -> Result<(), EditorError> {
        self.toggle_tag(Some(Tag::Sup), Some(Tag::Sub))
    }

    pub fn remove_bold(&mut self) -> Result<(), EditorError> {
        self.toggle_tag(None, Some(Tag::B))
    }

    pub fn remove_italic(&mut self) -> Result<(), EditorError> {
        self.toggle_tag(None, Some(Tag::I))
    }

    pub fn remove_underline(&mut self) -> Result<(), EditorError> {
        self.toggle_tag(None, Some(Tag::U))
    }

    pub fn remove_strikethrough(&mut self) -> Result<(), EditorError> {
        self.toggle_tag(None, Some(Tag::S))
    }

    pub fn remove_subscript(&mut self) -> Result<(), EditorError> {
        self.toggle_tag(None, Some(Tag::Sub))
    }

    pub fn remove_superscript(&mut self) -> Result<(), EditorError> {
        self.toggle_tag(None, Some(Tag::Sup))
    }

    /// Link the selection to `url`. At a caret the address itself, minus
    /// its scheme, is inserted as the link text.
    ///
    /// `attributes` override `href`; configured defaults for `a` fill in
    /// whatever is still missing.
    pub fn make_link(&mut self, url: &str, attributes: &Attributes) -> Result<(), EditorError> {
        let mut range = self.save_undo_state(self.selection())?;
        if range.is_collapsed() {
            let mut text_start = url.find(':').map_or(0, |i| i + 1);
            if text_start > 0 {
                text_start += url[text_start..].bytes().take_while(|&b| b == b'/').count();
            }
            let text = self.doc.create_text(&url[text_start..]);
            range = insert_node_in_range(&mut self.doc, range, text)?;
        }

        let mut attrs = Attributes::new();
        attrs.set("href", url);
        for (name, value) in attributes.iter() {
            attrs.set(name, value);
        }
        for (name, value) in self.config.tag_attributes.for_tag(&Tag::A).iter() {
            if !attrs.contains(name) {
                attrs.set(name, value);
            }
        }
        self.change_format(
            Some(&Format::with_attributes(Tag::A, attrs)),
            Some(&Format::new(Tag::A)),
            Some(range),
            false,
        )
    }

    /// Unwrap every link the selection touches, entirely.
    pub fn remove_link(&mut self) -> Result<(), EditorError> {
        self.change_format(None, Some(&Format::new(Tag::A)), None, true)
    }

    /// Set the font family, or clear it with `None`.
    pub fn set_font_face(&mut self, name: Option<&str>) -> Result<(), EditorError> {
        let add = name.map(|name| {
            Format::styled_span(FONT_FAMILY_CLASS, format!("font-family: {name}, sans-serif;"))
        });
        let remove = Format::class_span(FONT_FAMILY_CLASS);
        self.change_format(add.as_ref(), Some(&remove), None, false)
    }

    /// Set the font size (any CSS length), or clear it with `None`.
    pub fn set_font_size(&mut self, size: Option<&str>) -> Result<(), EditorError> {
        let add = size.map(|size| Format::styled_span(FONT_SIZE_CLASS, format!("font-size: {size}")));
        let remove = Format::class_span(FONT_SIZE_CLASS);
        self.change_format(add.as_ref(), Some(&remove), None, false)
    }

    pub fn set_text_colour(&mut self, colour: Option<&str>) -> Result<(), EditorError> {
        let add = colour.map(|colour| Format::styled_span(COLOUR_CLASS, format!("color:{colour}")));
        let remove = Format::class_span(COLOUR_CLASS);
        self.change_format(add.as_ref(), Some(&remove), None, false)
    }

    pub fn set_highlight_colour(&mut self, colour: Option<&str>) -> Result<(), EditorError> {
        let add = colour
            .map(|colour| Format::styled_span(HIGHLIGHT_CLASS, format!("background-color:{colour}")));
        let remove = Format::class_span(HIGHLIGHT_CLASS);
        self.change_format(add.as_ref(), Some(&remove), None, false)
    }

    // ====================================================================
    // Remove all formatting
    // ====================================================================

    /// Strip every inline element from the selection (or `range`) and turn
    /// the blocks it covers into default blocks. Text, `br` and `img`
    /// survive. A caret is left alone.
    pub fn remove_all_formatting(&mut self, range: Option<Range>) -> Result<(), EditorError> {
        let _span = tracing::debug_span!("fedit.editor.remove_all_formatting").entered();
        let root = self.root();
        let mut range = range.unwrap_or_else(|| self.selection());
        if range.is_collapsed() || !range.is_within(&self.doc, root) {
            return Ok(());
        }
        let Some(common) = range.common_ancestor(&self.doc) else {
            return Ok(());
        };

        // Split up to the enclosing block, or up to the root when the
        // selection spans blocks.
        let stop = match self.doc.ancestors(common).find(|&n| self.doc.is_block(n)) {
            Some(block) => block,
            None => {
                range = expand_to_block_boundaries(&self.doc, range, root);
                root
            }
        };

        range = self.save_undo_state(range)?;
        range = move_boundaries_up(&self.doc, range, Some(stop), Some(stop), root);

        let after_split = split(&mut self.doc, range.end.node, range.end.offset, stop, root)?;
        let mut node = split(&mut self.doc, range.start.node, range.start.offset, stop, root)?;

        let formatted = self.doc.create_fragment();
        while let Some(current) = node
            && Some(current) != after_split
        {
            node = self.doc.next_sibling(current);
            self.doc.append_child(formatted, current)?;
        }
        let clean = self.doc.create_fragment();
        strip_formatting(&mut self.doc, formatted, clean, root)?;
        self.doc.remove(formatted);
        normalize_text(&mut self.doc, clean);

        let (start_offset, end_offset) = match (self.doc.first_child(clean), self.doc.last_child(clean)) {
            (Some(first), Some(last)) => {
                self.doc.insert_before(stop, clean, after_split)?;
                let start = self.doc.index_of(first).unwrap_or(0);
                let end = self.doc.index_of(last).map_or(start, |i| i + 1);
                (start, end)
            }
            _ => {
                let at = after_split
                    .and_then(|n| self.doc.index_of(n))
                    .unwrap_or_else(|| self.doc.length(stop));
                (at, at)
            }
        };
        self.doc.remove(clean);

        let range = Range::new(
            Position::new(stop, start_offset),
            Position::new(stop, end_offset),
        );
        let range = merge_inlines(&mut self.doc, stop, range);
        let range = move_boundaries_down(&self.doc, range);
        self.finish_command(range);
        self.doc_was_changed();
        Ok(())
    }
}

/// Collect the parts of a format element that lie outside `range`, each
/// paired with the element to clone around it. Text straddling a boundary
/// is split first.
fn examine_node(
    doc: &mut Document,
    range: &Range,
    node: NodeId,
    exemplar: NodeId,
    to_wrap: &mut Vec<(NodeId, NodeId)>,
) -> Result<(), DomError> {
    if range.contains(doc, node, false) {
        return Ok(());
    }
    let is_text = doc.is_text(node);
    if !range.contains(doc, node, true) {
        // Bookmark sentinels and empty text stay bare.
        if !doc.has_tag(node, &Tag::Input) && (!is_text || doc.text_len(node) > 0) {
            to_wrap.push((exemplar, node));
        }
        return Ok(());
    }
    if is_text {
        if node == range.end.node && range.end.offset != doc.text_len(node) {
            let after = doc.split_text(node, range.end.offset)?;
            to_wrap.push((exemplar, after));
        }
        if node == range.start.node && range.start.offset > 0 {
            doc.split_text(node, range.start.offset)?;
            to_wrap.push((exemplar, node));
        }
    } else {
        let mut child = doc.first_child(node);
        while let Some(current) = child {
            child = doc.next_sibling(current);
            examine_node(doc, range, current, exemplar, to_wrap)?;
        }
    }
    Ok(())
}

/// Move the content of `node` into `clean`: text, `br` and `img` as they
/// are, blocks rebuilt as default blocks, every other element dropped.
fn strip_formatting(
    doc: &mut Document,
    node: NodeId,
    clean: NodeId,
    root: NodeId,
) -> Result<(), DomError> {
    let mut child = doc.first_child(node);
    while let Some(current) = child {
        child = doc.next_sibling(current);
        if doc.is_inline(current) {
            if doc.is_text(current) || doc.has_tag(current, &Tag::Br) || doc.has_tag(current, &Tag::Img) {
                doc.append_child(clean, current)?;
                continue;
            }
        } else if doc.is_block(current) {
            let block = doc.create_default_block();
            let inner = doc.create_fragment();
            strip_formatting(doc, current, inner, root)?;
            doc.append_child(block, inner)?;
            doc.remove(inner);
            fix_cursor(doc, block, root);
            doc.append_child(clean, block)?;
            continue;
        }
        strip_formatting(doc, current, clean, root)?;
    }
    Ok(())
}
