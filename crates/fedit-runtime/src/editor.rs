#![forbid(unsafe_code)]

//! The editor session.
//!
//! An [`Editor`] owns one [`Document`], the live selection, the undo history
//! and a queue of [`EditorEvent`]s. Every command follows the same shape:
//!
//! 1. checkpoint the document (unless nothing changed since the last one),
//! 2. run the structural edit through `fedit-range`,
//! 3. store the resulting selection and queue the notifications.
//!
//! Commands never call back into host code while the tree is being changed;
//! the host collects notifications afterwards with
//! [`drain_events`](Editor::drain_events).
//!
//! # Undo state
//!
//! "In undo state" means the document is exactly the checkpoint the history
//! sits on. Recording a checkpoint sets it; any content change clears it
//! through [`doc_was_changed`](Editor::doc_was_changed), so the next command
//! records a fresh checkpoint instead of overwriting the last one.

use std::collections::VecDeque;

use fedit_dom::{
    Attributes, Document, NodeId, NodeMask, Tag, TreeWalker, ZWS, has_content, parse_fragment,
    parse_fragment_lossy, serialize_children,
};
use fedit_range::{
    Position, Range, RangeError, cleanup_brs, collapse_whitespace, delete_contents, fix_container,
    fix_cursor, get_start_block, insert_fragment, insert_node_in_range, move_boundaries_down,
    remove_empty_inlines, remove_zws, split_before, split_block,
};

use crate::bookmark::{range_from_bookmark, save_range_to_bookmark};
use crate::config::{ConfigError, EditorConfig};
use crate::error::EditorError;
use crate::event::EditorEvent;
use crate::undo::SnapshotStore;

const START_FRAGMENT: &str = "<!--StartFragment-->";
const END_FRAGMENT: &str = "<!--EndFragment-->";

/// A rich-text editing session over one document.
pub struct Editor {
    pub(crate) doc: Document,
    pub(crate) config: EditorConfig,
    pub(crate) selection: Range,
    pub(crate) undo: SnapshotStore,
    pub(crate) in_undo_state: bool,
    ignore_all_changes: bool,
    pub(crate) has_zws: bool,
    path: String,
    last_anchor: Option<NodeId>,
    last_focus: Option<NodeId>,
    events: VecDeque<EditorEvent>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("doc", &self.doc)
            .field("selection", &self.selection)
            .field("undo", &self.undo)
            .field("in_undo_state", &self.in_undo_state)
            .field("path", &self.path)
            .field("pending_events", &self.events.len())
            .finish()
    }
}

impl Editor {
    /// Start a session over an empty document.
    ///
    /// The document receives one default block and the history its first
    /// checkpoint.
    pub fn new(config: EditorConfig) -> Result<Self, EditorError> {
        let problems = config.validate();
        if !problems.is_empty() {
            return Err(ConfigError::Validation(problems).into());
        }
        let doc = Document::with_block_template(config.block_template());
        let root = doc.root();
        let mut editor = Self {
            doc,
            undo: SnapshotStore::new(config.undo.clone()),
            config,
            selection: Range::collapsed(Position::new(root, 0)),
            in_undo_state: false,
            ignore_all_changes: false,
            has_zws: false,
            path: String::new(),
            last_anchor: None,
            last_focus: None,
            events: VecDeque::new(),
        };
        editor.set_markup("")?;
        Ok(editor)
    }

    /// Session with [`EditorConfig::default`].
    pub fn with_default_config() -> Result<Self, EditorError> {
        Self::new(EditorConfig::default())
    }

    // ====================================================================
    // Accessors
    // ====================================================================

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.doc.root()
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    #[must_use]
    pub fn undo_store(&self) -> &SnapshotStore {
        &self.undo
    }

    /// Take every notification queued since the last call.
    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        self.events.drain(..).collect()
    }

    pub(crate) fn fire(&mut self, event: EditorEvent) {
        tracing::trace!(event = event.name(), "queued editor event");
        self.events.push_back(event);
    }

    // ====================================================================
    // Change tracking
    // ====================================================================

    /// Note that the document content changed outside of a checkpoint.
    pub fn doc_was_changed(&mut self) {
        if self.ignore_all_changes {
            return;
        }
        if self.in_undo_state {
            self.in_undo_state = false;
            self.fire(EditorEvent::UndoStateChange {
                can_undo: true,
                can_redo: false,
            });
        }
        self.fire(EditorEvent::Input);
    }

    /// Run a batch of direct edits, reported as one change afterwards.
    pub fn modify_document<R>(&mut self, f: impl FnOnce(&mut Document) -> R) -> R {
        self.ignore_all_changes = true;
        let out = f(&mut self.doc);
        self.ignore_all_changes = false;
        self.doc_was_changed();
        out
    }

    // ====================================================================
    // Selection
    // ====================================================================

    /// The current selection, re-resolved from the start of the document
    /// if it no longer fits the tree.
    #[must_use]
    pub fn selection(&self) -> Range {
        if self.selection.is_within(&self.doc, self.root()) {
            self.selection
        } else {
            self.start_caret()
        }
    }

    pub fn set_selection(&mut self, range: Range) {
        let range = if range.is_within(&self.doc, self.root()) {
            range
        } else {
            tracing::warn!(?range, "selection does not resolve; moving to document start");
            self.start_caret()
        };
        self.selection = range;
        self.update_path(range, false);
    }

    fn start_caret(&self) -> Range {
        move_boundaries_down(&self.doc, Range::collapsed(Position::new(self.root(), 0)))
    }

    fn move_cursor_to(&mut self, to_start: bool) {
        let root = self.root();
        let offset = if to_start { 0 } else { self.doc.length(root) };
        let range = move_boundaries_down(&self.doc, Range::collapsed(Position::new(root, offset)));
        self.set_selection(range);
    }

    pub fn move_cursor_to_start(&mut self) {
        self.move_cursor_to(true);
    }

    pub fn move_cursor_to_end(&mut self) {
        self.move_cursor_to(false);
    }

    /// Text of the selection. Line breaks and block boundaries after text
    /// become `\n`.
    #[must_use]
    pub fn selected_text(&self) -> String {
        let range = self.selection();
        let Some(common) = range.common_ancestor(&self.doc) else {
            return String::new();
        };
        let filter = move |doc: &Document, node: NodeId| range.contains(doc, node, true);
        let mut walker = TreeWalker::new(common, NodeMask::ELEMENT | NodeMask::TEXT, filter);
        walker.set_current(range.start.node);
        let mut node = if filter(&self.doc, range.start.node) {
            Some(range.start.node)
        } else {
            walker.next_node(&self.doc)
        };

        let mut out = String::new();
        let mut added_text_in_block = false;
        while let Some(current) = node {
            if let Some(data) = self.doc.text(current) {
                if has_content(data) {
                    let from = if current == range.start.node { range.start.offset } else { 0 };
                    let to = if current == range.end.node {
                        range.end.offset
                    } else {
                        usize::MAX
                    };
                    out.extend(data.chars().take(to).skip(from));
                    added_text_in_block = true;
                }
            } else if self.doc.has_tag(current, &Tag::Br)
                || (added_text_in_block && !self.doc.is_inline(current))
            {
                out.push('\n');
                added_text_in_block = false;
            }
            node = walker.next_node(&self.doc);
        }
        out
    }

    /// Element path at the cursor, or `(selection)` when the selection
    /// spans containers.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn update_path(&mut self, range: Range, force: bool) {
        let anchor = range.start.node;
        let focus = range.end.node;
        if force || self.last_anchor != Some(anchor) || self.last_focus != Some(focus) {
            self.last_anchor = Some(anchor);
            self.last_focus = Some(focus);
            let path = if anchor == focus {
                self.doc.get_path(focus, self.root())
            } else {
                "(selection)".to_string()
            };
            if path != self.path {
                self.path = path.clone();
                self.fire(EditorEvent::PathChange { path });
            }
        }
        if !range.is_collapsed() {
            self.fire(EditorEvent::Select);
        }
    }

    /// Store `range` as the selection after a command and refresh the path.
    pub(crate) fn finish_command(&mut self, range: Range) {
        self.selection = range;
        self.update_path(range, true);
    }

    // ====================================================================
    // Undo
    // ====================================================================

    /// Record a checkpoint unless the document is unchanged since the last
    /// one. The bookmark is left in the tree; the returned range lies
    /// between its sentinels.
    pub fn record_undo_state(&mut self, range: Range) -> Result<Range, RangeError> {
        if self.in_undo_state {
            return Ok(range);
        }
        let range = save_range_to_bookmark(&mut self.doc, range)?;
        let snapshot = serialize_children(&self.doc, self.root());
        self.undo.push(snapshot);
        self.in_undo_state = true;
        Ok(range)
    }

    /// Record a checkpoint (if needed) and return `range` re-resolved after
    /// the bookmark is removed again.
    pub fn save_undo_state(&mut self, range: Range) -> Result<Range, RangeError> {
        if self.in_undo_state {
            return Ok(range);
        }
        let root = self.root();
        let range = self.record_undo_state(range)?;
        Ok(range_from_bookmark(&mut self.doc, root).unwrap_or(range))
    }

    /// Bookmark `range`, recording a checkpoint on the way if needed.
    pub(crate) fn bookmark_for_command(&mut self, range: Range) -> Result<Range, RangeError> {
        if self.in_undo_state {
            save_range_to_bookmark(&mut self.doc, range)
        } else {
            self.record_undo_state(range)
        }
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.undo.can_undo() || (!self.in_undo_state && !self.undo.is_empty())
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.in_undo_state && self.undo.can_redo()
    }

    /// Restore the previous checkpoint. Changes since the last checkpoint
    /// are recorded first so they can be redone.
    ///
    /// Returns `false`, doing nothing, when there is no earlier checkpoint.
    pub fn undo(&mut self) -> bool {
        let _span = tracing::debug_span!("fedit.editor.undo").entered();
        if self.in_undo_state && !self.undo.can_undo() {
            return false;
        }
        let root = self.root();
        let selection = self.selection();
        if let Err(err) = self.record_undo_state(selection) {
            tracing::warn!(error = %err, "could not checkpoint before undo");
        }
        let Some(snapshot) = self.undo.undo() else {
            range_from_bookmark(&mut self.doc, root);
            return false;
        };
        self.restore_snapshot(&snapshot);
        self.in_undo_state = true;
        let can_undo = self.undo.can_undo();
        self.fire(EditorEvent::UndoStateChange {
            can_undo,
            can_redo: true,
        });
        self.fire(EditorEvent::Input);
        true
    }

    /// Restore the checkpoint undone last.
    ///
    /// Returns `false` when nothing was undone since the last change.
    pub fn redo(&mut self) -> bool {
        let _span = tracing::debug_span!("fedit.editor.redo").entered();
        if !self.in_undo_state {
            return false;
        }
        let Some(snapshot) = self.undo.redo() else {
            return false;
        };
        self.restore_snapshot(&snapshot);
        let can_redo = self.undo.can_redo();
        self.fire(EditorEvent::UndoStateChange {
            can_undo: true,
            can_redo,
        });
        self.fire(EditorEvent::Input);
        true
    }

    /// Replace the whole tree with a checkpoint and pick its selection back
    /// up from the embedded bookmark.
    fn restore_snapshot(&mut self, snapshot: &str) {
        let root = self.root();
        self.doc.clear_children(root);
        let frag = parse_fragment_lossy(&mut self.doc, snapshot);
        if let Err(err) = self.doc.append_child(root, frag) {
            tracing::warn!(error = %err, "could not restore checkpoint");
            self.doc.report(err);
        }
        self.doc.remove(frag);

        let mut node = Some(root);
        while let Some(current) = node {
            fix_cursor(&mut self.doc, current, root);
            node = self.doc.next_block(current, root);
        }

        let range = range_from_bookmark(&mut self.doc, root).unwrap_or_else(|| self.start_caret());
        self.selection = range;
        self.update_path(range, false);
    }

    // ====================================================================
    // Document I/O
    // ====================================================================

    /// Replace the document with `markup` and start a fresh history.
    pub fn set_markup(&mut self, markup: &str) -> Result<(), EditorError> {
        let _span = tracing::debug_span!("fedit.editor.set_markup", bytes = markup.len()).entered();
        let frag = parse_fragment(&mut self.doc, markup)?;
        let root = self.root();

        collapse_whitespace(&mut self.doc, frag, false);
        cleanup_brs(&mut self.doc, frag, root, false)?;
        fix_container(&mut self.doc, frag, root)?;
        for block in self.blocks_in(frag) {
            fix_cursor(&mut self.doc, block, root);
        }

        self.doc.clear_children(root);
        self.doc.append_child(root, frag)?;
        self.doc.remove(frag);
        fix_cursor(&mut self.doc, root, root);

        self.undo.clear();
        self.in_undo_state = false;
        self.has_zws = false;

        let range = match range_from_bookmark(&mut self.doc, root) {
            Some(range) => range,
            None => {
                let first = self.doc.first_child(root).unwrap_or(root);
                Range::collapsed(Position::new(first, 0))
            }
        };
        let range = self.save_undo_state(range)?;
        self.finish_command(range);
        Ok(())
    }

    /// The document as markup, without zero-width placeholders.
    #[must_use]
    pub fn markup(&self) -> String {
        serialize_children(&self.doc, self.root()).replace(ZWS, "")
    }

    /// The document as markup with the selection embedded as a bookmark.
    pub fn markup_with_bookmark(&mut self) -> String {
        let range = self.selection();
        if let Err(err) = save_range_to_bookmark(&mut self.doc, range) {
            tracing::warn!(error = %err, "could not bookmark selection");
            return self.markup();
        }
        let markup = self.markup();
        let root = self.root();
        if let Some(range) = range_from_bookmark(&mut self.doc, root) {
            self.selection = range;
        }
        markup
    }

    /// Insert `markup` at the selection, replacing any selected content.
    ///
    /// With `is_paste`, only the part between clipboard fragment markers is
    /// used when both markers are present.
    pub fn insert_markup(&mut self, markup: &str, is_paste: bool) -> Result<(), EditorError> {
        let _span = tracing::debug_span!("fedit.editor.insert_markup", bytes = markup.len()).entered();
        let markup = if is_paste {
            clipboard_fragment(markup)
        } else {
            markup
        };
        let root = self.root();
        let range = self.save_undo_state(self.selection())?;
        let frag = parse_fragment(&mut self.doc, markup)?;

        collapse_whitespace(&mut self.doc, frag, false);
        cleanup_brs(&mut self.doc, frag, root, false)?;
        remove_empty_inlines(&mut self.doc, frag);
        normalize_text(&mut self.doc, frag);
        for block in self.blocks_in(frag) {
            fix_cursor(&mut self.doc, block, root);
        }

        let range = match insert_fragment(&mut self.doc, range, frag, root) {
            Ok(range) => range,
            Err(err) => {
                self.doc.remove(frag);
                return Err(err.into());
            }
        };
        self.doc_was_changed();
        let range = range.collapse(false);
        self.ensure_bottom_line()?;
        self.finish_command(range);
        Ok(())
    }

    /// Insert plain text at the selection. Middle lines become blocks of
    /// their own.
    pub fn insert_plain_text(&mut self, text: &str, is_paste: bool) -> Result<(), EditorError> {
        let tag = self.config.block_tag();
        let mut open = format!("<{}", tag.name());
        for (name, value) in &self.config.block_attributes {
            open.push_str(&format!(" {name}=\"{}\"", escape_markup(value)));
        }
        open.push('>');
        let close = format!("</{}>", tag.name());

        let lines: Vec<&str> = text.split('\n').collect();
        let count = lines.len();
        let mut markup = String::new();
        for (i, line) in lines.iter().enumerate() {
            let line = escape_line(line);
            // The first and last lines join the text around the caret; a
            // lone second line still needs a block to start a new line.
            let wrap = i > 0 && (i + 1 < count || count == 2);
            if wrap {
                markup.push_str(&open);
                markup.push_str(if line.is_empty() { "<br>" } else { &line });
                markup.push_str(&close);
            } else {
                markup.push_str(&line);
            }
        }
        self.insert_markup(&markup, is_paste)
    }

    /// Insert an element at the start of the selection.
    ///
    /// Inline elements go in at the caret. A block splits the tree up to the
    /// root and goes in between the halves; inserted at the very end, it
    /// gets a blank line after it.
    pub fn insert_element(&mut self, el: NodeId, range: Option<Range>) -> Result<(), EditorError> {
        let _span = tracing::debug_span!("fedit.editor.insert_element", node = ?el).entered();
        let root = self.root();
        let range = range.unwrap_or_else(|| self.selection()).collapse(true);
        let range = if self.doc.is_inline(el) {
            insert_node_in_range(&mut self.doc, range, el)?;
            match Position::after(&self.doc, el) {
                Some(after) => Range::collapsed(after),
                None => range,
            }
        } else {
            let mut split_node = get_start_block(&self.doc, &range, root).unwrap_or(root);
            while split_node != root && self.doc.next_sibling(split_node).is_none() {
                match self.doc.parent(split_node) {
                    Some(parent) => split_node = parent,
                    None => break,
                }
            }
            let mut after = None;
            if split_node != root
                && let Some(parent) = self.doc.parent(split_node)
            {
                let next = self.doc.next_sibling(split_node);
                after = split_before(&mut self.doc, parent, next, root, root)?;
            }
            let after = match after {
                Some(after) => {
                    self.doc.insert_before(root, el, Some(after))?;
                    after
                }
                None => {
                    self.doc.append_child(root, el)?;
                    let blank = self.create_default_block();
                    self.doc.append_child(root, blank)?;
                    blank
                }
            };
            move_boundaries_down(&self.doc, Range::collapsed(Position::new(after, 0)))
        };
        self.selection = range;
        self.update_path(range, false);
        self.doc_was_changed();
        Ok(())
    }

    /// Insert an `img` at the selection and return it.
    pub fn insert_image(&mut self, src: &str, attributes: &Attributes) -> Result<NodeId, EditorError> {
        let mut attrs = Attributes::new();
        attrs.set("src", src);
        for (name, value) in attributes.iter() {
            attrs.set(name, value);
        }
        let img = self.doc.create_element(Tag::Img, attrs);
        self.insert_element(img, None)?;
        Ok(img)
    }

    /// Split the block at the cursor, as pressing Enter does.
    ///
    /// Selected content is deleted first. The cursor ends up at the start of
    /// the new block.
    pub fn split_block_at_selection(&mut self) -> Result<(), EditorError> {
        let _span = tracing::debug_span!("fedit.editor.split_block").entered();
        let root = self.root();
        let range = self.selection();
        let range = self.bookmark_for_command(range)?;
        self.remove_zws();
        let mut range = range_from_bookmark(&mut self.doc, root).unwrap_or(range);

        if !range.is_collapsed() {
            let (removed, caret) = delete_contents(&mut self.doc, range, root)?;
            self.doc.remove(removed);
            range = caret;
        }
        range = move_boundaries_down(&self.doc, range);

        let block = match get_start_block(&self.doc, &range, root) {
            Some(block) => block,
            None => {
                fix_container(&mut self.doc, root, root)?;
                match get_start_block(&self.doc, &range, root) {
                    Some(block) => block,
                    None => {
                        tracing::warn!(?range, "no block at the cursor to split");
                        return Ok(());
                    }
                }
            }
        };
        let new_block = split_block(&mut self.doc, block, range.start.node, range.start.offset, root)?;
        let caret = move_boundaries_down(&self.doc, Range::collapsed(Position::new(new_block, 0)));
        self.finish_command(caret);
        self.doc_was_changed();
        Ok(())
    }

    /// Strip the zero-width placeholders left by formatting a caret, if any
    /// were added.
    pub fn remove_zws(&mut self) {
        if !self.has_zws {
            return;
        }
        let root = self.root();
        remove_zws(&mut self.doc, root, None);
        self.has_zws = false;
    }

    // ====================================================================
    // Internal helpers
    // ====================================================================

    pub(crate) fn blocks_in(&self, node: NodeId) -> Vec<NodeId> {
        self.doc
            .descendants(node)
            .filter(|&n| self.doc.is_block(n))
            .collect()
    }

    /// A focusable default block.
    pub(crate) fn create_default_block(&mut self) -> NodeId {
        let root = self.root();
        let block = self.doc.create_default_block();
        fix_cursor(&mut self.doc, block, root)
    }

    /// Make sure the document ends with a default block so there is always
    /// a line to move below the last list or quote.
    fn ensure_bottom_line(&mut self) -> Result<(), EditorError> {
        let root = self.root();
        let block_tag = self.config.block_tag();
        let last = self
            .doc
            .children(root)
            .iter()
            .rev()
            .copied()
            .find(|&n| self.doc.is_element(n));
        let fine = last.is_some_and(|n| self.doc.has_tag(n, &block_tag) && self.doc.is_block(n));
        if !fine {
            let block = self.create_default_block();
            self.doc.append_child(root, block)?;
        }
        Ok(())
    }
}

/// Join adjacent text nodes and drop empty ones throughout `node`.
pub(crate) fn normalize_text(doc: &mut Document, node: NodeId) {
    let mut i = 0;
    while let Some(child) = doc.child(node, i) {
        if let Some(data) = doc.text(child) {
            if data.is_empty() {
                doc.remove(child);
                continue;
            }
            if let Some(next) = doc.next_sibling(child)
                && let Some(more) = doc.text(next).map(str::to_owned)
            {
                if let Err(err) = doc.append_text(child, &more) {
                    doc.report(err);
                }
                doc.remove(next);
                continue;
            }
        } else {
            normalize_text(doc, child);
        }
        i += 1;
    }
}

fn clipboard_fragment(markup: &str) -> &str {
    match (markup.find(START_FRAGMENT), markup.rfind(END_FRAGMENT)) {
        (Some(start), Some(end)) if start + START_FRAGMENT.len() <= end => {
            &markup[start + START_FRAGMENT.len()..end]
        }
        _ => markup,
    }
}

pub(crate) fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a line of plain text; a space followed by another space becomes
/// `&nbsp;` so runs of spaces survive whitespace collapsing.
fn escape_line(line: &str) -> String {
    let escaped = escape_markup(line);
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' && chars.peek() == Some(&' ') {
            out.push_str("&nbsp;");
        } else {
            out.push(c);
        }
    }
    out
}
