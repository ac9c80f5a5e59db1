#![forbid(unsafe_code)]

//! Notifications queued by editor commands.

/// Something the host may want to react to.
///
/// Events are queued while a command runs and handed out by
/// [`Editor::drain_events`](crate::Editor::drain_events), so a handler never
/// observes a half-finished mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// The document content changed.
    Input,
    /// Undo or redo availability may have changed.
    UndoStateChange { can_undo: bool, can_redo: bool },
    /// The element path at the cursor changed.
    PathChange { path: String },
    /// A non-empty selection was set.
    Select,
}

impl EditorEvent {
    /// Short name, as used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::UndoStateChange { .. } => "undoStateChange",
            Self::PathChange { .. } => "pathChange",
            Self::Select => "select",
        }
    }
}
