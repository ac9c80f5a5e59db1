#![forbid(unsafe_code)]

//! Whole-document snapshot history.
//!
//! The editor never patches the tree on undo. Each checkpoint is the full
//! serialized document with the selection embedded as bookmark sentinels,
//! and moving through history replaces the whole tree with one of them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       SnapshotStore                          │
//! │                                                              │
//! │   Undo Stack (VecDeque<Arc<str>>)                            │
//! │   ┌─────┬─────┬─────┬─────┐                                  │
//! │   │ S0  │ S1  │ S2  │ S3  │  ← back is the checkpoint the    │
//! │   └─────┴─────┴─────┴─────┘    document was last restored to │
//! │     ↑ evicted first                                          │
//! │                                                              │
//! │   Redo Stack (VecDeque<Arc<str>>)                            │
//! │   ┌─────┬─────┐                                              │
//! │   │ S5  │ S4  │  ← back is the next checkpoint to redo       │
//! │   └─────┴─────┘                                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Thinning
//!
//! Two independent bounds keep the history small:
//!
//! - When a checkpoint is larger than
//!   [`UndoConfig::document_size_threshold`] bytes, the store keeps at most
//!   [`UndoConfig::undo_limit`] checkpoints.
//! - The store never keeps more than [`UndoConfig::max_depth`] checkpoints.
//!
//! Eviction always drops the oldest checkpoint first.
//!
//! # Invariants
//!
//! 1. Pushing clears the redo stack.
//! 2. Undo needs at least two checkpoints: the back one stays as "current".
//! 3. The most recently pushed checkpoint is never evicted.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Bounds on the undo history.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct UndoConfig {
    /// Checkpoints larger than this many bytes switch on `undo_limit`.
    /// `None` disables size-based thinning.
    pub document_size_threshold: Option<usize>,

    /// How many checkpoints to keep once the threshold is exceeded.
    /// `None` keeps them all.
    pub undo_limit: Option<usize>,

    /// Hard ceiling on the number of checkpoints.
    pub max_depth: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            document_size_threshold: None,
            undo_limit: None,
            max_depth: 100,
        }
    }
}

impl UndoConfig {
    /// History with no size-based thinning and the given hard ceiling.
    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    /// Keep at most `undo_limit` checkpoints of documents above
    /// `threshold` bytes.
    #[must_use]
    pub fn thinned(threshold: usize, undo_limit: usize) -> Self {
        Self {
            document_size_threshold: Some(threshold),
            undo_limit: Some(undo_limit),
            ..Self::default()
        }
    }

    /// No bounds at all.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::with_max_depth(usize::MAX)
    }

    fn limit_for(&self, size: usize) -> usize {
        let thinned = match (self.document_size_threshold, self.undo_limit) {
            (Some(threshold), Some(limit)) if size > threshold => limit,
            _ => usize::MAX,
        };
        thinned.min(self.max_depth).max(1)
    }
}

/// Linear history of serialized document checkpoints.
pub struct SnapshotStore {
    undo_stack: VecDeque<Arc<str>>,
    redo_stack: VecDeque<Arc<str>>,
    config: UndoConfig,
}

impl fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("bytes", &self.total_bytes())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(UndoConfig::default())
    }
}

impl SnapshotStore {
    #[must_use]
    pub fn new(config: UndoConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            config,
        }
    }

    // ====================================================================
    // Core Operations
    // ====================================================================

    /// Record a checkpoint. Any redo history is discarded, then the
    /// bounds are applied against the new checkpoint's size.
    pub fn push(&mut self, snapshot: impl Into<Arc<str>>) {
        let snapshot = snapshot.into();
        let size = snapshot.len();
        self.redo_stack.clear();
        self.undo_stack.push_back(snapshot);
        let evicted = self.enforce_limit(self.config.limit_for(size));
        tracing::debug!(
            bytes = size,
            depth = self.undo_stack.len(),
            evicted,
            "recorded undo checkpoint"
        );
    }

    /// Step back one checkpoint and return the one to restore.
    ///
    /// Returns `None`, changing nothing, when fewer than two checkpoints
    /// exist.
    pub fn undo(&mut self) -> Option<Arc<str>> {
        if self.undo_stack.len() < 2 {
            return None;
        }
        let left = self.undo_stack.pop_back()?;
        self.redo_stack.push_back(left);
        self.undo_stack.back().cloned()
    }

    /// Step forward one checkpoint and return the one to restore.
    pub fn redo(&mut self) -> Option<Arc<str>> {
        let snapshot = self.redo_stack.pop_back()?;
        self.undo_stack.push_back(Arc::clone(&snapshot));
        Some(snapshot)
    }

    /// The checkpoint the history currently sits on.
    #[must_use]
    pub fn current(&self) -> Option<&Arc<str>> {
        self.undo_stack.back()
    }

    // ====================================================================
    // Queries
    // ====================================================================

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() >= 2
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Checkpoints up to and including the current one.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    #[must_use]
    pub fn total_snapshots(&self) -> usize {
        self.undo_stack.len() + self.redo_stack.len()
    }

    /// Bytes held across both stacks.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.undo_stack
            .iter()
            .chain(&self.redo_stack)
            .map(|s| s.len())
            .sum()
    }

    #[must_use]
    pub fn config(&self) -> &UndoConfig {
        &self.config
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty() && self.redo_stack.is_empty()
    }

    // ====================================================================
    // Maintenance
    // ====================================================================

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Drop the oldest checkpoints until at most `limit` remain.
    fn enforce_limit(&mut self, limit: usize) -> usize {
        let mut evicted = 0;
        while self.undo_stack.len() > limit {
            self.undo_stack.pop_front();
            evicted += 1;
        }
        evicted
    }
}
