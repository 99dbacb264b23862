/// Core types for history entries and selection snapshots.
use serde::{Deserialize, Serialize};

/// Tree-independent snapshot of a selection.
///
/// Each path is a sequence of child indices from the editing root down to the
/// anchor/focus node. A snapshot is only meaningful against the content tree
/// that was current when it was captured; it has to be re-derived after any
/// content replacement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SerializedSelection {
    /// Child indices from the root to the anchor node.
    pub anchor_path: Vec<usize>,
    /// Offset within the anchor node (chars for text, child index for elements).
    pub anchor_offset: usize,
    /// Child indices from the root to the focus node.
    pub focus_path: Vec<usize>,
    /// Offset within the focus node.
    pub focus_offset: usize,
}

impl SerializedSelection {
    /// Creates a collapsed selection (caret) at `path`/`offset`.
    pub fn caret(path: Vec<usize>, offset: usize) -> Self {
        Self {
            anchor_path: path.clone(),
            anchor_offset: offset,
            focus_path: path,
            focus_offset: offset,
        }
    }

    /// Returns true if anchor and focus point at the same position.
    pub fn is_collapsed(&self) -> bool {
        self.anchor_path == self.focus_path && self.anchor_offset == self.focus_offset
    }
}

/// A single undo step: a sanitized content snapshot plus where the caret was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Sanitized markup.
    pub content: String,
    /// Selection at capture time, if the selection was inside the root.
    pub selection: Option<SerializedSelection>,
    /// Capture time in Unix epoch milliseconds.
    pub timestamp: i64,
}

impl HistoryEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(content: String, selection: Option<SerializedSelection>) -> Self {
        Self {
            content,
            selection,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
