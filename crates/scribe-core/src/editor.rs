//! Editing-surface glue: routes edits through the sanitizer into history.
//!
//! Every change follows the same order: mutate the document, sanitize its
//! markup, then hand the sanitized markup to the history manager. Undo and
//! redo apply the returned content first and restore the selection after.

use tracing::debug;

use crate::document::{Document, NodeId, SharedDocument};
use crate::history::{self, DocumentHistory, HistoryConfig, HistoryState, RestoreOutcome};
use crate::markup;
use crate::sanitize::Sanitizer;

/// Keys the surface reports to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Delete,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Tab,
    Escape,
}

impl Key {
    /// Keys that end the current typing burst.
    pub fn is_break_point(self) -> bool {
        matches!(
            self,
            Key::Enter
                | Key::Backspace
                | Key::Delete
                | Key::ArrowLeft
                | Key::ArrowRight
                | Key::ArrowUp
                | Key::ArrowDown
        )
    }
}

/// A document with sanitized undo history.
pub struct Editor {
    document: SharedDocument,
    sanitizer: Sanitizer,
    history: DocumentHistory,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("backend", &self.sanitizer.backend())
            .field("history", &self.history)
            .finish()
    }
}

impl Editor {
    /// Loads `initial` (sanitized) and records it as the first history entry.
    pub fn new(
        initial: &str,
        sanitizer: Sanitizer,
        config: HistoryConfig,
        on_state_change: impl FnMut(HistoryState) + 'static,
    ) -> Self {
        let content = sanitizer.sanitize(initial);
        let document = SharedDocument::new(Document::from_markup(&content));
        document.borrow_mut().place_caret_at_end();

        let mut history = DocumentHistory::new(document.clone(), on_state_change, config);
        history.push_immediate(content);

        Self {
            document,
            sanitizer,
            history,
        }
    }

    /// Editor with the default sanitizer, default history size, and no listener.
    pub fn with_content(initial: &str) -> Self {
        Self::new(initial, Sanitizer::new(), HistoryConfig::default(), |_| {})
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn history(&self) -> &DocumentHistory {
        &self.history
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    /// Current markup of the surface.
    pub fn content(&self) -> String {
        self.document.borrow().to_markup()
    }

    // ── Input events ───────────────────────────────────────────────────

    /// Commits pending typing on break-point keys. The key's own effect is
    /// applied by the caller (see [`Editor::backspace`]).
    pub fn key_down(&mut self, key: Key) {
        if key.is_break_point() {
            self.history.commit_typing();
        }
    }

    /// Pointer press that moves the caret.
    pub fn pointer_down(&mut self, node: NodeId, offset: usize) {
        self.history.commit_typing();
        self.document.borrow_mut().set_caret(node, offset);
    }

    /// Moves the caret as an arrow key would.
    pub fn move_caret(&mut self, key: Key, node: NodeId, offset: usize) {
        self.key_down(key);
        self.document.borrow_mut().set_caret(node, offset);
    }

    /// Types `text` at the caret.
    pub fn type_text(&mut self, text: &str) {
        for ch in text.chars() {
            self.key_down(Key::Char(ch));
            let mut buf = [0u8; 4];
            self.document.borrow_mut().insert_text(ch.encode_utf8(&mut buf));
            self.input();
        }
    }

    /// Deletes the char before the caret.
    pub fn backspace(&mut self) {
        self.key_down(Key::Backspace);
        if self.document.borrow_mut().delete_backward() {
            self.input();
        }
    }

    /// Records the surface content as part of the current typing burst.
    pub fn input(&mut self) {
        let content = self.sanitize_surface();
        self.history.push_typing(content);
    }

    // ── Discrete edits ─────────────────────────────────────────────────

    /// Applies a format or structural command as its own undo step.
    pub fn apply_format(&mut self, command: impl FnOnce(&mut Document)) {
        command(&mut self.document.borrow_mut());
        let content = self.sanitize_surface();
        self.history.push_immediate(content);
    }

    /// Pastes `markup` at the caret as its own undo step.
    pub fn paste(&mut self, markup: &str) {
        self.history.commit_typing();
        let cleaned = self.sanitizer.sanitize_for_paste(markup);
        debug!(
            raw_len = markup.len(),
            clean_len = cleaned.len(),
            "pasting sanitized markup"
        );
        self.document
            .borrow_mut()
            .insert_nodes(markup::parse(&cleaned));
        let content = self.sanitize_surface();
        self.history.push_immediate(content);
    }

    // ── History ────────────────────────────────────────────────────────

    /// Undoes one step. Returns false when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.undo() else {
            return false;
        };
        self.document.borrow_mut().set_content(&entry.content);
        self.history.restore_selection();
        true
    }

    /// Redoes one step. Returns false when there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.redo() else {
            return false;
        };
        self.document.borrow_mut().set_content(&entry.content);
        self.history.restore_selection();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Sanitizes the surface in place and returns the sanitized markup. If
    /// sanitizing changed anything, the document is reloaded and the
    /// selection carried over by path.
    fn sanitize_surface(&mut self) -> String {
        let raw = self.document.borrow().to_markup();
        let content = self.sanitizer.sanitize(&raw);
        if content != raw {
            debug!("surface content changed by sanitization");
            let selection = history::serialize(&self.document);
            self.document.borrow_mut().set_content(&content);
            let outcome = selection.map(|selection| history::restore(&self.document, &selection));
            if matches!(outcome, None | Some(RestoreOutcome::Unresolved)) {
                self.document.borrow_mut().place_caret_at_end();
            }
        }
        content
    }
}
