/// Undo/redo manager with typing coalescence.
///
/// Keystrokes are buffered as pending typing and only become an undo step at
/// a break point (`commit_typing`). Discrete operations go through
/// `push_immediate` so each one is its own step. Every step carries a
/// serialized selection that is restored after the caller has applied the
/// step's content.
use std::collections::VecDeque;

use crate::config::HistoryConfig;
use crate::entry::{HistoryEntry, SerializedSelection};
use crate::selection::{self, RestoreOutcome, RootAccessor};

/// Undo/redo availability reported to the state-change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryState {
    pub can_undo: bool,
    pub can_redo: bool,
}

type StateListener = Box<dyn FnMut(HistoryState)>;

/// Manages undo/redo history for a single editing surface.
///
/// Each surface gets its own `HistoryManager`. The manager reads the
/// selection through its `RootAccessor` but never changes content; the caller
/// applies the entries returned by `undo`/`redo` and then calls
/// `restore_selection`.
pub struct HistoryManager<R: RootAccessor> {
    /// Capability used to capture and restore the selection.
    accessor: R,
    /// Invoked after operations that change undo/redo availability.
    on_state_change: StateListener,
    /// Configuration parameters.
    config: HistoryConfig,
    /// Undo stack, oldest first.
    undo_stack: VecDeque<HistoryEntry>,
    /// Redo stack, most recently undone on top.
    redo_stack: Vec<HistoryEntry>,
    /// The entry matching what the surface currently shows.
    current: Option<HistoryEntry>,
    /// Latest content of the ongoing typing burst.
    pending_typing: Option<String>,
    /// Whether a typing burst is in progress.
    is_typing: bool,
    /// Set by `undo`/`redo` until the caller has applied the content and
    /// asked for the selection to be restored.
    restore_due: bool,
    /// Selection to apply once the caller has applied undone/redone content.
    pending_restore: Option<SerializedSelection>,
}

impl<R: RootAccessor> std::fmt::Debug for HistoryManager<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryManager")
            .field("undo_len", &self.undo_stack.len())
            .field("redo_len", &self.redo_stack.len())
            .field("has_current", &self.current.is_some())
            .field("is_typing", &self.is_typing)
            .field("max_size", &self.config.max_size)
            .finish()
    }
}

impl<R: RootAccessor> HistoryManager<R> {
    /// Creates an empty manager.
    pub fn new(
        accessor: R,
        on_state_change: impl FnMut(HistoryState) + 'static,
        config: HistoryConfig,
    ) -> Self {
        let mut config = config;
        config.sanitize();
        Self {
            accessor,
            on_state_change: Box::new(on_state_change),
            config,
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            current: None,
            pending_typing: None,
            is_typing: false,
            restore_due: false,
            pending_restore: None,
        }
    }

    /// Creates a manager with default config and no listener.
    ///
    /// Convenience constructor for tests and simple usage.
    pub fn detached(accessor: R) -> Self {
        Self::new(accessor, |_| {}, HistoryConfig::default())
    }

    /// Returns the root accessor.
    pub fn accessor(&self) -> &R {
        &self.accessor
    }

    /// Returns the current entry, if any.
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.current.as_ref()
    }

    /// Number of entries on the undo stack.
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of entries on the redo stack.
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Whether a typing burst is buffered.
    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    /// Buffers `content` as the latest state of the ongoing typing burst.
    ///
    /// Does not touch the stacks; the burst becomes one undo step at the next
    /// `commit_typing`.
    pub fn push_typing(&mut self, content: impl Into<String>) {
        let before = self.state();
        self.discard_pending_restore();
        self.pending_typing = Some(content.into());
        self.is_typing = true;
        self.notify_if_changed(before);
    }

    /// Commits the pending typing burst as one undo step.
    ///
    /// A step is pushed only if the pending content differs from the current
    /// entry. Always leaves the typing state.
    pub fn commit_typing(&mut self) {
        if !self.is_typing {
            return;
        }
        let before = self.state();
        self.is_typing = false;
        match self.pending_typing.take() {
            Some(content) if self.differs_from_current(&content) => self.push(content),
            _ => self.notify_if_changed(before),
        }
    }

    /// Commits pending typing, then records `content` as its own undo step.
    ///
    /// Used for format commands, paste and structural edits.
    pub fn push_immediate(&mut self, content: impl Into<String>) {
        self.commit_typing();
        self.push(content.into());
    }

    /// Steps back one entry.
    ///
    /// Returns the entry the caller must apply, or `None` if there is nothing
    /// to undo. The entry's selection is held until `restore_selection`.
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        self.commit_typing();
        let previous = self.undo_stack.pop_back()?;
        if let Some(mut current) = self.current.take() {
            current.selection = selection::serialize(&self.accessor);
            self.redo_stack.push(current);
        }
        Some(self.make_current(previous))
    }

    /// Steps forward one entry. Symmetric to [`HistoryManager::undo`].
    pub fn redo(&mut self) -> Option<HistoryEntry> {
        self.commit_typing();
        let next = self.redo_stack.pop()?;
        if let Some(mut current) = self.current.take() {
            current.selection = selection::serialize(&self.accessor);
            self.undo_stack.push_back(current);
        }
        Some(self.make_current(next))
    }

    /// Applies the selection of the entry returned by the last `undo`/`redo`.
    ///
    /// Must be called after the caller has applied that entry's content.
    /// Falls back to a caret at the end of the root when the entry has no
    /// selection or its paths no longer resolve. Returns `None` if no restore
    /// was pending.
    pub fn restore_selection(&mut self) -> Option<RestoreOutcome> {
        if !std::mem::take(&mut self.restore_due) {
            return None;
        }
        let outcome = match self.pending_restore.take() {
            Some(pending) => selection::restore(&self.accessor, &pending),
            None => RestoreOutcome::Unresolved,
        };
        if outcome == RestoreOutcome::Unresolved {
            tracing::debug!("Selection paths no longer resolve, placing caret at end");
            selection::place_caret_at_end(&self.accessor);
        }
        Some(outcome)
    }

    /// Whether undo is available, counting uncommitted typing.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || self.has_uncommitted_typing()
    }

    /// Whether redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Current undo/redo availability.
    pub fn state(&self) -> HistoryState {
        HistoryState {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    /// Commits pending typing, then drops all history.
    pub fn clear(&mut self) {
        self.commit_typing();
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current = None;
        self.discard_pending_restore();
        self.notify();
    }

    /// Discards pending typing. The stacks are left alone; the manager is
    /// expected to be dropped afterwards.
    pub fn destroy(&mut self) {
        self.pending_typing = None;
        self.is_typing = false;
        self.discard_pending_restore();
    }

    /// Records `content` as a new current entry.
    fn push(&mut self, content: String) {
        if !self.differs_from_current(&content) {
            return;
        }
        if let Some(previous) = self.current.take() {
            self.undo_stack.push_back(previous);
            if self.undo_stack.len() > self.config.max_size {
                self.undo_stack.pop_front();
                tracing::debug!(max_size = self.config.max_size, "Evicted oldest history entry");
            }
        }
        let selection = selection::serialize(&self.accessor);
        self.current = Some(HistoryEntry::new(content, selection));
        self.redo_stack.clear();
        self.discard_pending_restore();
        self.notify();
    }

    fn make_current(&mut self, entry: HistoryEntry) -> HistoryEntry {
        self.restore_due = true;
        self.pending_restore = entry.selection.clone();
        self.current = Some(entry.clone());
        self.notify();
        entry
    }

    fn discard_pending_restore(&mut self) {
        self.restore_due = false;
        self.pending_restore = None;
    }

    fn differs_from_current(&self, content: &str) -> bool {
        self.current.as_ref().map(|c| c.content.as_str()) != Some(content)
    }

    fn has_uncommitted_typing(&self) -> bool {
        self.is_typing
            && self
                .pending_typing
                .as_deref()
                .is_some_and(|content| self.differs_from_current(content))
    }

    fn notify(&mut self) {
        let state = self.state();
        (self.on_state_change)(state);
    }

    fn notify_if_changed(&mut self, before: HistoryState) {
        if self.state() != before {
            self.notify();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::selection::test_tree::TestTree;
    use crate::selection::LiveSelection;

    fn manager() -> HistoryManager<TestTree> {
        HistoryManager::detached(TestTree::flat(3, 10))
    }

    fn recording_manager(
        max_size: usize,
    ) -> (HistoryManager<TestTree>, Rc<RefCell<Vec<HistoryState>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mgr = HistoryManager::new(
            TestTree::flat(3, 10),
            move |state| sink.borrow_mut().push(state),
            HistoryConfig::with_max_size(max_size),
        );
        (mgr, events)
    }

    // --- Coalescing ---

    #[test]
    fn test_typing_burst_is_one_step() {
        let mut mgr = manager();
        mgr.push_immediate("");
        mgr.push_typing("a");
        mgr.push_typing("ab");
        mgr.push_typing("abc");
        mgr.commit_typing();

        let entry = mgr.undo().expect("undo");
        assert_eq!(entry.content, "");
        assert!(!mgr.can_undo());
    }

    #[test]
    fn test_push_typing_does_not_touch_stacks() {
        let mut mgr = manager();
        mgr.push_immediate("start");
        mgr.push_typing("start!");
        assert_eq!(mgr.undo_depth(), 0);
        assert!(mgr.is_typing());
        assert_eq!(mgr.current().map(|e| e.content.as_str()), Some("start"));
    }

    #[test]
    fn test_push_immediate_separates_from_typing() {
        let mut mgr = manager();
        mgr.push_immediate("");
        mgr.push_typing("abc");
        mgr.push_immediate("<b>abc</b>");

        assert_eq!(mgr.undo().expect("undo").content, "abc");
        assert_eq!(mgr.undo().expect("undo").content, "");
        assert!(mgr.undo().is_none());
    }

    #[test]
    fn test_commit_typing_without_change_pushes_nothing() {
        let mut mgr = manager();
        mgr.push_immediate("same");
        mgr.push_typing("same");
        mgr.commit_typing();
        assert!(!mgr.is_typing());
        assert_eq!(mgr.undo_depth(), 0);
    }

    #[test]
    fn test_commit_typing_when_idle_is_noop() {
        let (mut mgr, events) = recording_manager(10);
        mgr.commit_typing();
        assert!(events.borrow().is_empty());
        assert!(mgr.current().is_none());
    }

    // --- Duplicate suppression ---

    #[test]
    fn test_duplicate_push_suppressed() {
        let mut mgr = manager();
        mgr.push_immediate("x");
        mgr.push_immediate("x");
        assert!(!mgr.can_undo());
        assert_eq!(mgr.undo_depth(), 0);
    }

    // --- can_undo / can_redo ---

    #[test]
    fn test_can_undo_counts_pending_typing() {
        let mut mgr = manager();
        mgr.push_immediate("a");
        assert!(!mgr.can_undo());
        mgr.push_typing("ab");
        assert!(mgr.can_undo());
        mgr.push_typing("a");
        assert!(!mgr.can_undo());
    }

    #[test]
    fn test_empty_history() {
        let mut mgr = manager();
        assert!(!mgr.can_undo());
        assert!(!mgr.can_redo());
        assert!(mgr.undo().is_none());
        assert!(mgr.redo().is_none());
    }

    // --- Undo / redo ---

    #[test]
    fn test_undo_redo_basic() {
        let mut mgr = manager();
        mgr.push_immediate("a");
        mgr.push_immediate("b");

        assert_eq!(mgr.undo().expect("undo").content, "a");
        assert!(mgr.can_redo());
        assert_eq!(mgr.redo().expect("redo").content, "b");
        assert!(!mgr.can_redo());
    }

    #[test]
    fn test_redo_cleared_on_new_push() {
        let mut mgr = manager();
        mgr.push_immediate("a");
        mgr.push_immediate("b");
        mgr.undo();
        assert!(mgr.can_redo());

        mgr.push_immediate("c");
        assert!(!mgr.can_redo());
    }

    #[test]
    fn test_undo_commits_pending_typing_first() {
        let mut mgr = manager();
        mgr.push_immediate("a");
        mgr.push_typing("ab");
        let entry = mgr.undo().expect("undo");
        assert_eq!(entry.content, "a");
        assert_eq!(mgr.redo().expect("redo").content, "ab");
    }

    #[test]
    fn test_bounded_history() {
        let mut mgr =
            HistoryManager::new(TestTree::flat(1, 1), |_| {}, HistoryConfig::with_max_size(3));
        for i in 0..5 {
            mgr.push_immediate(format!("v{i}"));
        }
        assert_eq!(mgr.undo().expect("1").content, "v3");
        assert_eq!(mgr.undo().expect("2").content, "v2");
        assert_eq!(mgr.undo().expect("3").content, "v1");
        assert!(mgr.undo().is_none());
    }

    #[test]
    fn test_undo_all_then_redo_all() {
        let mut mgr = manager();
        for c in ["a", "b", "c", "d"] {
            mgr.push_immediate(c);
        }
        let mut undos = 0;
        while mgr.can_undo() {
            mgr.undo().expect("undo");
            undos += 1;
        }
        assert_eq!(undos, 3);
        for _ in 0..undos {
            mgr.redo().expect("redo");
        }
        assert_eq!(mgr.current().expect("current").content, "d");
        assert!(!mgr.can_redo());
    }

    // --- Selection capture ---

    #[test]
    fn test_push_captures_selection() {
        let mut mgr = manager();
        mgr.accessor().caret(2, 7);
        mgr.push_immediate("a");
        let sel = mgr.current().and_then(|e| e.selection.clone()).expect("selection");
        assert_eq!(sel, SerializedSelection::caret(vec![1], 7));
    }

    #[test]
    fn test_undo_refreshes_selection_of_left_entry() {
        let mut mgr = manager();
        mgr.accessor().caret(1, 1);
        mgr.push_immediate("a");
        mgr.accessor().caret(1, 2);
        mgr.push_immediate("b");
        // Caret moved after "b" was recorded.
        mgr.accessor().caret(3, 9);
        mgr.undo().expect("undo");
        mgr.restore_selection();

        let redone = mgr.redo().expect("redo");
        assert_eq!(redone.selection, Some(SerializedSelection::caret(vec![2], 9)));
    }

    #[test]
    fn test_restore_selection_after_undo() {
        let mut mgr = manager();
        mgr.accessor().caret(2, 4);
        mgr.push_immediate("a");
        mgr.accessor().caret(3, 1);
        mgr.push_immediate("b");

        mgr.undo().expect("undo");
        assert_eq!(mgr.restore_selection(), Some(RestoreOutcome::Exact));
        assert_eq!(mgr.accessor().selection(), Some(LiveSelection::caret(2, 4)));
        assert_eq!(mgr.restore_selection(), None);
    }

    #[test]
    fn test_restore_selection_falls_back_to_end() {
        let mut mgr = HistoryManager::detached(TestTree::flat(2, 3));
        mgr.push_immediate("a");
        mgr.push_immediate("b");
        // Pretend "a" was captured against a different tree shape.
        mgr.undo_stack[0].selection = Some(SerializedSelection::caret(vec![9, 9], 1));

        mgr.undo().expect("undo");
        assert_eq!(mgr.restore_selection(), Some(RestoreOutcome::Unresolved));
        assert_eq!(mgr.accessor().selection(), Some(LiveSelection::caret(0, 2)));
    }

    // --- Clear / destroy ---

    #[test]
    fn test_clear() {
        let mut mgr = manager();
        mgr.push_immediate("a");
        mgr.push_immediate("b");
        mgr.undo();
        mgr.clear();
        assert!(!mgr.can_undo());
        assert!(!mgr.can_redo());
        assert!(mgr.current().is_none());
    }

    #[test]
    fn test_destroy_discards_pending_typing() {
        let mut mgr = manager();
        mgr.push_immediate("a");
        mgr.push_typing("ab");
        mgr.destroy();
        assert!(!mgr.is_typing());
        assert!(!mgr.can_undo());
        assert_eq!(mgr.current().expect("current").content, "a");
    }

    // --- Listener ---

    #[test]
    fn test_listener_notified_on_push_undo_redo() {
        let (mut mgr, events) = recording_manager(10);
        mgr.push_immediate("a");
        mgr.push_immediate("b");
        mgr.undo();
        mgr.redo();

        let events = events.borrow();
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[1],
            HistoryState {
                can_undo: true,
                can_redo: false
            }
        );
        assert_eq!(
            events[2],
            HistoryState {
                can_undo: false,
                can_redo: true
            }
        );
    }

    #[test]
    fn test_listener_notified_when_typing_enables_undo() {
        let (mut mgr, events) = recording_manager(10);
        mgr.push_immediate("a");
        mgr.push_typing("ab");
        mgr.push_typing("abc");

        // One for the push, one when typing first made undo available.
        assert_eq!(events.borrow().len(), 2);
        assert!(events.borrow()[1].can_undo);
    }
}
