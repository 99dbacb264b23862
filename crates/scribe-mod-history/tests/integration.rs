// Integration tests for the history system.
//
// These tests drive the HistoryManager through full editing sessions the way
// an editing surface does: typing bursts, break points, discrete commands,
// undo/redo with deferred selection restore.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use scribe_mod_history::{
    HistoryConfig, HistoryManager, HistoryState, LiveSelection, RestoreOutcome, RootAccessor,
    SerializedSelection,
};

/// A single paragraph whose only text node grows as the user types.
/// Node 0 = root, node 1 = paragraph, node 2 = text. Clones share state.
#[derive(Clone, Default)]
struct Paragraph {
    text: Rc<RefCell<String>>,
    caret: Rc<RefCell<Option<LiveSelection<u8>>>>,
}

impl Paragraph {
    fn type_str(&self, s: &str) -> String {
        self.text.borrow_mut().push_str(s);
        let len = self.text.borrow().chars().count();
        *self.caret.borrow_mut() = Some(LiveSelection::caret(2, len));
        self.markup()
    }

    fn set(&self, content: &str) {
        // Content is always "<p>...</p>" in these tests.
        let inner = content
            .strip_prefix("<p>")
            .and_then(|c| c.strip_suffix("</p>"))
            .unwrap_or_default();
        *self.text.borrow_mut() = inner.to_string();
        *self.caret.borrow_mut() = None;
    }

    fn markup(&self) -> String {
        format!("<p>{}</p>", self.text.borrow())
    }
}

impl RootAccessor for Paragraph {
    type Node = u8;

    fn root(&self) -> u8 {
        0
    }

    fn parent(&self, node: &u8) -> Option<u8> {
        match node {
            1 => Some(0),
            2 => Some(1),
            _ => None,
        }
    }

    fn child_at(&self, node: &u8, index: usize) -> Option<u8> {
        match (node, index) {
            (0, 0) => Some(1),
            (1, 0) => Some(2),
            _ => None,
        }
    }

    fn index_in_parent(&self, node: &u8) -> Option<usize> {
        matches!(node, 1 | 2).then_some(0)
    }

    fn node_length(&self, node: &u8) -> usize {
        match node {
            2 => self.text.borrow().chars().count(),
            _ => 1,
        }
    }

    fn selection(&self) -> Option<LiveSelection<u8>> {
        self.caret.borrow().clone()
    }

    fn set_selection(&self, selection: LiveSelection<u8>) {
        *self.caret.borrow_mut() = Some(selection);
    }
}

/// Accessor with no selection at all.
struct NoSelection;

impl RootAccessor for NoSelection {
    type Node = ();

    fn root(&self) {}

    fn parent(&self, _node: &()) -> Option<()> {
        None
    }

    fn child_at(&self, _node: &(), _index: usize) -> Option<()> {
        None
    }

    fn index_in_parent(&self, _node: &()) -> Option<usize> {
        None
    }

    fn node_length(&self, _node: &()) -> usize {
        0
    }

    fn selection(&self) -> Option<LiveSelection<()>> {
        None
    }

    fn set_selection(&self, _selection: LiveSelection<()>) {}
}

fn session() -> (Paragraph, HistoryManager<Paragraph>) {
    let doc = Paragraph::default();
    let mut mgr = HistoryManager::detached(doc.clone());
    mgr.push_immediate(doc.markup());
    (doc, mgr)
}

// ── Typing sessions ────────────────────────────────────────────────────

#[test]
fn test_typing_then_break_point_then_typing() {
    let (doc, mut mgr) = session();

    for ch in ["H", "i"] {
        let content = doc.type_str(ch);
        mgr.push_typing(content);
    }
    // Enter key: break point.
    mgr.commit_typing();
    for ch in [" ", "y", "o", "u"] {
        let content = doc.type_str(ch);
        mgr.push_typing(content);
    }

    let entry = mgr.undo().expect("undo second burst");
    assert_eq!(entry.content, "<p>Hi</p>");
    doc.set(&entry.content);
    assert_eq!(mgr.restore_selection(), Some(RestoreOutcome::Exact));
    assert_eq!(doc.selection(), Some(LiveSelection::caret(2, 2)));

    let entry = mgr.undo().expect("undo first burst");
    assert_eq!(entry.content, "<p></p>");
    assert!(!mgr.can_undo());
}

#[test]
fn test_redo_restores_caret_where_it_was_left() {
    let (doc, mut mgr) = session();
    mgr.push_typing(doc.type_str("abc"));
    mgr.commit_typing();

    let entry = mgr.undo().expect("undo");
    doc.set(&entry.content);
    mgr.restore_selection();

    let entry = mgr.redo().expect("redo");
    doc.set(&entry.content);
    mgr.restore_selection();
    assert_eq!(doc.selection(), Some(LiveSelection::caret(2, 3)));
    assert_eq!(doc.markup(), "<p>abc</p>");
}

#[test]
fn test_format_command_is_separate_step() {
    let (doc, mut mgr) = session();
    mgr.push_typing(doc.type_str("bold"));
    // Format command without an explicit commit.
    mgr.push_immediate("<p><b>bold</b></p>");

    assert_eq!(mgr.undo().expect("undo format").content, "<p>bold</p>");
    assert_eq!(mgr.undo().expect("undo typing").content, "<p></p>");
}

#[test]
fn test_redo_invalidated_by_new_command() {
    let (doc, mut mgr) = session();
    mgr.push_immediate(doc.type_str("a"));
    mgr.push_immediate(doc.type_str("b"));
    mgr.undo().expect("undo");
    assert!(mgr.can_redo());

    mgr.push_immediate("<p>other</p>");
    assert!(!mgr.can_redo());
}

#[test]
fn test_entries_without_selection_restore_to_end() {
    let doc = Paragraph::default();
    let mut mgr = HistoryManager::detached(doc.clone());
    // No caret yet for either push.
    mgr.push_immediate("<p>x</p>");
    mgr.push_immediate("<p>xy</p>");

    let entry = mgr.undo().expect("undo");
    doc.set(&entry.content);
    assert_eq!(mgr.restore_selection(), Some(RestoreOutcome::Unresolved));
    assert_eq!(doc.selection(), Some(LiveSelection::caret(0, 1)));
}

#[test]
fn test_no_selection_accessor_stores_none() {
    let mut mgr = HistoryManager::detached(NoSelection);
    mgr.push_immediate("a");
    mgr.push_immediate("b");
    assert!(mgr.current().expect("current").selection.is_none());
    let entry = mgr.undo().expect("undo");
    assert!(entry.selection.is_none());
}

// ── Capacity ───────────────────────────────────────────────────────────

#[test]
fn test_max_size_three_five_pushes() {
    let mut mgr = HistoryManager::new(NoSelection, |_| {}, HistoryConfig::with_max_size(3));
    for i in 0..5 {
        mgr.push_immediate(format!("<p>{i}</p>"));
    }
    for _ in 0..3 {
        assert!(mgr.undo().is_some());
    }
    assert!(mgr.undo().is_none());
}

#[test]
fn test_large_history_eviction_keeps_newest() {
    let mut mgr = HistoryManager::detached(NoSelection);
    for i in 0..250 {
        mgr.push_immediate(format!("v{i}"));
    }
    assert_eq!(mgr.undo_depth(), 100);
    assert_eq!(mgr.undo().expect("undo").content, "v248");
}

// ── Listener ───────────────────────────────────────────────────────────

#[test]
fn test_listener_tracks_affordances() {
    let seen: Rc<RefCell<Vec<HistoryState>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let mut mgr = HistoryManager::new(
        NoSelection,
        move |state| sink.borrow_mut().push(state),
        HistoryConfig::default(),
    );

    mgr.push_immediate("a");
    mgr.push_immediate("b");
    mgr.undo();
    mgr.clear();

    let last = *seen.borrow().last().expect("events");
    assert_eq!(last, HistoryState::default());
    assert!(seen.borrow().iter().any(|s| s.can_redo));
}

#[test]
fn test_serialized_selection_survives_json() {
    let (doc, mut mgr) = session();
    mgr.push_immediate(doc.type_str("xyz"));
    let sel = mgr.current().and_then(|e| e.selection.clone()).expect("selection");
    let json = serde_json::to_string(&sel).expect("serialize");
    let back: SerializedSelection = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, SerializedSelection::caret(vec![0, 0], 3));
}

// ── Properties ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_undo_all_then_redo_all_returns_to_latest(
        pushes in prop::collection::vec("[a-c]{0,3}", 1..30),
    ) {
        let mut mgr = HistoryManager::detached(NoSelection);
        for content in &pushes {
            mgr.push_immediate(content.clone());
        }
        let latest = mgr.current().expect("current").content.clone();

        let mut undos = 0;
        while mgr.can_undo() {
            prop_assert!(mgr.undo().is_some());
            undos += 1;
        }
        for _ in 0..undos {
            prop_assert!(mgr.redo().is_some());
        }
        prop_assert_eq!(&mgr.current().expect("current").content, &latest);
        prop_assert!(!mgr.can_redo());
    }

    #[test]
    fn prop_undo_depth_never_exceeds_max(
        max_size in 1usize..8,
        pushes in prop::collection::vec("[a-z]{1,4}", 0..40),
    ) {
        let config = HistoryConfig::with_max_size(max_size);
        let mut mgr = HistoryManager::new(NoSelection, |_| {}, config);
        for content in pushes {
            mgr.push_immediate(content);
            prop_assert!(mgr.undo_depth() <= max_size);
        }
    }
}
