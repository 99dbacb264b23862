//! Reference editing-surface model.
//!
//! A `Document` is an arena tree built from markup. Node ids index into the
//! arena and are only meaningful until the next `set_content`, which rebuilds
//! the arena and drops the selection. The history manager reaches the tree
//! through [`SharedDocument`], which implements `RootAccessor`.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::history::{LiveSelection, RootAccessor};
use crate::markup::{self, is_void, Attributes, Element, Node};

/// Index of a node in a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The editing root.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Payload of an arena node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Root,
    Element { tag: String, attributes: Attributes },
    Text(String),
}

#[derive(Debug, Clone)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed markup tree with a selection.
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    selection: Option<LiveSelection<NodeId>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                data: NodeData::Root,
                parent: None,
                children: Vec::new(),
            }],
            selection: None,
        }
    }

    /// Creates a document holding `markup`.
    pub fn from_markup(markup: &str) -> Self {
        let mut doc = Self::new();
        doc.set_content(markup);
        doc
    }

    // ── Content ────────────────────────────────────────────────────────

    /// Replaces the whole tree. Existing node ids and the selection become invalid.
    pub fn set_content(&mut self, markup: &str) {
        *self = Self::new();
        for node in markup::parse(markup) {
            self.attach(NodeId::ROOT, None, node);
        }
    }

    /// Serializes the tree below the root.
    pub fn to_markup(&self) -> String {
        markup::serialize(&self.to_nodes(NodeId::ROOT))
    }

    /// Concatenated text of the whole document.
    pub fn text(&self) -> String {
        self.to_nodes(NodeId::ROOT)
            .iter()
            .map(Node::text_content)
            .collect()
    }

    fn to_nodes(&self, id: NodeId) -> Vec<Node> {
        self.children(id)
            .iter()
            .filter_map(|&child| match &self.slot(child)?.data {
                NodeData::Root => None,
                NodeData::Text(text) => Some(Node::Text(text.clone())),
                NodeData::Element { tag, attributes } => {
                    let mut el = Element::new(tag.as_str());
                    el.attributes = attributes.clone();
                    el.children = self.to_nodes(child);
                    Some(Node::Element(el))
                }
            })
            .collect()
    }

    /// Adds `node` (and its subtree) under `parent` at `index` (or at the end).
    fn attach(&mut self, parent: NodeId, index: Option<usize>, node: Node) -> NodeId {
        let (data, children) = match node {
            Node::Text(text) => (NodeData::Text(text), Vec::new()),
            Node::Element(el) => (
                NodeData::Element {
                    tag: el.tag,
                    attributes: el.attributes,
                },
                el.children,
            ),
        };
        let id = self.alloc(data, parent);
        let siblings = &mut self.slots[parent.0].children;
        match index {
            Some(i) if i < siblings.len() => siblings.insert(i, id),
            _ => siblings.push(id),
        }
        for child in children {
            self.attach(id, None, child);
        }
        id
    }

    fn alloc(&mut self, data: NodeData, parent: NodeId) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        id
    }

    // ── Tree queries ───────────────────────────────────────────────────

    fn slot(&self, id: NodeId) -> Option<&Slot> {
        self.slots.get(id.0)
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.slot(id).map(|s| &s.data)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id)
            .map(|s| s.children.as_slice())
            .unwrap_or_default()
    }

    pub fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Char count for text nodes, child count otherwise.
    pub fn node_length(&self, id: NodeId) -> usize {
        match self.data(id) {
            Some(NodeData::Text(text)) => text.chars().count(),
            Some(_) => self.children(id).len(),
            None => 0,
        }
    }

    /// First text node containing `needle`, with the char offset of the match.
    pub fn find_text(&self, needle: &str) -> Option<(NodeId, usize)> {
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            if let Some(NodeData::Text(text)) = self.data(id) {
                if let Some(byte) = text.find(needle) {
                    return Some((id, text[..byte].chars().count()));
                }
            }
            stack.extend(self.children(id).iter().rev());
        }
        None
    }

    // ── Selection ──────────────────────────────────────────────────────

    pub fn selection(&self) -> Option<&LiveSelection<NodeId>> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: LiveSelection<NodeId>) {
        self.selection = Some(selection);
    }

    /// Collapses the selection to `node`/`offset`, clamping the offset.
    pub fn set_caret(&mut self, node: NodeId, offset: usize) {
        let offset = offset.min(self.node_length(node));
        self.selection = Some(LiveSelection::caret(node, offset));
    }

    /// The focus end of the selection.
    pub fn caret(&self) -> Option<(NodeId, usize)> {
        self.selection.as_ref().map(|s| (s.focus, s.focus_offset))
    }

    pub fn place_caret_at_end(&mut self) {
        let end = self.node_length(NodeId::ROOT);
        self.set_caret(NodeId::ROOT, end);
    }

    // ── Editing ────────────────────────────────────────────────────────

    /// Inserts `text` at the caret (the end of the document if there is no
    /// selection) and moves the caret past it. A range selection is collapsed
    /// to its focus first.
    pub fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let (node, offset) = self.caret_or_end();

        if let Some(NodeData::Text(existing)) = self.data(node) {
            let byte = char_to_byte(existing, offset);
            if let Some(NodeData::Text(existing)) = self.data_mut(node) {
                existing.insert_str(byte, text);
            }
            self.set_caret(node, offset + text.chars().count());
            return;
        }

        // Caret between children of an element: extend a neighbouring text
        // node or create one.
        if let Some(prev) = offset.checked_sub(1).and_then(|i| self.child_at(node, i)) {
            if let Some(NodeData::Text(existing)) = self.data_mut(prev) {
                existing.push_str(text);
                let end = existing.chars().count();
                self.set_caret(prev, end);
                return;
            }
        }
        if let Some(next) = self.child_at(node, offset) {
            if let Some(NodeData::Text(existing)) = self.data_mut(next) {
                existing.insert_str(0, text);
                self.set_caret(next, text.chars().count());
                return;
            }
        }
        if self.accepts_children(node) {
            let id = self.attach(node, Some(offset), Node::text(text));
            self.set_caret(id, text.chars().count());
        }
    }

    /// Inserts parsed nodes at the caret, splitting a text node if the caret
    /// is inside one. The caret ends up after the inserted nodes.
    pub fn insert_nodes(&mut self, nodes: Vec<Node>) {
        if nodes.is_empty() {
            return;
        }
        let (node, offset) = self.caret_or_end();

        let in_text = matches!(self.data(node), Some(NodeData::Text(_)));
        let (parent, mut index) = if in_text {
            let Some(parent) = self.parent(node) else {
                return;
            };
            let position = self.index_in_parent(node).unwrap_or(0);
            if let Some(tail) = self.split_text(node, offset) {
                self.slots[parent.0].children.insert(position + 1, tail);
            }
            (parent, position + 1)
        } else if self.accepts_children(node) {
            (node, offset.min(self.node_length(node)))
        } else {
            return;
        };

        for child in nodes {
            self.attach(parent, Some(index), child);
            index += 1;
        }
        self.set_caret(parent, index);
    }

    /// Deletes the char before the caret inside a text node. Returns false
    /// when there was nothing to delete there.
    pub fn delete_backward(&mut self) -> bool {
        let Some((node, offset)) = self.caret() else {
            return false;
        };
        if offset == 0 {
            return false;
        }
        let Some(NodeData::Text(text)) = self.data_mut(node) else {
            return false;
        };
        let start = char_to_byte(text, offset - 1);
        let end = char_to_byte(text, offset);
        text.replace_range(start..end, "");
        self.set_caret(node, offset - 1);
        true
    }

    /// Wraps `node` in a new `tag` element at the same position. Returns the
    /// wrapper.
    pub fn wrap(&mut self, node: NodeId, tag: &str) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let position = self.index_in_parent(node)?;
        let wrapper = self.alloc(
            NodeData::Element {
                tag: tag.to_ascii_lowercase(),
                attributes: Attributes::new(),
            },
            parent,
        );
        self.slots[parent.0].children[position] = wrapper;
        self.slots[wrapper.0].children.push(node);
        self.slots[node.0].parent = Some(wrapper);
        Some(wrapper)
    }

    fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.slots.get_mut(id.0).map(|s| &mut s.data)
    }

    fn accepts_children(&self, id: NodeId) -> bool {
        match self.data(id) {
            Some(NodeData::Root) => true,
            Some(NodeData::Element { tag, .. }) => !is_void(tag),
            _ => false,
        }
    }

    fn caret_or_end(&mut self) -> (NodeId, usize) {
        if self.selection.is_none() {
            self.place_caret_at_end();
        }
        self.caret()
            .unwrap_or((NodeId::ROOT, self.node_length(NodeId::ROOT)))
    }

    /// Cuts the text after `offset` into a new detached node. Returns it if
    /// the tail is non-empty; the caller places it in the tree.
    fn split_text(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let tail = match self.data_mut(id) {
            Some(NodeData::Text(text)) => {
                let byte = char_to_byte(text, offset);
                text.split_off(byte)
            }
            _ => return None,
        };
        if tail.is_empty() {
            return None;
        }
        Some(self.alloc(NodeData::Text(tail), parent))
    }
}

fn char_to_byte(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(byte, _)| byte)
}

/// Shared handle to a [`Document`], used as the history manager's accessor.
#[derive(Debug, Clone, Default)]
pub struct SharedDocument(Rc<RefCell<Document>>);

impl SharedDocument {
    pub fn new(document: Document) -> Self {
        Self(Rc::new(RefCell::new(document)))
    }

    pub fn borrow(&self) -> Ref<'_, Document> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Document> {
        self.0.borrow_mut()
    }
}

impl RootAccessor for SharedDocument {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.borrow().parent(*node)
    }

    fn child_at(&self, node: &NodeId, index: usize) -> Option<NodeId> {
        self.borrow().child_at(*node, index)
    }

    fn index_in_parent(&self, node: &NodeId) -> Option<usize> {
        self.borrow().index_in_parent(*node)
    }

    fn node_length(&self, node: &NodeId) -> usize {
        self.borrow().node_length(*node)
    }

    fn selection(&self) -> Option<LiveSelection<NodeId>> {
        self.borrow().selection().cloned()
    }

    fn set_selection(&self, selection: LiveSelection<NodeId>) {
        self.borrow_mut().set_selection(selection);
    }
}
