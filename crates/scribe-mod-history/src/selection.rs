/// Selection serializer: converts a live selection into root-relative
/// child-index paths and resolves those paths back against a (possibly
/// replaced) tree.
use crate::entry::SerializedSelection;

/// Walks deeper than this are treated as unreachable.
const MAX_PATH_DEPTH: usize = 4096;

/// Capability the history manager uses to read the selection and to locate
/// nodes by path. Implementations must not mutate content; `set_selection`
/// only moves the caret.
pub trait RootAccessor {
    /// Handle to a node in the editing tree.
    type Node: Clone + PartialEq;

    /// The editing root.
    fn root(&self) -> Self::Node;

    /// Parent of `node`, or `None` for a detached node or the document top.
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Child of `node` at `index`.
    fn child_at(&self, node: &Self::Node, index: usize) -> Option<Self::Node>;

    /// Position of `node` among its parent's children.
    fn index_in_parent(&self, node: &Self::Node) -> Option<usize>;

    /// Valid offset range upper bound: char count for text, child count for elements.
    fn node_length(&self, node: &Self::Node) -> usize;

    /// The current selection, if any.
    fn selection(&self) -> Option<LiveSelection<Self::Node>>;

    /// Replaces the current selection.
    fn set_selection(&self, selection: LiveSelection<Self::Node>);
}

/// A selection expressed with live node handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSelection<N> {
    pub anchor: N,
    pub anchor_offset: usize,
    pub focus: N,
    pub focus_offset: usize,
}

impl<N: Clone> LiveSelection<N> {
    /// A collapsed selection at `node`/`offset`.
    pub fn caret(node: N, offset: usize) -> Self {
        Self {
            anchor: node.clone(),
            anchor_offset: offset,
            focus: node,
            focus_offset: offset,
        }
    }
}

/// Result of resolving a `SerializedSelection` against the current tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Both endpoints resolved and offsets were in range.
    Exact,
    /// Both endpoints resolved but at least one offset was clamped.
    Clamped,
    /// Only one endpoint resolved; the selection collapsed onto it.
    Collapsed,
    /// Neither endpoint resolved; nothing was applied.
    Unresolved,
}

/// Captures the accessor's current selection as root-relative paths.
///
/// Returns `None` if there is no selection or if either endpoint lies outside
/// the root's subtree.
pub fn serialize<R: RootAccessor>(accessor: &R) -> Option<SerializedSelection> {
    let live = accessor.selection()?;
    let root = accessor.root();
    let anchor_path = path_from_root(accessor, &root, &live.anchor)?;
    let focus_path = path_from_root(accessor, &root, &live.focus)?;
    Some(SerializedSelection {
        anchor_path,
        anchor_offset: live.anchor_offset,
        focus_path,
        focus_offset: live.focus_offset,
    })
}

/// Applies `selection` to the accessor's current tree, best effort.
///
/// Offsets are clamped to the resolved node's length. When one side fails to
/// resolve, the selection collapses onto the other. When both fail, nothing is
/// applied and `Unresolved` is returned so the caller can fall back (see
/// [`place_caret_at_end`]).
pub fn restore<R: RootAccessor>(accessor: &R, selection: &SerializedSelection) -> RestoreOutcome {
    let anchor = resolve(accessor, &selection.anchor_path);
    let focus = resolve(accessor, &selection.focus_path);

    match (anchor, focus) {
        (Some(anchor), Some(focus)) => {
            let (anchor_offset, anchor_clamped) =
                clamp_offset(accessor, &anchor, selection.anchor_offset);
            let (focus_offset, focus_clamped) =
                clamp_offset(accessor, &focus, selection.focus_offset);
            accessor.set_selection(LiveSelection {
                anchor,
                anchor_offset,
                focus,
                focus_offset,
            });
            if anchor_clamped || focus_clamped {
                RestoreOutcome::Clamped
            } else {
                RestoreOutcome::Exact
            }
        }
        (Some(node), None) => {
            let (offset, _) = clamp_offset(accessor, &node, selection.anchor_offset);
            accessor.set_selection(LiveSelection::caret(node, offset));
            RestoreOutcome::Collapsed
        }
        (None, Some(node)) => {
            let (offset, _) = clamp_offset(accessor, &node, selection.focus_offset);
            accessor.set_selection(LiveSelection::caret(node, offset));
            RestoreOutcome::Collapsed
        }
        (None, None) => RestoreOutcome::Unresolved,
    }
}

/// Puts a collapsed caret after the last child of the root.
pub fn place_caret_at_end<R: RootAccessor>(accessor: &R) {
    let root = accessor.root();
    let end = accessor.node_length(&root);
    accessor.set_selection(LiveSelection::caret(root, end));
}

/// Resolves a child-index path from the root. `None` if any index is out of range.
pub fn resolve<R: RootAccessor>(accessor: &R, path: &[usize]) -> Option<R::Node> {
    path.iter()
        .try_fold(accessor.root(), |node, &index| accessor.child_at(&node, index))
}

/// Builds the child-index path from `root` down to `node`.
fn path_from_root<R: RootAccessor>(
    accessor: &R,
    root: &R::Node,
    node: &R::Node,
) -> Option<Vec<usize>> {
    let mut path = Vec::new();
    let mut current = node.clone();
    while current != *root {
        if path.len() >= MAX_PATH_DEPTH {
            return None;
        }
        path.push(accessor.index_in_parent(&current)?);
        current = accessor.parent(&current)?;
    }
    path.reverse();
    Some(path)
}

fn clamp_offset<R: RootAccessor>(accessor: &R, node: &R::Node, offset: usize) -> (usize, bool) {
    let len = accessor.node_length(node);
    if offset > len {
        (len, true)
    } else {
        (offset, false)
    }
}

#[cfg(test)]
pub(crate) mod test_tree {
    //! Minimal in-memory tree used by the history unit tests.
    use std::cell::RefCell;

    use super::{LiveSelection, RootAccessor};

    /// Node 0 is the root. `lengths[i]` is the node_length of node `i`.
    #[derive(Debug, Default)]
    pub struct TestTree {
        pub parents: Vec<Option<usize>>,
        pub children: Vec<Vec<usize>>,
        pub lengths: Vec<usize>,
        pub selection: RefCell<Option<LiveSelection<usize>>>,
    }

    impl TestTree {
        /// Root with `n` text children of length `len` each.
        pub fn flat(n: usize, len: usize) -> Self {
            let mut tree = Self {
                parents: vec![None],
                children: vec![Vec::new()],
                lengths: vec![n],
                selection: RefCell::new(None),
            };
            for _ in 0..n {
                tree.add_child(0, len);
            }
            tree
        }

        pub fn add_child(&mut self, parent: usize, len: usize) -> usize {
            let id = self.parents.len();
            self.parents.push(Some(parent));
            self.children.push(Vec::new());
            self.lengths.push(len);
            self.children[parent].push(id);
            self.lengths[parent] = self.children[parent].len();
            id
        }

        pub fn caret(&self, node: usize, offset: usize) {
            *self.selection.borrow_mut() = Some(LiveSelection::caret(node, offset));
        }
    }

    impl RootAccessor for TestTree {
        type Node = usize;

        fn root(&self) -> usize {
            0
        }

        fn parent(&self, node: &usize) -> Option<usize> {
            self.parents.get(*node).copied().flatten()
        }

        fn child_at(&self, node: &usize, index: usize) -> Option<usize> {
            self.children.get(*node)?.get(index).copied()
        }

        fn index_in_parent(&self, node: &usize) -> Option<usize> {
            let parent = self.parent(node)?;
            self.children[parent].iter().position(|c| c == node)
        }

        fn node_length(&self, node: &usize) -> usize {
            self.lengths.get(*node).copied().unwrap_or(0)
        }

        fn selection(&self) -> Option<LiveSelection<usize>> {
            self.selection.borrow().clone()
        }

        fn set_selection(&self, selection: LiveSelection<usize>) {
            *self.selection.borrow_mut() = Some(selection);
        }
    }
}
