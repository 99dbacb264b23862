/// Tree adapters: one traversal interface over the fallback parser's tree and
/// the host document tree.
use crate::markup::{self, Attributes, Element, Node};

/// What the sanitizer sees of a node.
#[derive(Debug)]
pub enum NodeView<H> {
    Element {
        /// Lowercase tag name.
        tag: String,
        attributes: Attributes,
        children: Vec<H>,
    },
    Text(String),
    /// Comments, doctypes, processing instructions.
    Skip,
}

/// A source of markup trees the sanitizer can walk.
pub trait TreeAdapter {
    type Handle;

    /// Parses `markup` as a body fragment and returns its top-level nodes.
    fn parse_fragment(&self, markup: &str) -> Vec<Self::Handle>;

    /// Takes a node apart for inspection.
    fn view(&self, handle: Self::Handle) -> NodeView<Self::Handle>;
}

/// Adapter over [`markup::parse`]. Handles are owned nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackTree;

impl TreeAdapter for FallbackTree {
    type Handle = Node;

    fn parse_fragment(&self, markup: &str) -> Vec<Node> {
        markup::parse(markup)
    }

    fn view(&self, handle: Node) -> NodeView<Node> {
        match handle {
            Node::Element(el) => NodeView::Element {
                tag: el.tag,
                attributes: el.attributes,
                children: el.children,
            },
            Node::Text(text) => NodeView::Text(text),
        }
    }
}

/// Copies an adapter's tree into owned nodes without filtering.
pub fn to_nodes<A: TreeAdapter>(adapter: &A, handles: Vec<A::Handle>) -> Vec<Node> {
    handles
        .into_iter()
        .filter_map(|handle| match adapter.view(handle) {
            NodeView::Element {
                tag,
                attributes,
                children,
            } => {
                let mut el = Element::new(tag);
                el.attributes = attributes;
                el.children = to_nodes(adapter, children);
                Some(Node::Element(el))
            }
            NodeView::Text(text) => Some(Node::Text(text)),
            NodeView::Skip => None,
        })
        .collect()
}

/// Round-trips a trivial tag through the adapter.
pub fn probe<A: TreeAdapter>(adapter: &A) -> bool {
    const PROBE: &str = "<b>probe</b>";
    let handles = adapter.parse_fragment(PROBE);
    markup::serialize(&to_nodes(adapter, handles)) == PROBE
}
