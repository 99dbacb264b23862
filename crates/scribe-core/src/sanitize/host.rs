/// Host document tree adapter backed by html5ever's reference DOM.
use html5ever::tendril::TendrilSink;
use html5ever::{parse_fragment, LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use super::tree::{NodeView, TreeAdapter};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Parses fragments with the HTML5 tree-construction algorithm in a `body`
/// context.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostTree;

impl TreeAdapter for HostTree {
    type Handle = Handle;

    fn parse_fragment(&self, markup: &str) -> Vec<Handle> {
        let context = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from("body"),
        );
        let dom = parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new())
            .one(markup);

        // Fragment content is placed under a synthetic `html` element.
        let html = dom.document.children.borrow().first().cloned();
        html.map(|html| html.children.borrow().clone()).unwrap_or_default()
    }

    fn view(&self, handle: Handle) -> NodeView<Handle> {
        match &handle.data {
            NodeData::Element { name, attrs, .. } => NodeView::Element {
                tag: name.local.to_ascii_lowercase().to_string(),
                attributes: attrs
                    .borrow()
                    .iter()
                    .map(|a| {
                        (
                            a.name.local.to_ascii_lowercase().to_string(),
                            a.value.to_string(),
                        )
                    })
                    .collect(),
                children: handle.children.borrow().clone(),
            },
            NodeData::Text { contents } => NodeView::Text(contents.borrow().to_string()),
            _ => NodeView::Skip,
        }
    }
}
