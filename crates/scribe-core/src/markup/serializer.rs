/// Serializer for the markup tree.
///
/// Names are written lowercase, attribute values double-quoted and escaped,
/// and every non-void element gets an explicit closing tag. Rows placed
/// directly under a `table` are wrapped in a synthesized `tbody`, matching
/// how a host parser would build the same table.
use super::{is_raw_text, is_void, Element, Node};

/// Serializes `nodes` to markup.
pub fn serialize(nodes: &[Node]) -> String {
    let mut out = String::new();
    write_nodes(nodes, false, &mut out);
    out
}

fn write_nodes(nodes: &[Node], raw: bool, out: &mut String) {
    for node in nodes {
        write_node(node, raw, out);
    }
}

fn write_node(node: &Node, raw: bool, out: &mut String) {
    match node {
        Node::Text(text) if raw => out.push_str(text),
        Node::Text(text) => out.push_str(&html_escape::encode_text(text)),
        Node::Element(el) => write_element(el, out),
    }
}

fn write_element(el: &Element, out: &mut String) {
    let tag = el.tag.to_ascii_lowercase();
    out.push('<');
    out.push_str(&tag);
    for (name, value) in el.attributes.iter() {
        out.push(' ');
        out.push_str(&name.to_ascii_lowercase());
        out.push_str("=\"");
        out.push_str(&html_escape::encode_double_quoted_attribute(value));
        out.push('"');
    }
    out.push('>');

    if is_void(&tag) {
        return;
    }

    if tag == "table" {
        write_table_children(&el.children, out);
    } else {
        write_nodes(&el.children, is_raw_text(&tag), out);
    }

    out.push_str("</");
    out.push_str(&tag);
    out.push('>');
}

/// Writes table children, wrapping each run of `tr` rows (and the whitespace
/// between them) in a `tbody`.
fn write_table_children(children: &[Node], out: &mut String) {
    let mut i = 0;
    while i < children.len() {
        if !is_row(&children[i]) {
            write_node(&children[i], false, out);
            i += 1;
            continue;
        }

        let mut end = i + 1;
        let mut last_row = i;
        while end < children.len() && (is_row(&children[end]) || is_blank(&children[end])) {
            if is_row(&children[end]) {
                last_row = end;
            }
            end += 1;
        }

        out.push_str("<tbody>");
        write_nodes(&children[i..=last_row], false, out);
        out.push_str("</tbody>");
        i = last_row + 1;
    }
}

fn is_row(node: &Node) -> bool {
    matches!(node, Node::Element(el) if el.tag.eq_ignore_ascii_case("tr"))
}

fn is_blank(node: &Node) -> bool {
    matches!(node, Node::Text(t) if t.chars().all(|c| c.is_ascii_whitespace()))
}
