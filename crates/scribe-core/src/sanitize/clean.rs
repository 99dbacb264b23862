/// Allowlist filtering, written once against [`TreeAdapter`].
use tracing::debug;

use super::pattern::is_dangerous;
use super::policy::AllowlistPolicy;
use super::tree::{NodeView, TreeAdapter};
use crate::markup::{self, is_void, Attributes, Element, Node, MAX_DEPTH};

const SAFE_TARGETS: &[&str] = &["_blank", "_self"];
const FORCED_REL: &str = "noopener noreferrer";

/// Parses `markup` with `adapter`, filters it through `policy`, and serializes
/// the result.
pub fn clean<A: TreeAdapter>(adapter: &A, markup: &str, policy: &AllowlistPolicy) -> String {
    if markup.is_empty() {
        return String::new();
    }
    let roots = adapter.parse_fragment(markup);
    let mut out = Vec::new();
    clean_nodes(adapter, roots, policy, None, 0, &mut out);
    markup::serialize(&out)
}

/// Filters `handles` into `out`. `parent` is the nearest kept ancestor and
/// `depth` counts the walk so far. Kept elements never nest deeper than
/// [`MAX_DEPTH`] in the serialized output, including the `tbody` the
/// serializer adds around rows placed directly in a table.
fn clean_nodes<A: TreeAdapter>(
    adapter: &A,
    handles: Vec<A::Handle>,
    policy: &AllowlistPolicy,
    parent: Option<&str>,
    depth: usize,
    out: &mut Vec<Node>,
) {
    for handle in handles {
        match adapter.view(handle) {
            NodeView::Text(text) => out.push(Node::Text(text)),
            NodeView::Skip => {}
            NodeView::Element {
                tag,
                attributes,
                children,
            } => {
                if depth >= MAX_DEPTH {
                    debug!(tag = %tag, depth, "dropping subtree beyond nesting limit");
                    continue;
                }

                if !policy.allows_tag(&tag) {
                    if AllowlistPolicy::is_danger_tag(&tag) {
                        debug!(tag = %tag, "removed element with its content");
                    } else {
                        clean_nodes(adapter, children, policy, parent, depth + 1, out);
                    }
                    continue;
                }

                let depth = if tag == "tr" && parent == Some("table") {
                    depth + 1
                } else {
                    depth
                };
                if depth >= MAX_DEPTH {
                    debug!(tag = %tag, depth, "dropping row beyond nesting limit");
                    continue;
                }

                let mut kept = Vec::new();
                if !is_void(&tag) {
                    let parent = Some(tag.as_str());
                    clean_nodes(adapter, children, policy, parent, depth + 1, &mut kept);
                }
                let mut el = Element::new(tag);
                el.attributes = filter_attributes(&el.tag, &attributes, policy);
                el.children = kept;
                out.push(Node::Element(el));
            }
        }
    }
}

/// Applies the attribute allowlist and per-attribute value rules.
pub fn filter_attributes(
    tag: &str,
    attributes: &Attributes,
    policy: &AllowlistPolicy,
) -> Attributes {
    let mut kept = Attributes::new();

    for (name, value) in attributes.iter() {
        if !policy.allows_attribute(tag, name) {
            continue;
        }
        let value = match name {
            "href" | "src" => {
                if policy.has_dangerous_scheme(&normalize_url(value)) {
                    debug!(tag, attribute = name, "dropped dangerous url");
                    continue;
                }
                value.to_string()
            }
            "style" => match clean_style(value, policy) {
                Some(style) => style,
                None => continue,
            },
            "target" if SAFE_TARGETS.contains(&value) => value.to_string(),
            "target" => continue,
            _ if is_dangerous(value) => {
                debug!(tag, attribute = name, "dropped dangerous attribute value");
                continue;
            }
            _ => value.to_string(),
        };
        kept.insert_if_absent(name.to_string(), value);
    }

    if tag == "a" && kept.get("target") == Some("_blank") {
        kept.set("rel", FORCED_REL);
    }
    kept
}

/// Filters a `style` attribute down to allowed `property: value` pairs.
/// Returns `None` when nothing survives.
pub fn clean_style(style: &str, policy: &AllowlistPolicy) -> Option<String> {
    let declarations: Vec<String> = style
        .split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim();
            let keep =
                !value.is_empty() && policy.allows_style_prop(&property) && !is_dangerous(value);
            keep.then(|| format!("{property}: {value}"))
        })
        .collect();

    (!declarations.is_empty()).then(|| declarations.join("; "))
}

/// Lowercases a URL and strips ASCII whitespace and control characters, which
/// browsers ignore when reading the scheme.
fn normalize_url(url: &str) -> String {
    url.chars()
        .filter(|c| !(c.is_ascii_control() || *c == ' '))
        .collect::<String>()
        .to_ascii_lowercase()
}
