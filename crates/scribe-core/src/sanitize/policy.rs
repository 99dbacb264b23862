/// Allowlist policies: which tags, attributes, and CSS properties survive.
///
/// The two built-in profiles are immutable statics. Custom policies are built
/// with [`PolicyBuilder`] and handed to a `Sanitizer` explicitly.
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Attribute-set key that applies to every tag.
pub const WILDCARD: &str = "*";

/// URL schemes that are never allowed in `href` or `src`.
pub const DEFAULT_DANGEROUS_SCHEMES: &[&str] =
    &["javascript:", "data:", "vbscript:", "file:", "about:"];

/// Tags removed together with their whole subtree when not allowed.
const DANGER_TAGS: &[&str] = &[
    "script", "style", "object", "embed", "applet", "meta", "link",
];

// --- Content profile ---

const CONTENT_TAGS: &[&str] = &[
    "p", "br", "hr", "div", "span", "h1", "h2", "h3", "h4", "h5", "h6", "b", "strong", "i", "em",
    "u", "s", "strike", "del", "ins", "sub", "sup", "mark", "small", "code", "pre", "blockquote",
    "ul", "ol", "li", "a", "img", "table", "thead", "tbody", "tfoot", "tr", "th", "td", "caption",
    "colgroup", "col", "figure", "figcaption",
];

const CONTENT_ATTRIBUTES: &[(&str, &[&str])] = &[
    (WILDCARD, &["class", "style", "title", "dir", "lang"]),
    ("a", &["href", "target", "rel", "title"]),
    ("img", &["src", "alt", "width", "height"]),
    ("td", &["colspan", "rowspan"]),
    ("th", &["colspan", "rowspan"]),
    ("ol", &["start", "type"]),
    ("col", &["span"]),
];

const CONTENT_STYLE_PROPS: &[&str] = &[
    "color",
    "background-color",
    "font-weight",
    "font-style",
    "text-decoration",
    "text-align",
    "font-size",
    "font-family",
    "margin-left",
    "padding-left",
    "list-style-type",
    "vertical-align",
];

// --- Paste profile ---

const PASTE_TAGS: &[&str] = &[
    "p", "br", "div", "span", "h1", "h2", "h3", "h4", "h5", "h6", "b", "strong", "i", "em", "u",
    "s", "strike", "sub", "sup", "code", "pre", "blockquote", "ul", "ol", "li", "a", "img",
    "table", "thead", "tbody", "tfoot", "tr", "th", "td",
];

const PASTE_ATTRIBUTES: &[(&str, &[&str])] = &[
    (WILDCARD, &["style"]),
    ("a", &["href", "target", "rel"]),
    ("img", &["src", "alt"]),
    ("td", &["colspan", "rowspan"]),
    ("th", &["colspan", "rowspan"]),
];

const PASTE_STYLE_PROPS: &[&str] = &[
    "color",
    "background-color",
    "font-weight",
    "font-style",
    "text-decoration",
    "text-align",
];

static CONTENT: LazyLock<AllowlistPolicy> = LazyLock::new(|| {
    PolicyBuilder::new()
        .tags(CONTENT_TAGS)
        .attribute_table(CONTENT_ATTRIBUTES)
        .style_props(CONTENT_STYLE_PROPS)
        .build()
});

static PASTE: LazyLock<AllowlistPolicy> = LazyLock::new(|| {
    PolicyBuilder::new()
        .tags(PASTE_TAGS)
        .attribute_table(PASTE_ATTRIBUTES)
        .style_props(PASTE_STYLE_PROPS)
        .build()
});

/// An immutable allowlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowlistPolicy {
    allowed_tags: HashSet<String>,
    allowed_attributes: HashMap<String, HashSet<String>>,
    allowed_style_props: HashSet<String>,
    dangerous_schemes: Vec<String>,
}

impl AllowlistPolicy {
    /// Profile for normal editor content.
    pub fn content() -> &'static AllowlistPolicy {
        &CONTENT
    }

    /// Narrower profile for pasted content.
    pub fn paste() -> &'static AllowlistPolicy {
        &PASTE
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.allowed_tags.contains(tag)
    }

    /// True if `attribute` is allowed on `tag`, directly or through the wildcard set.
    pub fn allows_attribute(&self, tag: &str, attribute: &str) -> bool {
        [tag, WILDCARD].iter().any(|key| {
            self.allowed_attributes
                .get(*key)
                .is_some_and(|set| set.contains(attribute))
        })
    }

    pub fn allows_style_prop(&self, property: &str) -> bool {
        self.allowed_style_props.contains(property)
    }

    /// True if the normalized URL starts with a blocked scheme.
    pub fn has_dangerous_scheme(&self, normalized_url: &str) -> bool {
        self.dangerous_schemes
            .iter()
            .any(|scheme| normalized_url.starts_with(scheme.as_str()))
    }

    pub fn dangerous_schemes(&self) -> &[String] {
        &self.dangerous_schemes
    }

    /// True if a disallowed `tag` is removed with its whole subtree rather
    /// than unwrapped.
    pub fn is_danger_tag(tag: &str) -> bool {
        DANGER_TAGS.contains(&tag)
    }
}

/// Builds a custom [`AllowlistPolicy`].
///
/// Names are lowercased. The default scheme blocklist is always present;
/// `extra_schemes` only adds to it.
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    tags: HashSet<String>,
    attributes: HashMap<String, HashSet<String>>,
    style_props: HashSet<String>,
    extra_schemes: Vec<String>,
}

impl PolicyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing policy.
    pub fn from_policy(policy: &AllowlistPolicy) -> Self {
        Self {
            tags: policy.allowed_tags.clone(),
            attributes: policy.allowed_attributes.clone(),
            style_props: policy.allowed_style_props.clone(),
            extra_schemes: policy.dangerous_schemes.clone(),
        }
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags.extend(tags.iter().map(|t| t.to_ascii_lowercase()));
        self
    }

    /// Allows `attributes` on `tag` (or on every tag with [`WILDCARD`]).
    pub fn attributes(mut self, tag: &str, attributes: &[&str]) -> Self {
        self.attributes
            .entry(tag.to_ascii_lowercase())
            .or_default()
            .extend(attributes.iter().map(|a| a.to_ascii_lowercase()));
        self
    }

    fn attribute_table(self, table: &[(&str, &[&str])]) -> Self {
        table
            .iter()
            .fold(self, |builder, (tag, attrs)| builder.attributes(tag, attrs))
    }

    pub fn style_props(mut self, props: &[&str]) -> Self {
        self.style_props
            .extend(props.iter().map(|p| p.to_ascii_lowercase()));
        self
    }

    pub fn dangerous_scheme(mut self, scheme: &str) -> Self {
        self.extra_schemes.push(scheme.to_ascii_lowercase());
        self
    }

    pub fn remove_tag(mut self, tag: &str) -> Self {
        self.tags.remove(&tag.to_ascii_lowercase());
        self
    }

    pub fn build(self) -> AllowlistPolicy {
        let mut tags = self.tags;
        // A row is only reachable through its table and row group.
        if tags.contains("tr") {
            tags.insert("table".to_string());
            tags.insert("tbody".to_string());
        }

        let mut dangerous_schemes: Vec<String> = DEFAULT_DANGEROUS_SCHEMES
            .iter()
            .map(|s| s.to_string())
            .collect();
        for scheme in self.extra_schemes {
            if !dangerous_schemes.contains(&scheme) {
                dangerous_schemes.push(scheme);
            }
        }

        AllowlistPolicy {
            allowed_tags: tags,
            allowed_attributes: self.attributes,
            allowed_style_props: self.style_props,
            dangerous_schemes,
        }
    }
}
