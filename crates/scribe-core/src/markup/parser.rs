/// Tolerant recursive-descent markup parser.
///
/// Never fails: malformed input degrades to a best-effort tree. Scanning is
/// byte-wise but slices are only cut at ASCII structural bytes, so every
/// slice boundary is a UTF-8 char boundary.
use super::{
    is_escapable_raw_text, is_object, is_raw_text, is_void, Attributes, Element, Node, MAX_DEPTH,
};

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

/// Parses `markup` into a list of top-level nodes.
pub fn parse(markup: &str) -> Vec<Node> {
    let mut parser = Parser { src: markup, pos: 0 };
    let mut open = Vec::new();
    let (nodes, _) = parser.parse_children(&mut open);
    nodes
}

/// Why a run of children ended.
enum Stop {
    Eof,
    /// The next token closes an open element (not consumed).
    Close,
}

/// How a start tag ended.
#[derive(PartialEq, Eq)]
enum TagEnd {
    Normal,
    SelfClosing,
    /// End of input before `>`.
    Truncated,
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

fn is_html_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(is_html_space) {
            self.pos += 1;
        }
    }

    /// Moves past the next `>`, or to the end of input.
    fn skip_past_gt(&mut self) {
        self.pos = match self.rest().find('>') {
            Some(i) => self.pos + i + 1,
            None => self.src.len(),
        };
    }

    /// Reads bytes up to (not including) the first delimiter byte.
    fn take_until(&mut self, is_delim: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|b| !is_delim(b)) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn parse_children(&mut self, open: &mut Vec<String>) -> (Vec<Node>, Stop) {
        let mut nodes = Vec::new();

        while !self.at_end() {
            if self.peek() != Some(b'<') {
                let raw = self.take_until(|b| b == b'<');
                push_text(&mut nodes, &html_escape::decode_html_entities(raw));
                continue;
            }

            if self.rest().starts_with(COMMENT_START) {
                self.skip_comment();
                continue;
            }

            match self.peek_at(1) {
                Some(b'/') => match self.peek_close_tag() {
                    Some((name, _)) if open.iter().any(|t| *t == name) => {
                        return (nodes, Stop::Close);
                    }
                    // Stray closing tag.
                    Some((_, end)) => self.pos = end,
                    None => self.skip_past_gt(),
                },
                Some(b'!' | b'?') => self.skip_past_gt(),
                Some(b) if b.is_ascii_alphabetic() => {
                    if open.len() >= MAX_DEPTH {
                        self.skip_capped_element();
                        continue;
                    }
                    let (element, trailing) = self.parse_element(open);
                    nodes.push(Node::Element(element));
                    for node in trailing {
                        match node {
                            Node::Text(t) => push_text(&mut nodes, &t),
                            other => nodes.push(other),
                        }
                    }
                }
                _ => {
                    push_text(&mut nodes, "<");
                    self.pos += 1;
                }
            }
        }

        (nodes, Stop::Eof)
    }

    /// Parses an element starting at `<`. Returns the element and, when its
    /// closing tag is missing, the content that followed its start tag (which
    /// the caller splices in after the element).
    fn parse_element(&mut self, open: &mut Vec<String>) -> (Element, Vec<Node>) {
        let (tag, attributes, end) = self.start_tag();
        let mut element = Element {
            tag,
            attributes,
            children: Vec::new(),
            self_closing: true,
        };

        if end != TagEnd::Normal || is_void(&element.tag) {
            return (element, Vec::new());
        }

        if is_raw_text(&element.tag) || is_escapable_raw_text(&element.tag) {
            let raw = self.raw_text(&element.tag);
            let text = if is_escapable_raw_text(&element.tag) {
                html_escape::decode_html_entities(raw).into_owned()
            } else {
                raw.to_string()
            };
            if !text.is_empty() {
                element.children.push(Node::Text(text));
            }
            element.self_closing = false;
            return (element, Vec::new());
        }

        open.push(element.tag.clone());
        let (children, stop) = self.parse_children(open);
        open.pop();

        if let Stop::Close = stop {
            if let Some((name, end)) = self.peek_close_tag() {
                if name == element.tag {
                    self.pos = end;
                    element.children = children;
                    element.self_closing = false;
                    return (element, Vec::new());
                }
            }
        }

        // Closing tag never found: the element is treated as self-closing and
        // its would-be children trail it.
        (element, children)
    }

    /// Consumes a start tag past the nesting limit. Ordinary content stays in
    /// the enclosing element; raw text and object fallback content are
    /// discarded up to the matching closing tag.
    fn skip_capped_element(&mut self) {
        let (tag, _, end) = self.start_tag();
        if end != TagEnd::Normal || is_void(&tag) {
            return;
        }
        if is_raw_text(&tag) || is_escapable_raw_text(&tag) || is_object(&tag) {
            self.raw_text(&tag);
        }
    }

    /// Reads `<name attrs...>` starting at `<`.
    fn start_tag(&mut self) -> (String, Attributes, TagEnd) {
        self.pos += 1;
        let tag = self
            .take_until(|b| is_html_space(b) || b == b'/' || b == b'>')
            .to_ascii_lowercase();
        let mut attributes = Attributes::new();

        loop {
            self.skip_spaces();
            match self.peek() {
                None => return (tag, attributes, TagEnd::Truncated),
                Some(b'>') => {
                    self.pos += 1;
                    return (tag, attributes, TagEnd::Normal);
                }
                Some(b'/') => {
                    self.pos += 1;
                    if self.peek() == Some(b'>') {
                        self.pos += 1;
                        return (tag, attributes, TagEnd::SelfClosing);
                    }
                    continue;
                }
                Some(_) => {}
            }

            let name = self.attribute_name();
            self.skip_spaces();
            let value = if self.peek() == Some(b'=') {
                self.pos += 1;
                self.skip_spaces();
                html_escape::decode_html_entities(self.attribute_value()).into_owned()
            } else {
                String::new()
            };
            attributes.insert_if_absent(name, value);
        }
    }

    /// Reads an attribute name. Always consumes at least one char.
    fn attribute_name(&mut self) -> String {
        let start = self.pos;
        if let Some(ch) = self.rest().chars().next() {
            self.pos += ch.len_utf8();
        }
        self.take_until(|b| is_html_space(b) || matches!(b, b'/' | b'>' | b'='));
        self.src[start..self.pos].to_ascii_lowercase()
    }

    /// Reads a quoted or unquoted attribute value (undecoded).
    fn attribute_value(&mut self) -> &'a str {
        match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let rest = self.rest();
                match rest.find(quote as char) {
                    Some(i) => {
                        self.pos += i + 1;
                        &rest[..i]
                    }
                    None => {
                        // Unbalanced quote: the value runs to the next `>`.
                        let i = rest.find('>').unwrap_or(rest.len());
                        self.pos += i;
                        &rest[..i]
                    }
                }
            }
            _ => self.take_until(|b| is_html_space(b) || b == b'>'),
        }
    }

    /// Looks at `</name ...>` at the current position without consuming it.
    /// Returns the lowercase name and the position just past the tag.
    fn peek_close_tag(&self) -> Option<(String, usize)> {
        let rest = self.rest();
        let bytes = rest.as_bytes();
        if !rest.starts_with("</") || !bytes.get(2).is_some_and(u8::is_ascii_alphabetic) {
            return None;
        }
        let name_len = bytes[2..]
            .iter()
            .position(|&b| is_html_space(b) || b == b'/' || b == b'>')
            .unwrap_or(bytes.len() - 2);
        let name = rest[2..2 + name_len].to_ascii_lowercase();
        let end = match rest[2 + name_len..].find('>') {
            Some(i) => self.pos + 2 + name_len + i + 1,
            None => self.src.len(),
        };
        Some((name, end))
    }

    fn skip_comment(&mut self) {
        let body = self.pos + COMMENT_START.len();
        self.pos = match self.src[body..].find(COMMENT_END) {
            Some(i) => body + i + COMMENT_END.len(),
            None => self.src.len(),
        };
    }

    /// Consumes raw text up to and including `</tag>`; returns the text.
    fn raw_text(&mut self, tag: &str) -> &'a str {
        let rest = self.rest();
        match find_raw_close(rest, tag) {
            Some(i) => {
                self.pos += i;
                self.skip_past_gt();
                &rest[..i]
            }
            None => {
                self.pos = self.src.len();
                rest
            }
        }
    }
}

/// Finds `</tag` (case-insensitive) followed by a tag delimiter or end of input.
fn find_raw_close(haystack: &str, tag: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let tag = tag.as_bytes();
    let mut i = 0;
    while let Some(rel) = haystack[i..].find("</") {
        let start = i + rel;
        let name_start = start + 2;
        let name_end = name_start + tag.len();
        if name_end <= bytes.len()
            && bytes[name_start..name_end].eq_ignore_ascii_case(tag)
            && bytes
                .get(name_end)
                .map_or(true, |&b| is_html_space(b) || b == b'/' || b == b'>')
        {
            return Some(start);
        }
        i = start + 2;
    }
    None
}

/// Appends text, merging with a preceding text node.
fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    match nodes.last_mut() {
        Some(Node::Text(prev)) => prev.push_str(text),
        _ => nodes.push(Node::Text(text.to_string())),
    }
}
