// Lenient markup fragment parser producing a small node tree

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// HTML elements that never have children or a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Start tags that end an open `p` first
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "center", "dd", "details", "dialog", "dir",
    "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hgroup", "hr", "li", "listing", "main", "menu", "nav", "ol", "p",
    "pre", "section", "summary", "table", "ul",
];

/// Elements a `p` inside them cannot be closed through
const PARAGRAPH_SCOPE_BOUNDARIES: &[&str] = &[
    "applet", "button", "caption", "html", "marquee", "object", "table", "td", "template", "th",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Lowercased tag name
    pub name: String,
    /// Attributes in source order with lowercased names
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn new(name: String, attributes: Vec<(String, String)>) -> Self {
        Self {
            name,
            attributes,
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Value of the last text node directly under this element
    pub fn direct_text(&self) -> Option<&str> {
        self.children.iter().rev().find_map(|node| match node {
            Node::Text(text) => Some(text.as_str()),
            Node::Element(_) => None,
        })
    }
}

/// Top-level nodes of a parsed fragment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub children: Vec<Node>,
    /// Parsing stopped early on malformed input; `children` holds what was
    /// read before that point
    pub truncated: bool,
}

struct TreeBuilder {
    root: Vec<Node>,
    open: Vec<Element>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            root: Vec::new(),
            open: Vec::new(),
        }
    }

    fn siblings(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.root,
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let siblings = self.siblings();
        if let Some(Node::Text(previous)) = siblings.last_mut() {
            previous.push_str(text);
        } else {
            siblings.push(Node::Text(text.to_string()));
        }
    }

    fn push_leaf(&mut self, element: Element) {
        self.siblings().push(Node::Element(element));
    }

    /// Place a start tag, ending an open paragraph first when the tag cannot
    /// live inside one
    fn start(&mut self, element: Element) {
        self.end_paragraph_before(&element.name);
        if VOID_ELEMENTS.contains(&element.name.as_str()) {
            self.push_leaf(element);
        } else {
            self.open.push(element);
        }
    }

    /// Self-closed tags go through here as well
    fn end_paragraph_before(&mut self, name: &str) {
        if !CLOSES_PARAGRAPH.contains(&name) {
            return;
        }
        if let Some(position) = self.paragraph_in_scope() {
            self.close_from(position);
        }
    }

    fn paragraph_in_scope(&self) -> Option<usize> {
        for (position, element) in self.open.iter().enumerate().rev() {
            if element.name == "p" {
                return Some(position);
            }
            if PARAGRAPH_SCOPE_BOUNDARIES.contains(&element.name.as_str()) {
                return None;
            }
        }
        None
    }

    /// Close the innermost open element called `name` and anything still
    /// open inside it. A `</p>` with no paragraph to close stands for an empty
    /// one; other end tags with no matching open element are ignored.
    fn close(&mut self, name: &str) {
        if name == "p" {
            match self.paragraph_in_scope() {
                Some(position) => self.close_from(position),
                None => self.push_leaf(Element::new("p".to_string(), Vec::new())),
            }
            return;
        }
        if let Some(position) = self.open.iter().rposition(|element| element.name == name) {
            self.close_from(position);
        }
    }

    fn close_from(&mut self, position: usize) {
        while self.open.len() > position {
            self.close_innermost();
        }
    }

    fn close_innermost(&mut self) {
        if let Some(element) = self.open.pop() {
            self.siblings().push(Node::Element(element));
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while !self.open.is_empty() {
            self.close_innermost();
        }
        self.root
    }
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

fn element_from_start(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Element {
    let name = tag_name(start.name().as_ref());
    let attributes = start
        .html_attributes()
        .flatten()
        .map(|attr| {
            let key = tag_name(attr.key.as_ref());
            let value = match attr.decode_and_unescape_value(reader.decoder()) {
                Ok(value) => value.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            (key, value)
        })
        .collect();
    Element::new(name, attributes)
}

/// Resolve an entity reference body such as `eacute` or `#39` against the
/// HTML named character table. Unknown names come back as written.
fn resolve_entity(name: &str) -> String {
    let reference = format!("&{name};");
    match quick_xml::escape::unescape(&reference) {
        Ok(resolved) => resolved.into_owned(),
        Err(_) => reference,
    }
}

pub fn parse_fragment(html: &str) -> Fragment {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;

    let mut tree = TreeBuilder::new();
    let mut truncated = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                tree.start(element_from_start(&reader, &start));
            }
            Ok(Event::Empty(start)) => {
                let element = element_from_start(&reader, &start);
                tree.end_paragraph_before(&element.name);
                tree.push_leaf(element);
            }
            Ok(Event::End(end)) => {
                let name = tag_name(end.name().as_ref());
                tree.close(&name);
            }
            Ok(Event::Text(text)) => match text.decode() {
                Ok(text) => tree.push_text(&text),
                Err(_) => tree.push_text(&String::from_utf8_lossy(&text)),
            },
            Ok(Event::CData(data)) => {
                tree.push_text(&String::from_utf8_lossy(&data));
            }
            Ok(Event::GeneralRef(reference)) => {
                let name = match reference.decode() {
                    Ok(name) => name.into_owned(),
                    Err(_) => String::from_utf8_lossy(&reference).into_owned(),
                };
                tree.push_text(&resolve_entity(&name));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(
                    position = reader.error_position(),
                    error = %err,
                    "markup fragment is malformed, keeping what was parsed"
                );
                truncated = true;
                break;
            }
        }
    }

    Fragment {
        children: tree.finish(),
        truncated,
    }
}
