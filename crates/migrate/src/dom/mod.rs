// ABOUTME: Owned DOM tree used by the migration normalizer, plus parsing and serialization.
// ABOUTME: Converts scraper's html5ever tree into DomNode values and writes them back as HTML.

//! DOM utilities for migrated article HTML.
//!
//! Parsing goes through scraper; the result is copied into an owned
//! [`DomNode`] tree so restructuring never holds a live handle into a tree
//! being mutated underneath it.

pub mod convert;
pub mod normalize;

use ego_tree::NodeRef;
use scraper::{Html, Node, Selector};

use crate::error::MigrateError;

/// Elements serialized without a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text is written without escaping.
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<DomNode>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_children(mut self, children: Vec<DomNode>) -> Self {
        self.children = children;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomNode {
    Element(Element),
    Text(String),
    /// Ordered children without an element of its own.
    Fragment(Vec<DomNode>),
}

impl From<Element> for DomNode {
    fn from(el: Element) -> Self {
        DomNode::Element(el)
    }
}

impl DomNode {
    pub fn element(tag: impl Into<String>, children: Vec<DomNode>) -> Self {
        DomNode::Element(Element::new(tag).with_children(children))
    }

    pub fn text(text: impl Into<String>) -> Self {
        DomNode::Text(text.into())
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            DomNode::Element(el) => Some(el.tag.as_str()),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            DomNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn children(&self) -> &[DomNode] {
        match self {
            DomNode::Element(el) => &el.children,
            DomNode::Fragment(children) => children,
            DomNode::Text(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<DomNode>> {
        match self {
            DomNode::Element(el) => Some(&mut el.children),
            DomNode::Fragment(children) => Some(children),
            DomNode::Text(_) => None,
        }
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            DomNode::Text(t) => out.push_str(t),
            _ => self.children().iter().for_each(|c| c.collect_text(out)),
        }
    }

    /// Number of descendant elements (excluding self) with the given tag.
    pub fn count_descendants(&self, tag: &str) -> usize {
        self.children()
            .iter()
            .map(|c| usize::from(c.tag() == Some(tag)) + c.count_descendants(tag))
            .sum()
    }

    /// True when self or any descendant is an element with one of `tags`.
    pub fn contains_any(&self, tags: &[&str]) -> bool {
        if let Some(tag) = self.tag() {
            if tags.contains(&tag) {
                return true;
            }
        }
        self.children().iter().any(|c| c.contains_any(tags))
    }

    /// Follow child indices from self.
    pub fn node_at(&self, path: &[usize]) -> Option<&DomNode> {
        path.iter()
            .try_fold(self, |node, &i| node.children().get(i))
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut DomNode> {
        let mut node = self;
        for &i in path {
            node = node.children_mut()?.get_mut(i)?;
        }
        Some(node)
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_html(self, false, &mut out);
        out
    }

    /// Serialized children, without the node's own tags.
    pub fn inner_html(&self) -> String {
        let raw = self
            .tag()
            .is_some_and(|tag| RAW_TEXT_TAGS.contains(&tag));
        let mut out = String::new();
        for child in self.children() {
            write_html(child, raw, &mut out);
        }
        out
    }
}

/// Replace the child at `index` with `replacement`, returning the updated parent.
///
/// Out-of-range indices and text parents are returned unchanged.
pub fn replace_child(mut parent: DomNode, index: usize, replacement: Vec<DomNode>) -> DomNode {
    if let Some(children) = parent.children_mut() {
        if index < children.len() {
            children.splice(index..=index, replacement);
        }
    }
    parent
}

/// Parse a full HTML document and return the first element matching `selector`.
pub fn parse_container(html: &str, selector: &str) -> Result<DomNode, MigrateError> {
    let sel = Selector::parse(selector).map_err(|e| {
        MigrateError::input(selector, "ParseSelector", Some(anyhow::anyhow!("{:?}", e)))
    })?;
    let doc = Html::parse_document(html);
    let container = doc.select(&sel).next().ok_or_else(|| {
        MigrateError::input(
            selector,
            "SelectContainer",
            Some(anyhow::anyhow!("no element matches the container selector")),
        )
    })?;
    convert_node(*container)
        .ok_or_else(|| MigrateError::input(selector, "SelectContainer", None))
}

/// Parse an HTML fragment into a Fragment node.
pub fn parse_fragment(html: &str) -> DomNode {
    let frag = Html::parse_fragment(html);
    let children = frag
        .root_element()
        .children()
        .filter_map(convert_node)
        .collect();
    DomNode::Fragment(children)
}

fn convert_node(node: NodeRef<'_, Node>) -> Option<DomNode> {
    match node.value() {
        Node::Element(el) => Some(DomNode::Element(Element {
            tag: el.name().to_ascii_lowercase(),
            attrs: el
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children: node.children().filter_map(convert_node).collect(),
        })),
        Node::Text(text) => Some(DomNode::Text(text.text.to_string())),
        Node::Document | Node::Fragment => Some(DomNode::Fragment(
            node.children().filter_map(convert_node).collect(),
        )),
        _ => None,
    }
}

fn write_html(node: &DomNode, raw: bool, out: &mut String) {
    match node {
        DomNode::Text(t) if raw => out.push_str(t),
        DomNode::Text(t) => escape_into(t, false, out),
        DomNode::Fragment(children) => children.iter().for_each(|c| write_html(c, raw, out)),
        DomNode::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (k, v) in &el.attrs {
                out.push(' ');
                out.push_str(k);
                out.push_str("=\"");
                escape_into(v, true, out);
                out.push('"');
            }
            out.push('>');
            if VOID_TAGS.contains(&el.tag.as_str()) {
                return;
            }
            let raw_children = RAW_TEXT_TAGS.contains(&el.tag.as_str());
            for child in &el.children {
                write_html(child, raw_children, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

fn escape_into(s: &str, attr: bool, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attr => out.push_str("&lt;"),
            '>' if !attr => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}
