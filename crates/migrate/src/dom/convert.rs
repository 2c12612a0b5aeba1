// ABOUTME: Converts a normalized article container into Portable Text blocks.
// ABOUTME: Media met inside inline flow closes the pending text block so images stay sibling blocks.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{DomNode, Element};
use crate::blocks::{Block, CodeBlock, ImageBlock, Span, TextBlock, VideoBlock, STYLE_NORMAL};
use crate::keys::new_key;

static LANGUAGE_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)(?:language|lang)-([A-Za-z0-9_+#-]+)").unwrap());

// YouTube and Vimeo players become video blocks; other iframes stay generic embeds.
static VIDEO_HOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?:)?//(?:www\.)?(?:youtube\.com|youtube-nocookie\.com|youtu\.be|player\.vimeo\.com|vimeo\.com)/").unwrap()
});

const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "form", "button", "svg", "head",
];

// Block containers whose children are converted in place.
const CONTAINER_TAGS: &[&str] = &[
    "div", "section", "article", "main", "header", "footer", "aside", "nav", "figure",
    "figcaption", "table", "thead", "tbody", "tfoot", "tr", "td", "th", "dl", "dt", "dd", "body",
];

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

#[derive(Debug, Clone)]
struct Context {
    style: String,
    list_item: Option<String>,
    level: Option<u32>,
}

impl Context {
    fn normal() -> Self {
        Self {
            style: STYLE_NORMAL.to_string(),
            list_item: None,
            level: None,
        }
    }

    fn with_style(&self, style: &str) -> Self {
        Self {
            style: style.to_string(),
            ..self.clone()
        }
    }
}

/// Convert the children of `root` into body blocks.
pub fn html_to_blocks(root: &DomNode) -> Vec<Block> {
    let mut converter = Converter::default();
    let ctx = Context::normal();
    for child in root.children() {
        converter.node(child, &[], &ctx);
    }
    converter.flush();
    converter.blocks
}

#[derive(Default)]
struct Converter {
    blocks: Vec<Block>,
    current: Option<TextBlock>,
    link_defs: HashMap<String, Value>,
}

impl Converter {
    fn node(&mut self, node: &DomNode, marks: &[String], ctx: &Context) {
        match node {
            DomNode::Text(t) => self.text(t, marks, ctx),
            DomNode::Fragment(children) => {
                for child in children {
                    self.node(child, marks, ctx);
                }
            }
            DomNode::Element(el) => self.element(el, marks, ctx),
        }
    }

    fn element(&mut self, el: &Element, marks: &[String], ctx: &Context) {
        let tag = el.tag.as_str();
        match tag {
            _ if SKIP_TAGS.contains(&tag) => {}
            "br" => self.push_span("\n", marks, ctx),
            "img" => self.image(el),
            "iframe" | "video" => self.video(el),
            "pre" => self.code(el),
            "ul" | "ol" => self.list(el, ctx),
            "li" => {
                let item = Context {
                    style: STYLE_NORMAL.to_string(),
                    list_item: Some("bullet".to_string()),
                    level: Some(ctx.level.unwrap_or(0) + 1),
                };
                self.block(&el.children, &item);
            }
            "blockquote" => self.block(&el.children, &ctx.with_style("blockquote")),
            "p" => self.block(&el.children, ctx),
            _ if HEADING_TAGS.contains(&tag) => self.block(&el.children, &ctx.with_style(tag)),
            _ if CONTAINER_TAGS.contains(&tag) => self.block(&el.children, ctx),
            _ => {
                let mut inner = marks.to_vec();
                if let Some(mark) = self.mark_for(el) {
                    if !inner.contains(&mark) {
                        inner.push(mark);
                    }
                }
                for child in &el.children {
                    self.node(child, &inner, ctx);
                }
            }
        }
    }

    /// Children of a block-level element become their own text block(s).
    fn block(&mut self, children: &[DomNode], ctx: &Context) {
        self.flush();
        for child in children {
            self.node(child, &[], ctx);
        }
        self.flush();
    }

    fn list(&mut self, el: &Element, ctx: &Context) {
        self.flush();
        let item = Context {
            style: STYLE_NORMAL.to_string(),
            list_item: Some(if el.tag == "ol" { "number" } else { "bullet" }.to_string()),
            level: Some(ctx.level.unwrap_or(0) + 1),
        };
        for child in &el.children {
            match child {
                DomNode::Element(li) if li.tag == "li" => self.block(&li.children, &item),
                other => self.node(other, &[], &item),
            }
        }
        self.flush();
    }

    fn mark_for(&mut self, el: &Element) -> Option<String> {
        let decorator = match el.tag.as_str() {
            "strong" | "b" => "strong",
            "em" | "i" => "em",
            "u" => "underline",
            "s" | "strike" | "del" => "strike-through",
            "code" => "code",
            "a" => {
                let href = el.attr("href").filter(|h| !h.trim().is_empty())?;
                let key = new_key();
                self.link_defs.insert(
                    key.clone(),
                    json!({"_type": "link", "_key": key, "href": href.trim()}),
                );
                return Some(key);
            }
            _ => return None,
        };
        Some(decorator.to_string())
    }

    fn text(&mut self, raw: &str, marks: &[String], ctx: &Context) {
        let mut text = collapse_whitespace(raw);
        if text.trim().is_empty() && self.current.is_none() {
            return;
        }
        let ends_with_space = self
            .current
            .as_ref()
            .and_then(|b| b.children.last())
            .is_some_and(|s| s.text.ends_with(' '));
        if ends_with_space {
            text = text.trim_start().to_string();
        }
        if !text.is_empty() {
            self.push_span(&text, marks, ctx);
        }
    }

    fn push_span(&mut self, text: &str, marks: &[String], ctx: &Context) {
        let block = self.current.get_or_insert_with(|| {
            let mut block = TextBlock::new(ctx.style.clone(), Vec::new());
            block.list_item = ctx.list_item.clone();
            block.level = ctx.level;
            block
        });

        for mark in marks {
            if let Some(def) = self.link_defs.get(mark) {
                let present = block
                    .mark_defs
                    .iter()
                    .any(|d| d.get("_key").and_then(Value::as_str) == Some(mark.as_str()));
                if !present {
                    block.mark_defs.push(def.clone());
                }
            }
        }

        match block.children.last_mut() {
            Some(last) if last.marks.as_slice() == marks => last.text.push_str(text),
            _ => block
                .children
                .push(Span::new(text).with_marks(marks.to_vec()).with_key(new_key())),
        }
    }

    fn flush(&mut self) {
        let Some(mut block) = self.current.take() else {
            return;
        };
        if let Some(first) = block.children.first_mut() {
            first.text = first.text.trim_start().to_string();
        }
        if let Some(last) = block.children.last_mut() {
            last.text = last.text.trim_end().to_string();
        }
        block.children.retain(|s| !s.text.is_empty());
        if block.plain_text().trim().is_empty() {
            return;
        }
        block.key = Some(new_key());
        self.blocks.push(Block::Text(block));
    }

    fn image(&mut self, el: &Element) {
        self.flush();
        let Some(src) = el.attr("src").or_else(|| el.attr("data-src")) else {
            debug!("image without src skipped");
            return;
        };
        self.blocks.push(Block::Image(ImageBlock {
            key: Some(new_key()),
            url: Some(src.to_string()),
            alt: el
                .attr("alt")
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
            ..Default::default()
        }));
    }

    fn video(&mut self, el: &Element) {
        self.flush();
        let src = el.attr("src").map(str::to_string).or_else(|| {
            el.children
                .iter()
                .filter_map(DomNode::as_element)
                .find(|c| c.tag == "source")
                .and_then(|c| c.attr("src"))
                .map(str::to_string)
        });
        let Some(src) = src else {
            debug!(tag = %el.tag, "embed without src skipped");
            return;
        };

        if el.tag == "video" || VIDEO_HOST_RE.is_match(&src) {
            self.blocks.push(Block::Video(VideoBlock {
                kind: "video".to_string(),
                key: Some(new_key()),
                url: Some(src),
                extra: Map::new(),
            }));
        } else {
            let mut value = Map::new();
            value.insert("_type".to_string(), json!("embed"));
            value.insert("_key".to_string(), json!(new_key()));
            value.insert("url".to_string(), json!(src));
            self.blocks.push(Block::Embed {
                kind: "embed".to_string(),
                value,
            });
        }
    }

    fn code(&mut self, el: &Element) {
        self.flush();
        let inner_code = el
            .children
            .iter()
            .filter_map(DomNode::as_element)
            .find(|c| c.tag == "code");
        let language = [Some(el), inner_code]
            .into_iter()
            .flatten()
            .filter_map(|e| e.attr("class"))
            .find_map(|class| LANGUAGE_CLASS_RE.captures(class))
            .map(|caps| caps[1].to_ascii_lowercase());
        let code = DomNode::Element(el.clone()).text_content();
        self.blocks.push(Block::Code(CodeBlock {
            key: Some(new_key()),
            language,
            code: code.trim_end_matches('\n').to_string(),
            ..Default::default()
        }));
    }
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
