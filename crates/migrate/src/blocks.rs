// ABOUTME: Portable Text block model decoded from CMS JSON at the boundary.
// ABOUTME: Block is tagged on `_type`; unknown embeds are kept verbatim so documents round-trip.

//! Structured rich-text blocks.
//!
//! A document body is an ordered list of [`Block`] values. Text blocks hold
//! inline [`Span`]s; images, code and video are always sibling blocks, never
//! children of a text block. Any `_type` this crate does not model is kept as an
//! [`Block::Embed`] with its original JSON so patching a body never loses data.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Default text block style.
pub const STYLE_NORMAL: &str = "normal";

fn default_style() -> String {
    STYLE_NORMAL.to_string()
}

fn span_type() -> String {
    "span".to_string()
}

fn reference_type() -> String {
    "reference".to_string()
}

/// An inline run of text with marks (decorators or mark-definition keys).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "_type", default = "span_type")]
    pub kind: String,
    #[serde(rename = "_key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub marks: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Span {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            kind: span_type(),
            key: None,
            text: text.into(),
            marks: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_marks(mut self, marks: Vec<String>) -> Self {
        self.marks = marks;
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// A paragraph, heading, quote or list item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(rename = "_key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub children: Vec<Span>,
    #[serde(rename = "markDefs", default)]
    pub mark_defs: Vec<Value>,
    #[serde(rename = "listItem", default, skip_serializing_if = "Option::is_none")]
    pub list_item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TextBlock {
    pub fn new(style: impl Into<String>, children: Vec<Span>) -> Self {
        Self {
            key: None,
            style: style.into(),
            children,
            mark_defs: Vec::new(),
            list_item: None,
            level: None,
            extra: Map::new(),
        }
    }

    /// Concatenated span text in order, no separator.
    pub fn plain_text(&self) -> String {
        self.children.iter().map(|s| s.text.as_str()).collect()
    }
}

/// A reference to another document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_type", default = "reference_type")]
    pub kind: String,
    #[serde(rename = "_ref")]
    pub target: String,
    #[serde(rename = "_key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl Reference {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            kind: reference_type(),
            target: target.into(),
            key: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(rename = "_key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<Reference>,
    /// Source URL for images not yet uploaded as assets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CodeBlock {
    #[serde(rename = "_key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub code: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoBlock {
    /// `video` or `youtube`; restored as `_type` on output.
    #[serde(skip)]
    pub kind: String,
    #[serde(rename = "_key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One unit of a document body.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text(TextBlock),
    Image(ImageBlock),
    Code(CodeBlock),
    Video(VideoBlock),
    /// Any other block type, kept as the original object (including `_type`).
    Embed { kind: String, value: Map<String, Value> },
}

impl Block {
    /// Decode a block, dispatching on `_type`.
    ///
    /// Fails when the value is not an object, has no string `_type`, or a known
    /// type has fields of the wrong shape.
    pub fn from_value(value: Value) -> Result<Block, serde_json::Error> {
        let Value::Object(mut obj) = value else {
            return Err(<serde_json::Error as serde::de::Error>::custom("block is not an object"));
        };
        let kind = match obj.get("_type") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(<serde_json::Error as serde::de::Error>::custom("block is missing _type")),
        };

        if !matches!(kind.as_str(), "block" | "image" | "code" | "video" | "youtube") {
            return Ok(Block::Embed { kind, value: obj });
        }

        obj.remove("_type");
        let inner = Value::Object(obj);
        let block = match kind.as_str() {
            "block" => Block::Text(serde_json::from_value(inner)?),
            "image" => Block::Image(serde_json::from_value(inner)?),
            "code" => Block::Code(serde_json::from_value(inner)?),
            _ => {
                let mut video: VideoBlock = serde_json::from_value(inner)?;
                video.kind = kind.clone();
                Block::Video(video)
            }
        };
        Ok(block)
    }

    /// Encode back to the CMS JSON shape, restoring `_type`.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let (kind, inner) = match self {
            Block::Text(b) => ("block", serde_json::to_value(b)?),
            Block::Image(b) => ("image", serde_json::to_value(b)?),
            Block::Code(b) => ("code", serde_json::to_value(b)?),
            Block::Video(b) => {
                let kind = if b.kind.is_empty() { "video" } else { b.kind.as_str() };
                (kind, serde_json::to_value(b)?)
            }
            Block::Embed { value, .. } => return Ok(Value::Object(value.clone())),
        };
        let mut obj = match inner {
            Value::Object(obj) => obj,
            _ => Map::new(),
        };
        obj.insert("_type".to_string(), Value::String(kind.to_string()));
        Ok(Value::Object(obj))
    }

    /// The `_type` tag of this block.
    pub fn kind(&self) -> &str {
        match self {
            Block::Text(_) => "block",
            Block::Image(_) => "image",
            Block::Code(_) => "code",
            Block::Video(b) if !b.kind.is_empty() => b.kind.as_str(),
            Block::Video(_) => "video",
            Block::Embed { kind, .. } => kind.as_str(),
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Block::Text(b) => b.key.as_deref(),
            Block::Image(b) => b.key.as_deref(),
            Block::Code(b) => b.key.as_deref(),
            Block::Video(b) => b.key.as_deref(),
            Block::Embed { value, .. } => value.get("_key").and_then(Value::as_str),
        }
    }

    pub fn as_text(&self) -> Option<&TextBlock> {
        match self {
            Block::Text(b) => Some(b),
            _ => None,
        }
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value()
            .map_err(<S::Error as serde::ser::Error>::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Block::from_value(value).map_err(<D::Error as serde::de::Error>::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_text_block_with_spans() {
        let block = Block::from_value(json!({
            "_type": "block",
            "_key": "k1",
            "style": "h2",
            "markDefs": [],
            "children": [
                {"_type": "span", "_key": "s1", "text": "Hello ", "marks": []},
                {"_type": "span", "_key": "s2", "text": "world", "marks": ["strong"]}
            ]
        }))
        .unwrap();

        let text = block.as_text().expect("text block");
        assert_eq!(text.style, "h2");
        assert_eq!(text.plain_text(), "Hello world");
        assert_eq!(block.key(), Some("k1"));
        assert!(text.extra.is_empty());
    }

    #[test]
    fn text_block_defaults_style_to_normal() {
        let block = Block::from_value(json!({"_type": "block", "children": []})).unwrap();
        assert_eq!(block.as_text().unwrap().style, STYLE_NORMAL);
    }

    #[test]
    fn unknown_type_is_kept_verbatim() {
        let raw = json!({"_type": "callout", "_key": "c1", "tone": "warning"});
        let block = Block::from_value(raw.clone()).unwrap();
        assert_eq!(block.kind(), "callout");
        assert_eq!(block.key(), Some("c1"));
        assert_eq!(block.to_value().unwrap(), raw);
    }

    #[test]
    fn youtube_keeps_its_type_tag() {
        let raw = json!({"_type": "youtube", "_key": "v1", "url": "https://youtu.be/x"});
        let block = Block::from_value(raw.clone()).unwrap();
        assert!(matches!(block, Block::Video(_)));
        assert_eq!(block.to_value().unwrap(), raw);
    }

    #[test]
    fn extra_fields_survive_encoding() {
        let raw = json!({
            "_type": "image",
            "_key": "i1",
            "asset": {"_type": "reference", "_ref": "image-abc"},
            "caption": "A caption"
        });
        let block = Block::from_value(raw.clone()).unwrap();
        assert_eq!(block.to_value().unwrap(), raw);
    }

    #[test]
    fn rejects_missing_type() {
        let err = Block::from_value(json!({"children": []})).unwrap_err();
        assert!(err.to_string().contains("_type"));
    }

    #[test]
    fn rejects_wrong_shape_for_known_type() {
        let err = Block::from_value(json!({"_type": "block", "children": "oops"}));
        assert!(err.is_err());
    }
}
