// ABOUTME: ContentDocument view over fetched CMS documents plus draft-id helpers.
// ABOUTME: Decodes raw JSON at the boundary and quarantines documents that do not fit the block model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::blocks::Block;
use crate::error::MigrateError;

/// Identifier prefix that marks a draft document.
pub const DRAFT_PREFIX: &str = "drafts.";

/// A document fetched from the content store.
///
/// Fields this crate does not interpret are kept in `fields` and written back
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_type")]
    pub doc_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename = "_updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<Block>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ContentDocument {
    pub fn new(id: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            doc_type: doc_type.into(),
            title: None,
            language: None,
            updated_at: None,
            body: None,
            fields: Map::new(),
        }
    }

    pub fn with_body(mut self, body: Vec<Block>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Decode one fetched document.
    pub fn from_value(value: Value) -> Result<Self, MigrateError> {
        let id = value
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or("<unknown>")
            .to_string();
        serde_json::from_value(value)
            .map_err(|e| MigrateError::decode(id, "DecodeDocument", Some(e.into())))
    }

    pub fn is_draft(&self) -> bool {
        is_draft_id(&self.id)
    }

    /// The identifier without the draft prefix.
    pub fn base_id(&self) -> &str {
        base_id(&self.id)
    }

    /// Body blocks, empty when the document has none.
    pub fn blocks(&self) -> &[Block] {
        self.body.as_deref().unwrap_or(&[])
    }

    /// Short label for reports: id plus title when present.
    pub fn label(&self) -> String {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => format!("{} ({})", self.id, title),
            _ => self.id.clone(),
        }
    }
}

pub fn is_draft_id(id: &str) -> bool {
    id.starts_with(DRAFT_PREFIX)
}

pub fn base_id(id: &str) -> &str {
    id.strip_prefix(DRAFT_PREFIX).unwrap_or(id)
}

/// Documents decoded from a fetch, with the ones that failed decoding set aside.
#[derive(Debug, Default)]
pub struct Decoded {
    pub documents: Vec<ContentDocument>,
    pub quarantined: Vec<MigrateError>,
}

/// Decode every fetched value; failures are logged and quarantined, not fatal.
pub fn decode_documents(values: Vec<Value>) -> Decoded {
    let mut decoded = Decoded::default();
    for value in values {
        match ContentDocument::from_value(value) {
            Ok(doc) => decoded.documents.push(doc),
            Err(err) => {
                warn!(target = %err.target, error = %err, "quarantined document");
                decoded.quarantined.push(err);
            }
        }
    }
    decoded
}
