//! Retrieved evidence.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Source metadata carried by a passage.
///
/// The known keys are the ones the ingestion job writes for PDF pages. Any
/// other keys are preserved in `extra` so they round-trip to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassageMetadata {
    /// Source document identifier (usually the PDF path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// 0-based page index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Human page label as printed in the document (e.g. "iv", "12")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Document title extracted at ingestion time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PassageMetadata {
    /// Metadata for a page of a source document.
    pub fn for_page(source: impl Into<String>, page: u32) -> Self {
        Self {
            source: Some(source.into()),
            page: Some(page),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_page_label(mut self, label: impl Into<String>) -> Self {
        self.page_label = Some(label.into());
        self
    }

    /// The `(source, page)` pair used to spot duplicate chunks of one page.
    pub fn location_key(&self) -> (Option<&str>, Option<u32>) {
        (self.source.as_deref(), self.page)
    }
}

/// A retrieved text span with its source metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    #[serde(default)]
    pub metadata: PassageMetadata,
}

impl Passage {
    pub fn new(content: impl Into<String>, metadata: PassageMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
