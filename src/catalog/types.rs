//! Catalog data model as returned by the listing endpoint
//!
//! Only the fields the pipeline reads are typed; everything else survives in
//! [`CatalogEntry::raw`] so the info file can carry the full record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One listing page
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPage {
    pub items: Vec<serde_json::Value>,
    #[serde(default)]
    pub metadata: Option<PageMetadata>,
}

/// Pagination cursor information
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    /// Fully-formed URL of the next page
    #[serde(default)]
    pub next_page: Option<String>,
    /// Opaque cursor, used when `next_page` is absent
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub total_items: Option<u64>,
}

/// Where the next listing page lives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageCursor {
    Url(String),
    Cursor(String),
}

impl CatalogPage {
    /// Cursor for the following page, if the service signalled one
    pub fn next(&self) -> Option<PageCursor> {
        let metadata = self.metadata.as_ref()?;
        if let Some(url) = metadata.next_page.as_deref().filter(|s| !s.is_empty()) {
            return Some(PageCursor::Url(url.to_string()));
        }
        metadata
            .next_cursor
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|c| PageCursor::Cursor(c.to_string()))
    }
}

/// A published model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: u64,
    pub name: String,
    /// Declared type string, e.g. "LORA", "Checkpoint", "TextualInversion"
    #[serde(rename = "type", default)]
    pub model_type: String,
    /// HTML description
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub model_versions: Vec<ModelVersion>,

    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl CatalogEntry {
    /// Parse an entry while keeping the untouched JSON alongside
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut entry: CatalogEntry = serde_json::from_value(value.clone())?;
        entry.raw = value;
        Ok(entry)
    }

    /// Union of the versions' base-model labels
    pub fn base_models(&self) -> BTreeSet<String> {
        self.model_versions
            .iter()
            .filter_map(|v| v.base_model.clone())
            .filter(|b| !b.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersion {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub base_model: Option<String>,
    #[serde(default)]
    pub trained_words: Vec<String>,
    #[serde(default)]
    pub files: Vec<ModelFile>,
    #[serde(default)]
    pub images: Vec<ModelImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFile {
    #[serde(default)]
    pub id: Option<u64>,
    /// Declared filename
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub download_url: String,
    /// Informational only
    #[serde(rename = "sizeKB", default)]
    pub size_kb: Option<f64>,
    /// Declared file role, e.g. "Model", "Training Data"
    #[serde(rename = "type", default)]
    pub file_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelImage {
    #[serde(default)]
    pub id: Option<u64>,
    pub url: String,
    #[serde(rename = "type", default)]
    pub kind: MediaKind,
}

/// Declared content kind of a gallery item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_keeps_raw_json() {
        let value = json!({
            "id": 4576,
            "name": "ModelName",
            "type": "LORA",
            "stats": { "downloadCount": 12 },
            "modelVersions": [{
                "id": 1,
                "name": "v1.0",
                "baseModel": "SD 1.5",
                "files": [{ "id": 9, "name": "model.safetensors", "downloadUrl": "https://x/9", "sizeKB": 1024.5 }],
                "images": [{ "url": "https://x/a.jpeg", "type": "video" }]
            }]
        });

        let entry = CatalogEntry::from_value(value.clone()).unwrap();
        assert_eq!(entry.id, 4576);
        assert_eq!(entry.model_type, "LORA");
        assert_eq!(entry.raw, value);
        assert_eq!(entry.model_versions[0].images[0].kind, MediaKind::Video);
        assert_eq!(entry.model_versions[0].files[0].size_kb, Some(1024.5));
        assert!(entry.base_models().contains("SD 1.5"));
    }

    #[test]
    fn test_unknown_media_kind() {
        let image: ModelImage =
            serde_json::from_value(json!({ "url": "https://x/a", "type": "audio" })).unwrap();
        assert_eq!(image.kind, MediaKind::Unknown);
    }

    #[test]
    fn test_next_cursor_preference() {
        let page: CatalogPage = serde_json::from_value(json!({
            "items": [],
            "metadata": { "nextPage": "https://x/page2", "nextCursor": "abc" }
        }))
        .unwrap();
        assert_eq!(page.next(), Some(PageCursor::Url("https://x/page2".into())));

        let page: CatalogPage = serde_json::from_value(json!({
            "items": [],
            "metadata": { "nextCursor": "abc" }
        }))
        .unwrap();
        assert_eq!(page.next(), Some(PageCursor::Cursor("abc".into())));

        let page: CatalogPage = serde_json::from_value(json!({ "items": [] })).unwrap();
        assert_eq!(page.next(), None);
    }
}
