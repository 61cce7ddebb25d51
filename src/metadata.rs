//! Metadata files written next to downloaded artifacts
//!
//! These are rewritten on every run for every processed version. They are
//! cheap and deterministic, so they are not subject to the skip rule.

use crate::catalog::{CatalogEntry, ModelVersion};
use crate::error::{CatalogError, CatalogResult};
use crate::text::DescriptionCleaner;
use std::fmt::Write as _;
use std::path::Path;
use tokio::fs;

pub const DETAILS_FILE: &str = "details.txt";
pub const DESCRIPTION_FILE: &str = "description.txt";
pub const TRIGGER_WORDS_FILE: &str = "triggerWords.txt";

/// `<slug>.civitai.info`
pub fn info_file_name(model_slug: &str) -> String {
    format!("{}.civitai.info", model_slug)
}

pub fn model_url(site_url: &str, model_id: u64) -> String {
    format!("{}/models/{}", site_url.trim_end_matches('/'), model_id)
}

/// Human-readable listing of a version's files and images
pub fn render_details(site_url: &str, entry: &CatalogEntry, version: &ModelVersion) -> String {
    let model_url = model_url(site_url, entry.id);
    let mut out = String::new();

    for file in &version.files {
        let _ = writeln!(out, "Model URL: {}", model_url);
        let _ = writeln!(out, "File Name: {}", file.name.as_deref().unwrap_or(""));
        let _ = writeln!(out, "File URL: {}", file.download_url);
        out.push('\n');
    }
    for image in &version.images {
        let id = image.id.map(|id| id.to_string()).unwrap_or_default();
        let _ = writeln!(out, "Image ID: {}", id);
        let _ = writeln!(out, "Image URL: {}", image.url);
        out.push('\n');
    }
    out
}

/// Write details, info, description and trigger words into `dir`
pub async fn write_version_metadata(
    dir: &Path,
    model_slug: &str,
    site_url: &str,
    entry: &CatalogEntry,
    version: &ModelVersion,
    clean: DescriptionCleaner,
) -> CatalogResult<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| CatalogError::filesystem(dir, e))?;

    let info = serde_json::to_string_pretty(&entry.raw).unwrap_or_else(|_| entry.raw.to_string());
    let description = clean(entry.description.as_deref().unwrap_or(""));
    let trigger_words: String = version
        .trained_words
        .iter()
        .map(|w| format!("{}\n", w))
        .collect();

    let files = [
        (DETAILS_FILE.to_string(), render_details(site_url, entry, version)),
        (info_file_name(model_slug), info),
        (DESCRIPTION_FILE.to_string(), description),
        (TRIGGER_WORDS_FILE.to_string(), trigger_words),
    ];

    for (name, content) in files {
        let path = dir.join(name);
        fs::write(&path, content)
            .await
            .map_err(|e| CatalogError::filesystem(&path, e))?;
    }
    Ok(())
}
