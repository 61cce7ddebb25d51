//! Deterministic on-disk layout for downloaded artifacts
//!
//! Layout:
//! ```text
//! model_downloads/<username>/<Category>/[<BaseModel>/]<id - Name>/<VersionName>/
//! ├── <file artifacts>
//! ├── <modelSlug>.preview.<ext>
//! ├── examples/<modelSlug>-<n>.<ext>
//! ├── details.txt
//! ├── <modelSlug>.civitai.info
//! ├── description.txt
//! └── triggerWords.txt
//! ```
//!
//! Every path is a pure function of the catalog content, so a second run
//! resolves to the same targets and skips whatever is already on disk.

use crate::catalog::{CatalogEntry, MediaKind, ModelVersion};
use crate::classify::Category;
use crate::metadata::{DESCRIPTION_FILE, DETAILS_FILE, TRIGGER_WORDS_FILE, info_file_name};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Longest sanitized path segment, in bytes
pub const MAX_SEGMENT_BYTES: usize = 200;

/// Subfolder holding gallery images after the preview
pub const EXAMPLES_DIR: &str = "examples";

const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Content type to extension table
const EXTENSION_TABLE: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/pjpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("image/avif", "avif"),
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
    ("video/quicktime", "mov"),
    ("application/zip", "zip"),
    ("application/x-zip-compressed", "zip"),
    ("application/x-tar", "tar"),
    ("application/gzip", "gz"),
    ("application/json", "json"),
    ("text/plain", "txt"),
];

/// Content types that say nothing about the payload
const GENERIC_CONTENT_TYPES: &[&str] = &[
    "application/octet-stream",
    "binary/octet-stream",
    "application/binary",
    "application/force-download",
];

// ============================================================================
// Sanitization
// ============================================================================

/// Make a display name safe to use as one path segment
///
/// Illegal and control characters become `_` one-for-one (no collapsing, so
/// names differing elsewhere stay distinct), surrounding whitespace and dots
/// are trimmed, Windows device names get a `_` prefix and the result is
/// capped at [`MAX_SEGMENT_BYTES`].
pub fn sanitize_segment(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c.is_whitespace() || c == '.');
    let mut out = truncate_bytes(trimmed, MAX_SEGMENT_BYTES)
        .trim_end_matches(|c: char| c.is_whitespace() || c == '.')
        .to_string();

    if out.is_empty() {
        return "_".to_string();
    }

    let stem = out.split('.').next().unwrap_or_default().trim_end();
    if RESERVED_NAMES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(stem))
    {
        out.insert(0, '_');
        out = truncate_bytes(&out, MAX_SEGMENT_BYTES)
            .trim_end_matches(|c: char| c.is_whitespace() || c == '.')
            .to_string();
    }
    out
}

/// Like [`sanitize_segment`] but keeps the extension when truncating
pub fn sanitize_file_name(name: &str) -> String {
    match name.trim().rsplit_once('.') {
        Some((stem, ext))
            if !stem.trim().is_empty()
                && !ext.is_empty()
                && ext.len() <= 16
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            let stem = sanitize_segment(stem);
            let budget = MAX_SEGMENT_BYTES - ext.len() - 1;
            let stem = truncate_bytes(&stem, budget).trim_end_matches(|c: char| c.is_whitespace() || c == '.');
            format!("{}.{}", stem, ext)
        }
        _ => sanitize_segment(name),
    }
}

fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// `"<id> - <name>"`, the id prefix keeping same-named models apart
pub fn model_folder_name(id: u64, name: &str) -> String {
    with_prefix(&format!("{} - ", id), &sanitize_segment(name))
}

/// `prefix + name`, cutting `name` so the whole stays within [`MAX_SEGMENT_BYTES`]
fn with_prefix(prefix: &str, name: &str) -> String {
    let budget = MAX_SEGMENT_BYTES.saturating_sub(prefix.len());
    let name = truncate_bytes(name, budget).trim_end_matches(|c: char| c.is_whitespace() || c == '.');
    format!("{}{}", prefix, name)
}

/// `name + suffix`, cutting `name` so the whole stays within [`MAX_SEGMENT_BYTES`]
fn with_suffix(name: &str, suffix: &str) -> String {
    let budget = MAX_SEGMENT_BYTES.saturating_sub(suffix.len());
    format!("{}{}", truncate_bytes(name, budget), suffix)
}

/// Slug used for image and info file names
pub fn model_slug(name: &str) -> String {
    sanitize_segment(name)
}

/// Folder name for `version`
///
/// When several versions of the model sanitize to the same segment, every
/// member of that group gets its version id appended, so the result does not
/// depend on catalog order.
pub fn version_segment(entry: &CatalogEntry, version: &ModelVersion) -> String {
    let segment = sanitize_segment(&version.name);
    let key = segment.to_lowercase();
    let collisions = entry
        .model_versions
        .iter()
        .filter(|v| sanitize_segment(&v.name).to_lowercase() == key)
        .count();

    if collisions > 1 {
        with_suffix(&segment, &format!(" ({})", version.id))
    } else {
        segment
    }
}

// ============================================================================
// Extensions
// ============================================================================

/// Extension for a response, from its declared content type
///
/// The URL is only consulted when the content type is missing or generic;
/// signed URLs often carry no real extension.
pub fn extension_for(content_type: Option<&str>, url_hint: &str) -> Option<String> {
    let media = content_type
        .map(crate::catalog::client::media_type)
        .filter(|m| !m.is_empty());

    if let Some(ref media) = media {
        if let Some((_, ext)) = EXTENSION_TABLE.iter().find(|(ct, _)| ct == media) {
            return Some((*ext).to_string());
        }
        if !GENERIC_CONTENT_TYPES.contains(&media.as_str()) {
            if media.starts_with("image/") {
                return Some("jpg".to_string());
            }
            if media.starts_with("video/") {
                return Some("mp4".to_string());
            }
        }
    }

    url_extension(url_hint)
}

/// Lower-cased extension of the URL's last path segment, if it looks like one
pub fn url_extension(url: &str) -> Option<String> {
    let segment = url_terminal_segment(url)?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty()
        || ext.is_empty()
        || ext.len() > 12
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Last non-empty path segment, query and fragment removed
pub fn url_terminal_segment(url: &str) -> Option<&str> {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    let path = without_query
        .split_once("://")
        .map(|(_, rest)| rest.split_once('/').map(|(_, p)| p).unwrap_or(""))
        .unwrap_or(without_query);
    path.rsplit('/').find(|s| !s.is_empty())
}

// ============================================================================
// Targets and tasks
// ============================================================================

/// Role of an artifact within its version folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactRole {
    File,
    Preview,
    /// Gallery position, 1-based
    Example(usize),
}

/// Final file name, or a stem awaiting the response's content type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactName {
    Exact(String),
    Stem {
        stem: String,
        fallback_ext: &'static str,
    },
}

/// Where an artifact lands
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactTarget {
    pub dir: PathBuf,
    pub name: ArtifactName,
}

impl ArtifactTarget {
    /// Full path once the extension is known
    ///
    /// `content_type` and `url` only matter for stem targets.
    pub fn resolve(&self, content_type: Option<&str>, url: &str) -> PathBuf {
        match &self.name {
            ArtifactName::Exact(name) => self.dir.join(name),
            ArtifactName::Stem { stem, fallback_ext } => {
                let ext = extension_for(content_type, url)
                    .unwrap_or_else(|| (*fallback_ext).to_string());
                self.dir.join(format!("{}.{}", stem, ext))
            }
        }
    }

    /// Existing non-empty file for this target, if any
    pub async fn existing(&self, url: &str) -> Option<PathBuf> {
        for path in self.candidates(url) {
            if is_present(&path).await {
                return Some(path);
            }
        }
        None
    }

    /// Paths that would satisfy this target, in lookup order
    fn candidates(&self, url: &str) -> Vec<PathBuf> {
        match &self.name {
            ArtifactName::Exact(name) => vec![self.dir.join(name)],
            ArtifactName::Stem { stem, fallback_ext } => {
                let mut exts: Vec<String> = EXTENSION_TABLE
                    .iter()
                    .map(|(_, ext)| (*ext).to_string())
                    .collect();
                exts.push((*fallback_ext).to_string());
                exts.extend(url_extension(url));
                exts.dedup();
                exts.into_iter()
                    .map(|ext| self.dir.join(format!("{}.{}", stem, ext)))
                    .collect()
            }
        }
    }
}

/// A file exists at `path` with non-zero size
pub async fn is_present(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// One unit of download work
#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub target: ArtifactTarget,
    pub url: String,
    pub attempts_remaining: u32,
    pub role: ArtifactRole,
    pub model_id: u64,
    pub model_name: String,
}

/// Resolved directory and artifact tasks for one model version
#[derive(Debug, Clone)]
pub struct VersionPlan {
    pub dir: PathBuf,
    pub model_slug: String,
    pub tasks: Vec<DownloadTask>,
}

impl VersionPlan {
    /// Split into (missing, already present) tasks
    pub async fn partition_existing(self) -> (Vec<DownloadTask>, Vec<DownloadTask>) {
        let mut missing = Vec::new();
        let mut present = Vec::new();
        for task in self.tasks {
            match task.target.existing(&task.url).await {
                Some(_) => present.push(task),
                None => missing.push(task),
            }
        }
        (missing, present)
    }
}

// ============================================================================
// Planner
// ============================================================================

/// Computes target directories and download tasks
#[derive(Debug, Clone)]
pub struct PathPlanner {
    output_dir: PathBuf,
    max_tries: u32,
}

impl PathPlanner {
    pub fn new(output_dir: impl Into<PathBuf>, max_tries: u32) -> Self {
        Self {
            output_dir: output_dir.into(),
            max_tries,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<output>/<username>/<Category>/[<BaseModel>/]<id - Name>/<Version>`
    pub fn version_dir(
        &self,
        username: &str,
        category: Category,
        base_model: Option<&str>,
        entry: &CatalogEntry,
        version: &ModelVersion,
    ) -> PathBuf {
        let mut dir = self
            .output_dir
            .join(sanitize_segment(username))
            .join(category.dir_name());
        if let Some(base) = base_model.filter(|b| !b.trim().is_empty()) {
            dir.push(sanitize_segment(base));
        }
        dir.push(model_folder_name(entry.id, &entry.name));
        dir.push(version_segment(entry, version));
        dir
    }

    pub fn plan(
        &self,
        username: &str,
        category: Category,
        base_model: Option<&str>,
        entry: &CatalogEntry,
        version: &ModelVersion,
    ) -> VersionPlan {
        let dir = self.version_dir(username, category, base_model, entry, version);
        let slug = model_slug(&entry.name);
        let mut tasks = Vec::with_capacity(version.files.len() + version.images.len());

        for (file, name) in version.files.iter().zip(file_names(version, &slug)) {
            if file.download_url.trim().is_empty() {
                tracing::warn!(
                    model_id = entry.id,
                    version = %version.name,
                    "Skipping file entry without download URL"
                );
                continue;
            }
            tasks.push(self.task(entry, dir.clone(), name, &file.download_url, ArtifactRole::File));
        }

        for (position, image) in version.images.iter().enumerate() {
            if image.url.trim().is_empty() {
                continue;
            }
            let fallback_ext = match image.kind {
                MediaKind::Video => "mp4",
                _ => "jpg",
            };
            let (target_dir, stem, role) = if position == 0 {
                (dir.clone(), format!("{}.preview", slug), ArtifactRole::Preview)
            } else {
                (
                    dir.join(EXAMPLES_DIR),
                    format!("{}-{}", slug, position),
                    ArtifactRole::Example(position),
                )
            };
            tasks.push(self.task(
                entry,
                target_dir,
                ArtifactName::Stem { stem, fallback_ext },
                &image.url,
                role,
            ));
        }

        VersionPlan {
            dir,
            model_slug: slug,
            tasks,
        }
    }

    fn task(
        &self,
        entry: &CatalogEntry,
        dir: PathBuf,
        name: ArtifactName,
        url: &str,
        role: ArtifactRole,
    ) -> DownloadTask {
        DownloadTask {
            target: ArtifactTarget { dir, name },
            url: url.to_string(),
            attempts_remaining: self.max_tries,
            role,
            model_id: entry.id,
            model_name: entry.name.clone(),
        }
    }
}

/// Names for a version's files
///
/// Names that collide with each other or with a metadata file are prefixed
/// by the file id.
fn file_names(version: &ModelVersion, model_slug: &str) -> Vec<ArtifactName> {
    let names: Vec<ArtifactName> = version
        .files
        .iter()
        .map(|file| match file.name.as_deref().map(str::trim) {
            Some(declared) if !declared.is_empty() => {
                ArtifactName::Exact(sanitize_file_name(declared))
            }
            _ => {
                let segment = url_terminal_segment(&file.download_url).unwrap_or("download");
                let stem = match url_extension(&file.download_url) {
                    Some(ext) => segment[..segment.len() - ext.len() - 1].to_string(),
                    None => segment.to_string(),
                };
                ArtifactName::Stem {
                    stem: sanitize_segment(&stem),
                    fallback_ext: "bin",
                }
            }
        })
        .collect();

    let key = |name: &ArtifactName| match name {
        ArtifactName::Exact(n) => n.to_lowercase(),
        ArtifactName::Stem { stem, .. } => format!("{}.*", stem.to_lowercase()),
    };
    let mut counts: HashMap<String, usize> = HashMap::new();
    for name in &names {
        *counts.entry(key(name)).or_default() += 1;
    }
    for reserved in [
        DETAILS_FILE.to_string(),
        DESCRIPTION_FILE.to_string(),
        TRIGGER_WORDS_FILE.to_string(),
        info_file_name(model_slug),
    ] {
        *counts.entry(reserved.to_lowercase()).or_default() += 1;
    }

    names
        .into_iter()
        .zip(&version.files)
        .enumerate()
        .map(|(index, (name, file))| {
            if counts[&key(&name)] < 2 {
                return name;
            }
            let prefix = file.id.unwrap_or(index as u64);
            match name {
                ArtifactName::Exact(n) => ArtifactName::Exact(format!("{}_{}", prefix, n)),
                ArtifactName::Stem { stem, fallback_ext } => ArtifactName::Stem {
                    stem: format!("{}_{}", prefix, stem),
                    fallback_ext,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_entry() -> CatalogEntry {
        CatalogEntry::from_value(json!({
            "id": 4576,
            "name": "ModelName",
            "type": "LORA",
            "modelVersions": [{
                "id": 10,
                "name": "v1.0",
                "baseModel": "SD 1.5",
                "files": [{ "id": 1, "name": "model.safetensors", "downloadUrl": "https://x/api/download/models/10" }],
                "images": [
                    { "url": "https://img/a/1.jpeg", "type": "image" },
                    { "url": "https://img/a/2.jpeg", "type": "image" },
                    { "url": "https://img/a/3.mp4", "type": "video" }
                ]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("a/b:c*d"), "a_b_c_d");
        assert_eq!(sanitize_segment("  name.  "), "name");
        assert_eq!(sanitize_segment("tab\there"), "tab_here");
        assert_eq!(sanitize_segment("..."), "_");
        assert_eq!(sanitize_segment(""), "_");
        assert_eq!(sanitize_segment("CON"), "_CON");
        assert_eq!(sanitize_segment("com1.txt"), "_com1.txt");
        assert_eq!(sanitize_segment("Console"), "Console");
        assert_ne!(sanitize_segment("a?b"), sanitize_segment("a??b"));
    }

    #[test]
    fn test_sanitize_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        let out = sanitize_segment(&long);
        assert!(out.len() <= MAX_SEGMENT_BYTES);
        assert!(out.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_sanitize_file_name_keeps_extension() {
        let long = format!("{}.safetensors", "x".repeat(400));
        let out = sanitize_file_name(&long);
        assert!(out.len() <= MAX_SEGMENT_BYTES);
        assert!(out.ends_with(".safetensors"));
    }

    #[test]
    fn test_model_folder_name() {
        assert_eq!(model_folder_name(4576, "Model: Name"), "4576 - Model_ Name");
    }

    #[test]
    fn test_extension_table() {
        assert_eq!(extension_for(Some("image/jpeg"), "https://x/a.png").as_deref(), Some("jpg"));
        assert_eq!(extension_for(Some("image/png; q=1"), "").as_deref(), Some("png"));
        assert_eq!(extension_for(Some("video/webm"), "").as_deref(), Some("webm"));
        assert_eq!(extension_for(Some("image/x-new"), "").as_deref(), Some("jpg"));
        assert_eq!(
            extension_for(Some("application/octet-stream"), "https://x/m.safetensors?sig=1").as_deref(),
            Some("safetensors")
        );
        assert_eq!(extension_for(None, "https://x/api/download/models/10"), None);
        assert_eq!(extension_for(Some("application/x-unknown"), "https://x/a"), None);
    }

    #[test]
    fn test_url_terminal_segment() {
        assert_eq!(url_terminal_segment("https://x/a/b.jpeg?x=1#f"), Some("b.jpeg"));
        assert_eq!(url_terminal_segment("https://x/a/b/"), Some("b"));
        assert_eq!(url_terminal_segment("https://x"), None);
    }

    #[test]
    fn test_plan_layout() {
        let entry = sample_entry();
        let version = &entry.model_versions[0];
        let planner = PathPlanner::new("model_downloads", 3);
        let plan = planner.plan("alice", Category::Lora, Some("SD 1.5"), &entry, version);

        let expected_dir = PathBuf::from("model_downloads/alice/Lora/SD 1.5/4576 - ModelName/v1.0");
        assert_eq!(plan.dir, expected_dir);
        assert_eq!(plan.tasks.len(), 4);
        assert!(plan.tasks.iter().all(|t| t.attempts_remaining == 3));

        assert_eq!(
            plan.tasks[0].target.resolve(None, &plan.tasks[0].url),
            expected_dir.join("model.safetensors")
        );
        assert_eq!(
            plan.tasks[1].target.resolve(Some("image/jpeg"), &plan.tasks[1].url),
            expected_dir.join("ModelName.preview.jpg")
        );
        assert_eq!(
            plan.tasks[2].target.resolve(Some("image/jpeg"), &plan.tasks[2].url),
            expected_dir.join("examples/ModelName-1.jpg")
        );
        assert_eq!(
            plan.tasks[3].target.resolve(None, &plan.tasks[3].url),
            expected_dir.join("examples/ModelName-2.mp4")
        );
        assert_eq!(plan.tasks[2].role, ArtifactRole::Example(1));
    }

    #[test]
    fn test_plan_without_base_model() {
        let entry = sample_entry();
        let planner = PathPlanner::new("out", 1);
        let dir = planner.version_dir("alice", Category::Other, None, &entry, &entry.model_versions[0]);
        assert_eq!(dir, PathBuf::from("out/alice/Other/4576 - ModelName/v1.0"));
    }

    #[test]
    fn test_plan_is_pure() {
        let entry = sample_entry();
        let version = &entry.model_versions[0];
        let planner = PathPlanner::new("out", 3);
        let a = planner.plan("alice", Category::Lora, Some("SD 1.5"), &entry, version);
        let b = planner.plan("alice", Category::Lora, Some("SD 1.5"), &entry, version);
        let targets = |p: &VersionPlan| p.tasks.iter().map(|t| t.target.clone()).collect::<Vec<_>>();
        assert_eq!(a.dir, b.dir);
        assert_eq!(targets(&a), targets(&b));
    }

    #[test]
    fn test_version_collision_policy() {
        let entry = CatalogEntry::from_value(json!({
            "id": 1,
            "name": "m",
            "modelVersions": [
                { "id": 20, "name": "v1/2" },
                { "id": 21, "name": "v1:2" },
                { "id": 22, "name": "v2" }
            ]
        }))
        .unwrap();
        let segments: Vec<String> = entry
            .model_versions
            .iter()
            .map(|v| version_segment(&entry, v))
            .collect();
        assert_eq!(segments, vec!["v1_2 (20)", "v1_2 (21)", "v2"]);
    }

    #[test]
    fn test_file_name_collision_policy() {
        let entry = CatalogEntry::from_value(json!({
            "id": 1,
            "name": "m",
            "modelVersions": [{
                "id": 2,
                "name": "v",
                "files": [
                    { "id": 7, "name": "a?.zip", "downloadUrl": "https://x/7" },
                    { "id": 8, "name": "a*.zip", "downloadUrl": "https://x/8" },
                    { "id": 9, "downloadUrl": "https://x/files/9" }
                ]
            }]
        }))
        .unwrap();
        let plan = PathPlanner::new("o", 1).plan("u", Category::Other, None, &entry, &entry.model_versions[0]);
        let names: Vec<ArtifactName> = plan.tasks.iter().map(|t| t.target.name.clone()).collect();
        assert_eq!(names[0], ArtifactName::Exact("7_a_.zip".into()));
        assert_eq!(names[1], ArtifactName::Exact("8_a_.zip".into()));
        assert_eq!(
            names[2],
            ArtifactName::Stem {
                stem: "9".into(),
                fallback_ext: "bin"
            }
        );
    }

    #[tokio::test]
    async fn test_existence_check() {
        let temp_dir = tempfile::tempdir().unwrap();
        let exact = ArtifactTarget {
            dir: temp_dir.path().to_path_buf(),
            name: ArtifactName::Exact("model.safetensors".into()),
        };
        assert!(exact.existing("u").await.is_none());

        // Zero-byte files do not count
        std::fs::write(temp_dir.path().join("model.safetensors"), b"").unwrap();
        assert!(exact.existing("u").await.is_none());

        std::fs::write(temp_dir.path().join("model.safetensors"), b"weights").unwrap();
        assert!(exact.existing("u").await.is_some());

        let stem = ArtifactTarget {
            dir: temp_dir.path().to_path_buf(),
            name: ArtifactName::Stem {
                stem: "m.preview".into(),
                fallback_ext: "jpg",
            },
        };
        assert!(stem.existing("https://x/1.jpeg").await.is_none());
        std::fs::write(temp_dir.path().join("m.preview.webp"), b"img").unwrap();
        assert_eq!(
            stem.existing("https://x/1.jpeg").await,
            Some(temp_dir.path().join("m.preview.webp"))
        );
    }

    #[tokio::test]
    async fn test_partial_download_is_not_present() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("model.safetensors.part"), b"half").unwrap();
        let target = ArtifactTarget {
            dir: temp_dir.path().to_path_buf(),
            name: ArtifactName::Exact("model.safetensors".into()),
        };
        assert!(target.existing("u").await.is_none());
    }

    #[test]
    fn test_file_named_like_metadata_is_prefixed() {
        let entry = CatalogEntry::from_value(json!({
            "id": 1,
            "name": "Slug",
            "modelVersions": [{
                "id": 2,
                "name": "v",
                "files": [
                    { "id": 7, "name": "details.txt", "downloadUrl": "https://x/7" },
                    { "id": 8, "name": "Slug.civitai.info", "downloadUrl": "https://x/8" },
                    { "id": 9, "name": "weights.safetensors", "downloadUrl": "https://x/9" }
                ]
            }]
        }))
        .unwrap();
        let plan = PathPlanner::new("o", 1).plan("u", Category::Other, None, &entry, &entry.model_versions[0]);
        let names: Vec<ArtifactName> = plan.tasks.iter().map(|t| t.target.name.clone()).collect();
        assert_eq!(names[0], ArtifactName::Exact("7_details.txt".into()));
        assert_eq!(names[1], ArtifactName::Exact("8_Slug.civitai.info".into()));
        assert_eq!(names[2], ArtifactName::Exact("weights.safetensors".into()));
    }
}
