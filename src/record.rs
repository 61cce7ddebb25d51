//! Append-only run logs
//!
//! - `failed_downloads_<username>.txt`: one line per irrecoverable failure
//! - `civitAI_Model_downloader.txt`: per-user run summaries
//! - `<username>.txt`: catalog tally by category
//!
//! Writers from concurrent workers go through [`LogWriter`], which holds one
//! lock per file so lines never interleave.

use crate::catalog::CatalogEntry;
use crate::classify::{Category, training_data_files};
use crate::paths::sanitize_segment;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Execution log file name
pub const EXECUTION_LOG: &str = "civitAI_Model_downloader.txt";

/// Per-user failure logs are `<prefix><username>.txt`
pub const FAILURE_LOG_PREFIX: &str = "failed_downloads_";

// ============================================================================
// Serialized file appends
// ============================================================================

/// Appends whole lines to files, one writer at a time per file
#[derive(Default)]
pub struct LogWriter {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl LogWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        self.locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Append `text` to `path` under that file's lock
    pub async fn append(&self, path: &Path, text: &str) -> io::Result<()> {
        let lock = self.lock_for(path);
        let _guard = lock.lock().await;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await
    }

    /// Replace `path` atomically under that file's lock
    pub async fn replace(&self, path: &Path, text: &str) -> io::Result<()> {
        let lock = self.lock_for(path);
        let _guard = lock.lock().await;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let temp_file = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_file).await?;
        file.write_all(text.as_bytes()).await?;
        file.sync_all().await?;
        fs::rename(&temp_file, path).await
    }
}

// ============================================================================
// Failure records
// ============================================================================

/// One irrecoverable failure
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub timestamp: DateTime<Utc>,
    pub username: String,
    /// `None` for listing-level failures
    pub model_id: Option<u64>,
    pub model_name: String,
    pub url: String,
    pub error_kind: String,
    pub message: String,
}

impl FailureRecord {
    /// Tab-separated single line; embedded line breaks are flattened
    pub fn to_line(&self) -> String {
        let fields = [
            self.timestamp.to_rfc3339(),
            self.username.clone(),
            self.model_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.model_name.clone(),
            self.url.clone(),
            self.error_kind.clone(),
            self.message.clone(),
        ];
        let mut line = fields
            .iter()
            .map(|f| f.replace(['\t', '\r', '\n'], " "))
            .collect::<Vec<_>>()
            .join("\t");
        line.push('\n');
        line
    }
}

/// Writes per-user failure logs
#[derive(Clone)]
pub struct FailureRecorder {
    logs_dir: PathBuf,
    writer: Arc<LogWriter>,
}

impl FailureRecorder {
    pub fn new(logs_dir: impl Into<PathBuf>, writer: Arc<LogWriter>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            writer,
        }
    }

    pub fn log_path(&self, username: &str) -> PathBuf {
        self.logs_dir
            .join(format!("{}{}.txt", FAILURE_LOG_PREFIX, sanitize_segment(username)))
    }

    /// Append one failure line; write errors are reported through tracing
    pub async fn record_failure(&self, record: &FailureRecord) {
        let path = self.log_path(&record.username);
        if let Err(e) = self.writer.append(&path, &record.to_line()).await {
            tracing::error!(
                path = ?path,
                error = %e,
                url = %record.url,
                "Failed to write failure record"
            );
        }
    }
}

// ============================================================================
// Summaries
// ============================================================================

/// Per-user run statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub models_listed: usize,
    pub models_selected: usize,
    pub filtered_out: usize,
    /// Models with at least one newly downloaded artifact
    pub new_models: usize,
    pub downloaded: usize,
    pub skipped_existing: usize,
    pub failed: usize,
}

/// Outcome of one username's run
#[derive(Debug, Clone, Default)]
pub struct UserSummary {
    pub username: String,
    pub counts: RunCounts,
    /// Set when the listing could not be completed
    pub listing_error: Option<String>,
}

impl UserSummary {
    pub fn to_line(&self, timestamp: DateTime<Utc>) -> String {
        let c = &self.counts;
        let (level, status) = match self.listing_error {
            Some(ref e) => ("ERROR", format!("listing failed: {}", e.replace(['\r', '\n'], " "))),
            None => ("INFO", "listing complete".to_string()),
        };
        format!(
            "{} - {} - {}: models={} selected={} filtered_out={} new_models={} downloaded={} skipped_existing={} failed={} ({})\n",
            timestamp.format("%Y-%m-%d %H:%M:%S"),
            level,
            self.username,
            c.models_listed,
            c.models_selected,
            c.filtered_out,
            c.new_models,
            c.downloaded,
            c.skipped_existing,
            c.failed,
            status
        )
    }
}

/// Writes the execution log and catalog tallies
#[derive(Clone)]
pub struct SummaryLogger {
    logs_dir: PathBuf,
    writer: Arc<LogWriter>,
}

impl SummaryLogger {
    pub fn new(logs_dir: impl Into<PathBuf>, writer: Arc<LogWriter>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            writer,
        }
    }

    pub fn execution_log_path(&self) -> PathBuf {
        self.logs_dir.join(EXECUTION_LOG)
    }

    pub fn tally_path(&self, username: &str) -> PathBuf {
        self.logs_dir
            .join(format!("{}.txt", sanitize_segment(username)))
    }

    pub async fn record_summary(&self, summary: &UserSummary) {
        let path = self.execution_log_path();
        if let Err(e) = self
            .writer
            .append(&path, &summary.to_line(Utc::now()))
            .await
        {
            tracing::error!(path = ?path, error = %e, "Failed to write run summary");
        }
    }

    pub async fn write_tally(&self, username: &str, tally: &CatalogTally) {
        let path = self.tally_path(username);
        if let Err(e) = self.writer.replace(&path, &tally.render()).await {
            tracing::error!(path = ?path, error = %e, "Failed to write catalog summary");
        }
    }
}

/// Catalog contents by category, for `<username>.txt`
#[derive(Debug, Clone, Default)]
pub struct CatalogTally {
    items: BTreeMap<Category, Vec<String>>,
}

impl CatalogTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, category: Category, entry: &CatalogEntry) {
        let label = match category {
            Category::Other => format!("{} - Type: {}", entry.name, entry.model_type),
            _ => entry.name.clone(),
        };
        self.items.entry(category).or_default().push(label);
        self.items
            .entry(Category::TrainingData)
            .or_default()
            .extend(training_data_files(entry));
    }

    pub fn count(&self, category: Category) -> usize {
        self.items.get(&category).map(Vec::len).unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    pub fn render(&self) -> String {
        let mut out = String::from("Summary:\n");
        out.push_str(&format!("Total - Count: {}\n", self.total()));
        for category in Category::ALL {
            out.push_str(&format!("{} - Count: {}\n", category, self.count(category)));
        }
        out.push_str("\nDetailed Listing:\n");
        for category in Category::ALL {
            out.push_str(&format!("{} - Count: {}\n", category, self.count(category)));
            for item in self.items.get(&category).into_iter().flatten() {
                out.push_str(&format!("{} - Item: {}\n", category, item));
            }
            out.push('\n');
        }
        out
    }
}
