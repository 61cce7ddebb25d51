//! Bounded-concurrency download execution
//!
//! A [`WorkerPool`] is shared by every username in a run; its semaphore caps
//! concurrent transfers at `max_threads`. Retry sleeps happen outside the
//! permit, so only actual byte transfers hold the budget. Each username gets
//! its own [`Batch`], drained before that username's summary is written.

use crate::catalog::{ByteStream, CatalogClient};
use crate::error::{CatalogError, CatalogResult};
use crate::metrics;
use crate::paths::{ArtifactTarget, DownloadTask};
use crate::record::{FailureRecord, FailureRecorder};
use crate::retry::RetryPolicy;
use futures::StreamExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Worker pool shared across usernames
#[derive(Clone)]
pub struct WorkerPool {
    client: Arc<dyn CatalogClient>,
    permits: Arc<Semaphore>,
    retry_delay: Duration,
    recorder: FailureRecorder,
    active: Arc<AtomicUsize>,
}

/// Terminal state of one task
#[derive(Debug)]
enum TaskOutcome {
    Downloaded { model_id: u64 },
    Failed,
}

/// What a drained batch did
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub downloaded: usize,
    pub failed: usize,
    /// Models that received at least one new artifact
    pub models_with_downloads: HashSet<u64>,
}

impl WorkerPool {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        max_threads: usize,
        retry_delay: Duration,
        recorder: FailureRecorder,
    ) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(max_threads.max(1))),
            retry_delay,
            recorder,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Start a batch of tasks for `username`
    pub fn batch(&self, username: &str) -> Batch {
        Batch {
            pool: self.clone(),
            username: Arc::from(username),
            tasks: JoinSet::new(),
            targets: HashSet::new(),
            submitted: 0,
        }
    }

    async fn execute(self, username: Arc<str>, task: DownloadTask) -> TaskOutcome {
        let policy = RetryPolicy::new(task.attempts_remaining, self.retry_delay);

        let result = policy
            .run(|attempt| {
                if attempt > 1 {
                    tracing::debug!(
                        username = %username,
                        url = %task.url,
                        attempt,
                        "Retrying download"
                    );
                    metrics::record_retry(&username);
                }
                self.transfer(&task)
            })
            .await;

        match result {
            Ok((path, bytes)) => {
                tracing::info!(
                    username = %username,
                    model_id = task.model_id,
                    path = ?path,
                    bytes,
                    "Downloaded"
                );
                metrics::record_artifact_downloaded(&username, bytes);
                TaskOutcome::Downloaded {
                    model_id: task.model_id,
                }
            }
            Err(failure) => {
                tracing::warn!(
                    username = %username,
                    model_id = task.model_id,
                    url = %task.url,
                    attempts = failure.attempts,
                    error = %failure,
                    "Download failed"
                );
                metrics::record_artifact_failed(&username, failure.error.kind());
                self.recorder
                    .record_failure(&FailureRecord {
                        timestamp: chrono::Utc::now(),
                        username: username.to_string(),
                        model_id: Some(task.model_id),
                        model_name: task.model_name.clone(),
                        url: task.url.clone(),
                        error_kind: failure.error.kind().to_string(),
                        message: failure.to_string(),
                    })
                    .await;
                TaskOutcome::Failed
            }
        }
    }

    /// One attempt: open the download and write it into place
    async fn transfer(&self, task: &DownloadTask) -> CatalogResult<(PathBuf, u64)> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CatalogError::TransientNetwork("worker pool closed".to_string()))?;
        let _active = ActiveGuard::enter(&self.active);

        let download = self.client.download(&task.url).await?;
        let path = task
            .target
            .resolve(download.content_type.as_deref(), &task.url);
        let bytes = write_atomically(&path, download.body).await?;
        Ok((path, bytes))
    }
}

/// Tracks in-flight transfers for the gauge
struct ActiveGuard<'a>(&'a AtomicUsize);

impl<'a> ActiveGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::update_active_transfers(now);
        Self(counter)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        let now = self.0.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::update_active_transfers(now);
    }
}

/// Tasks submitted for one username
pub struct Batch {
    pool: WorkerPool,
    username: Arc<str>,
    tasks: JoinSet<TaskOutcome>,
    targets: HashSet<ArtifactTarget>,
    submitted: usize,
}

impl Batch {
    /// Queue `task`; returns false when its target is already queued in this batch
    pub fn submit(&mut self, task: DownloadTask) -> bool {
        if !self.targets.insert(task.target.clone()) {
            tracing::debug!(
                username = %self.username,
                url = %task.url,
                "Target already queued, skipping"
            );
            return false;
        }
        let pool = self.pool.clone();
        let username = self.username.clone();
        self.submitted += 1;
        self.tasks.spawn(pool.execute(username, task));
        true
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Wait for every submitted task
    pub async fn drain(mut self) -> BatchReport {
        let mut report = BatchReport::default();
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(TaskOutcome::Downloaded { model_id }) => {
                    report.downloaded += 1;
                    report.models_with_downloads.insert(model_id);
                }
                Ok(TaskOutcome::Failed) => report.failed += 1,
                Err(e) => {
                    tracing::error!(username = %self.username, error = %e, "Download task aborted");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

/// Stream `body` into `<path>.part`, then rename onto `path`
///
/// A failed or interrupted transfer never leaves anything at `path`. An
/// empty body is a retryable failure, since a zero-byte file never counts
/// as present.
pub async fn write_atomically(path: &Path, body: ByteStream) -> CatalogResult<u64> {
    let parent = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent)
        .await
        .map_err(|e| CatalogError::filesystem(parent, e))?;

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".part");
    let temp_path = path.with_file_name(temp_name);

    match stream_to_file(&temp_path, body).await {
        Ok(0) => {
            let _ = fs::remove_file(&temp_path).await;
            Err(CatalogError::TransientNetwork(format!(
                "empty response body for {}",
                path.display()
            )))
        }
        Ok(bytes) => {
            fs::rename(&temp_path, path)
                .await
                .map_err(|e| CatalogError::filesystem(path, e))?;
            Ok(bytes)
        }
        Err(e) => {
            let _ = fs::remove_file(&temp_path).await;
            Err(e)
        }
    }
}

async fn stream_to_file(path: &Path, mut body: ByteStream) -> CatalogResult<u64> {
    let mut file = fs::File::create(path)
        .await
        .map_err(|e| CatalogError::filesystem(path, e))?;

    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| CatalogError::filesystem(path, e))?;
        written += chunk.len() as u64;
    }

    file.sync_all()
        .await
        .map_err(|e| CatalogError::filesystem(path, e))?;
    Ok(written)
}
