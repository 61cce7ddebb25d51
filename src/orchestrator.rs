//! Fetch-and-persist pipeline
//!
//! For each username, in order: paginate → classify → filter by type →
//! plan paths → write metadata → skip existing → enqueue missing → drain →
//! summarize. Listing and planning run sequentially on the calling task;
//! only transfers go to the shared [`WorkerPool`].

use crate::catalog::{CatalogClient, CatalogEntry, list_models};
use crate::classify::{Category, classify};
use crate::config::DownloaderConfig;
use crate::metadata::{model_url, write_version_metadata};
use crate::metrics;
use crate::paths::PathPlanner;
use crate::pool::{Batch, WorkerPool};
use crate::record::{
    CatalogTally, FailureRecord, FailureRecorder, LogWriter, RunCounts, SummaryLogger, UserSummary,
};
use crate::retry::RetryPolicy;
use crate::text::{DescriptionCleaner, clean_description};
use futures::{StreamExt, pin_mut};
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of a whole invocation
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub users: Vec<UserSummary>,
}

impl RunReport {
    /// Usernames whose listing could not be completed
    pub fn failed_users(&self) -> Vec<&str> {
        self.users
            .iter()
            .filter(|u| u.listing_error.is_some())
            .map(|u| u.username.as_str())
            .collect()
    }

    /// True when every listing completed; artifact failures do not count
    pub fn is_success(&self) -> bool {
        self.users.iter().all(|u| u.listing_error.is_none())
    }
}

/// Drives the pipeline for every configured username
pub struct Orchestrator {
    config: DownloaderConfig,
    client: Arc<dyn CatalogClient>,
    planner: PathPlanner,
    pool: WorkerPool,
    failures: FailureRecorder,
    summaries: SummaryLogger,
    listing_policy: RetryPolicy,
    clean: DescriptionCleaner,
}

impl Orchestrator {
    pub fn new(config: DownloaderConfig, client: Arc<dyn CatalogClient>) -> Self {
        let writer = Arc::new(LogWriter::new());
        let failures = FailureRecorder::new(&config.logs_dir, writer.clone());
        let summaries = SummaryLogger::new(&config.logs_dir, writer);
        let pool = WorkerPool::new(
            client.clone(),
            config.max_threads,
            config.retry_delay(),
            failures.clone(),
        );

        Self {
            planner: PathPlanner::new(&config.output_dir, config.max_tries),
            listing_policy: RetryPolicy::new(config.max_tries, config.retry_delay()),
            clean: clean_description,
            config,
            client,
            pool,
            failures,
            summaries,
        }
    }

    /// Replace the HTML description cleaner
    pub fn with_description_cleaner(mut self, clean: DescriptionCleaner) -> Self {
        self.clean = clean;
        self
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Process every username; one user's fatal error never stops the others
    pub async fn run(&self) -> RunReport {
        let mut report = RunReport::default();
        for username in &self.config.usernames {
            report.users.push(self.process_user(username).await);
        }
        report
    }

    pub async fn process_user(&self, username: &str) -> UserSummary {
        tracing::info!(username = %username, filter = %self.config.filter, "Processing username");

        let mut counts = RunCounts::default();
        let mut tally = CatalogTally::new();
        let mut batch = self.pool.batch(username);
        let mut listing_error = None;
        let mut seen = HashSet::new();

        let entries = list_models(self.client.as_ref(), self.listing_policy, username);
        pin_mut!(entries);

        while let Some(item) = entries.next().await {
            let entry = match item {
                Ok(entry) => entry,
                Err(failure) => {
                    tracing::error!(
                        username = %username,
                        attempts = failure.attempts,
                        error = %failure,
                        "Listing aborted"
                    );
                    self.failures
                        .record_failure(&FailureRecord {
                            timestamp: chrono::Utc::now(),
                            username: username.to_string(),
                            model_id: None,
                            model_name: String::new(),
                            url: "(listing)".to_string(),
                            error_kind: failure.error.kind().to_string(),
                            message: failure.to_string(),
                        })
                        .await;
                    listing_error = Some(failure.to_string());
                    break;
                }
            };

            if !seen.insert(entry.id) {
                tracing::debug!(
                    username = %username,
                    model_id = entry.id,
                    "Model listed again, skipping"
                );
                continue;
            }

            counts.models_listed += 1;
            let category = classify(&entry).category;
            tally.add(category, &entry);

            if !self.config.filter.admits(category) {
                tracing::debug!(
                    username = %username,
                    model_id = entry.id,
                    category = %category,
                    "Filtered out"
                );
                counts.filtered_out += 1;
                continue;
            }

            counts.models_selected += 1;
            self.enqueue_model(username, category, &entry, &mut batch, &mut counts)
                .await;
        }

        tracing::debug!(username = %username, tasks = batch.submitted(), "Waiting for downloads");
        let report = batch.drain().await;
        counts.downloaded = report.downloaded;
        counts.failed += report.failed;
        counts.new_models = report.models_with_downloads.len();

        if listing_error.is_none() {
            self.summaries.write_tally(username, &tally).await;
        }

        let summary = UserSummary {
            username: username.to_string(),
            counts,
            listing_error,
        };
        self.summaries.record_summary(&summary).await;

        tracing::info!(
            username = %username,
            models = counts.models_listed,
            new_models = counts.new_models,
            downloaded = counts.downloaded,
            skipped_existing = counts.skipped_existing,
            failed = counts.failed,
            filtered_out = counts.filtered_out,
            "Username complete"
        );

        summary
    }

    /// Plan every version of `entry`, refresh its metadata and submit missing artifacts
    async fn enqueue_model(
        &self,
        username: &str,
        category: Category,
        entry: &CatalogEntry,
        batch: &mut Batch,
        counts: &mut RunCounts,
    ) {
        for version in classify(entry).versions {
            let plan = self.planner.plan(
                username,
                category,
                version.base_model.as_deref(),
                entry,
                version,
            );

            if let Err(e) = write_version_metadata(
                &plan.dir,
                &plan.model_slug,
                &self.config.site_url,
                entry,
                version,
                self.clean,
            )
            .await
            {
                tracing::warn!(
                    username = %username,
                    model_id = entry.id,
                    version = %version.name,
                    error = %e,
                    "Could not write version metadata, skipping version"
                );
                self.failures
                    .record_failure(&FailureRecord {
                        timestamp: chrono::Utc::now(),
                        username: username.to_string(),
                        model_id: Some(entry.id),
                        model_name: entry.name.clone(),
                        url: model_url(&self.config.site_url, entry.id),
                        error_kind: e.kind().to_string(),
                        message: e.to_string(),
                    })
                    .await;
                counts.failed += 1;
                continue;
            }

            let (missing, present) = plan.partition_existing().await;
            if !present.is_empty() {
                tracing::debug!(
                    username = %username,
                    model_id = entry.id,
                    version = %version.name,
                    skipped = present.len(),
                    "Artifacts already on disk"
                );
                metrics::record_artifacts_skipped(username, present.len());
            }
            counts.skipped_existing += present.len();

            for task in missing {
                batch.submit(task);
            }
        }
    }
}
