//! Download counters
//!
//! Recorded through the `metrics` facade. The CLI installs no exporter, so
//! these are no-ops unless an embedding application installs a recorder.

/// Record a completed artifact download
pub fn record_artifact_downloaded(username: &str, bytes: u64) {
    metrics::counter!("civitai_downloader_artifacts_downloaded_total",
        "username" => username.to_string()
    )
    .increment(1);
    metrics::counter!("civitai_downloader_bytes_downloaded_total",
        "username" => username.to_string()
    )
    .increment(bytes);
}

/// Record an artifact skipped because it is already on disk
pub fn record_artifacts_skipped(username: &str, count: usize) {
    metrics::counter!("civitai_downloader_artifacts_skipped_total",
        "username" => username.to_string()
    )
    .increment(count as u64);
}

/// Record an irrecoverable artifact failure
pub fn record_artifact_failed(username: &str, error_kind: &'static str) {
    metrics::counter!("civitai_downloader_artifacts_failed_total",
        "username" => username.to_string(),
        "kind" => error_kind
    )
    .increment(1);
}

/// Record a download attempt that will be retried
pub fn record_retry(username: &str) {
    metrics::counter!("civitai_downloader_retries_total",
        "username" => username.to_string()
    )
    .increment(1);
}

/// Update the in-flight transfer gauge
pub fn update_active_transfers(count: usize) {
    metrics::gauge!("civitai_downloader_active_transfers").set(count as f64);
}
