//! Configuration structures and loading logic

use crate::classify::TypeFilter;
use crate::paths::sanitize_segment;
use crate::record::{EXECUTION_LOG, FAILURE_LOG_PREFIX};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Resolved downloader configuration
///
/// Built once (defaults, then TOML file, then environment, then CLI) and
/// handed to the orchestrator; nothing reads configuration from globals.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DownloaderConfig {
    pub usernames: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub filter: TypeFilter,
    pub retry_delay_secs: u64,
    pub max_tries: u32,
    pub max_threads: usize,
    pub output_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub api_base_url: String,
    pub site_url: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub include_nsfw: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            usernames: Vec::new(),
            token: None,
            filter: TypeFilter::All,
            retry_delay_secs: default_retry_delay(),
            max_tries: default_max_tries(),
            max_threads: default_max_threads(),
            output_dir: default_output_dir(),
            logs_dir: default_logs_dir(),
            api_base_url: default_api_base_url(),
            site_url: default_site_url(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            include_nsfw: true,
        }
    }
}

impl DownloaderConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content).context("Failed to parse TOML config")?
        } else {
            Self::default()
        };

        // Environment variable overrides
        if let Ok(token) = std::env::var("CIVITAI_TOKEN") {
            config.token = Some(token);
        }
        if let Ok(dir) = std::env::var("CIVITAI_DOWNLOADER_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("CIVITAI_DOWNLOADER_LOGS_DIR") {
            config.logs_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("CIVITAI_API_BASE_URL") {
            config.api_base_url = url;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.usernames.is_empty() {
            anyhow::bail!("At least one username is required");
        }

        let mut seen = HashSet::new();
        for username in &self.usernames {
            if username.trim().is_empty() {
                anyhow::bail!("Username cannot be empty");
            }
            if username.contains('/') || username.contains('\\') {
                anyhow::bail!("Username '{}' cannot contain path separators", username);
            }
            if shadows_log_file(username) {
                anyhow::bail!(
                    "Username '{}' would overwrite a log file in {:?}",
                    username,
                    self.logs_dir
                );
            }
            if !seen.insert(username) {
                anyhow::bail!("Duplicate username: {}", username);
            }
        }

        if self.max_tries == 0 {
            anyhow::bail!("max_tries must be at least 1");
        }
        if self.max_threads == 0 {
            anyhow::bail!("max_threads must be at least 1");
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            anyhow::bail!("api_base_url must be an http(s) URL (got {})", self.api_base_url);
        }

        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// `logs/<username>.txt` would land on the execution or a failure log
fn shadows_log_file(username: &str) -> bool {
    let name = sanitize_segment(username).to_lowercase();
    let execution = EXECUTION_LOG.trim_end_matches(".txt").to_lowercase();
    name == execution || name.starts_with(&FAILURE_LOG_PREFIX.to_lowercase())
}

// Default functions
fn default_retry_delay() -> u64 {
    10
}
fn default_max_tries() -> u32 {
    3
}
fn default_max_threads() -> usize {
    5
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("model_downloads")
}
fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}
fn default_api_base_url() -> String {
    "https://civitai.com/api/v1".to_string()
}
fn default_site_url() -> String {
    "https://civitai.com".to_string()
}
fn default_connect_timeout() -> u64 {
    20
}
fn default_read_timeout() -> u64 {
    40
}
