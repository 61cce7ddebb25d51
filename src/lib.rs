//! Civitai Downloader - Mirror a creator's Civitai models to disk
//!
//! Pages through each creator's catalog, classifies models by type, and
//! downloads files and gallery media into a deterministic directory tree
//! with bounded concurrency, retry and skip-if-present semantics.

pub mod catalog;
pub mod classify;
pub mod config;
pub mod error;
pub mod metadata;
pub mod metrics;
pub mod orchestrator;
pub mod paths;
pub mod pool;
pub mod record;
pub mod retry;
pub mod text;

pub use catalog::{CatalogClient, CatalogEntry, HttpCatalogClient};
pub use classify::{Category, TypeFilter};
pub use config::DownloaderConfig;
pub use error::{CatalogError, CatalogResult};
pub use orchestrator::{Orchestrator, RunReport};
pub use paths::PathPlanner;
pub use pool::WorkerPool;
pub use record::{RunCounts, UserSummary};
pub use retry::{RetryFailure, RetryPolicy};
