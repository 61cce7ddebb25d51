//! Civitai Downloader - Main entry point

use anyhow::{Context, Result};
use civitai_downloader::{
    Category, DownloaderConfig, HttpCatalogClient, Orchestrator, TypeFilter,
};
use clap::{Parser, ValueEnum};
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "civitai-downloader")]
#[command(about = "Download a creator's Civitai models, previews and metadata", long_about = None)]
#[command(version)]
struct Cli {
    /// Civitai usernames to process, in order
    #[arg(required = true)]
    usernames: Vec<String>,

    /// Civitai API token (prompted for when absent)
    #[arg(long)]
    token: Option<String>,

    /// Only download models of this type
    #[arg(long = "download_type", value_enum)]
    download_type: Option<DownloadType>,

    /// Download everything except models of this type
    #[arg(long = "exclude_type", value_enum, conflicts_with = "download_type")]
    exclude_type: Option<CategoryArg>,

    /// Seconds to wait between attempts
    #[arg(long = "retry_delay")]
    retry_delay: Option<u64>,

    /// Attempts per request before giving up
    #[arg(long = "max_tries")]
    max_tries: Option<u32>,

    /// Maximum concurrent downloads
    #[arg(long = "max_threads")]
    max_threads: Option<usize>,

    /// Root directory for downloaded models
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Directory for execution and failure logs
    #[arg(long)]
    logs_dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (json or pretty)
    #[arg(long, default_value = "pretty")]
    log_format: String,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CategoryArg {
    #[value(name = "Lora")]
    Lora,
    #[value(name = "Checkpoints")]
    Checkpoints,
    #[value(name = "Embeddings")]
    Embeddings,
    #[value(name = "Training_Data")]
    TrainingData,
    #[value(name = "Other")]
    Other,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Lora => Category::Lora,
            CategoryArg::Checkpoints => Category::Checkpoints,
            CategoryArg::Embeddings => Category::Embeddings,
            CategoryArg::TrainingData => Category::TrainingData,
            CategoryArg::Other => Category::Other,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DownloadType {
    #[value(name = "All")]
    All,
    #[value(name = "Lora")]
    Lora,
    #[value(name = "Checkpoints")]
    Checkpoints,
    #[value(name = "Embeddings")]
    Embeddings,
    #[value(name = "Training_Data")]
    TrainingData,
    #[value(name = "Other")]
    Other,
}

impl Cli {
    fn filter(&self) -> Option<TypeFilter> {
        if let Some(excluded) = self.exclude_type {
            return Some(TypeFilter::Exclude(excluded.into()));
        }
        self.download_type.map(|t| match t {
            DownloadType::All => TypeFilter::All,
            DownloadType::Lora => TypeFilter::Only(Category::Lora),
            DownloadType::Checkpoints => TypeFilter::Only(Category::Checkpoints),
            DownloadType::Embeddings => TypeFilter::Only(Category::Embeddings),
            DownloadType::TrainingData => TypeFilter::Only(Category::TrainingData),
            DownloadType::Other => TypeFilter::Only(Category::Other),
        })
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    match cli.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .init();
        }
    }

    // Load configuration
    let mut config = DownloaderConfig::load(cli.config.clone())?;

    // CLI overrides
    config.usernames = cli.usernames.clone();
    if let Some(filter) = cli.filter() {
        config.filter = filter;
    }
    if let Some(token) = cli.token.clone() {
        config.token = Some(token);
    }
    if let Some(delay) = cli.retry_delay {
        config.retry_delay_secs = delay;
    }
    if let Some(max_tries) = cli.max_tries {
        config.max_tries = max_tries;
    }
    if let Some(max_threads) = cli.max_threads {
        config.max_threads = max_threads;
    }
    if let Some(dir) = cli.output_dir.clone() {
        config.output_dir = dir;
    }
    if let Some(dir) = cli.logs_dir.clone() {
        config.logs_dir = dir;
    }

    config.validate()?;

    if config.token.is_none() {
        config.token = prompt_token()?;
    }

    tracing::info!(
        usernames = ?config.usernames,
        filter = %config.filter,
        max_threads = config.max_threads,
        max_tries = config.max_tries,
        output_dir = ?config.output_dir,
        "Configuration loaded"
    );

    let client = HttpCatalogClient::new(&config).context("Failed to build HTTP client")?;
    let orchestrator = Orchestrator::new(config, Arc::new(client));
    let report = orchestrator.run().await;

    for user in &report.users {
        let c = &user.counts;
        match user.listing_error {
            Some(ref e) => println!("{}: listing failed ({})", user.username, e),
            None => println!(
                "{}: {} models, {} new, {} files downloaded, {} already present, {} failed",
                user.username,
                c.models_listed,
                c.new_models,
                c.downloaded,
                c.skipped_existing,
                c.failed
            ),
        }
    }

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(usernames = ?report.failed_users(), "Some listings could not be completed");
        Ok(ExitCode::FAILURE)
    }
}

/// Ask for a token on an interactive terminal; an empty answer means anonymous access
fn prompt_token() -> Result<Option<String>> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return Ok(None);
    }

    print!("Please enter your Civitai API token (leave empty for anonymous): ");
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .context("Failed to read token from stdin")?;
    let token = line.trim();
    Ok((!token.is_empty()).then(|| token.to_string()))
}
