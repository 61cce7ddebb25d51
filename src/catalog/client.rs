//! Catalog HTTP client
//!
//! Single-attempt listing and download requests. Retrying is the caller's
//! job (see [`crate::retry::RetryPolicy`]), so a page fetch and an artifact
//! download share one backoff implementation.

use super::types::{CatalogPage, PageCursor};
use crate::config::DownloaderConfig;
use crate::error::{CatalogError, CatalogResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

// ============================================================================
// Trait Definitions
// ============================================================================

/// Streaming body of an artifact download
pub type ByteStream = BoxStream<'static, CatalogResult<Bytes>>;

/// An open artifact response
pub struct Download {
    /// Declared `Content-Type`, parameters stripped
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Remote catalog operations
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch one listing page for `username`; `None` requests the first page
    async fn fetch_page(
        &self,
        username: &str,
        cursor: Option<&PageCursor>,
    ) -> CatalogResult<CatalogPage>;

    /// Open a single artifact download
    async fn download(&self, url: &str) -> CatalogResult<Download>;
}

// ============================================================================
// Production Implementation
// ============================================================================

/// reqwest-backed client for the Civitai REST API
pub struct HttpCatalogClient {
    http: reqwest::Client,
    api_base_url: String,
    token: Option<String>,
    include_nsfw: bool,
}

impl HttpCatalogClient {
    pub fn new(config: &DownloaderConfig) -> CatalogResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("civitai-downloader/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .build()
            .map_err(CatalogError::from_transport)?;

        Ok(Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
            include_nsfw: config.include_nsfw,
        })
    }

    /// URL of a listing page
    pub fn page_url(&self, username: &str, cursor: Option<&PageCursor>) -> String {
        match cursor {
            Some(PageCursor::Url(url)) => url.clone(),
            other => {
                let mut url = format!(
                    "{}/models?username={}",
                    self.api_base_url,
                    urlencoding::encode(username)
                );
                if self.include_nsfw {
                    url.push_str("&nsfw=true");
                }
                if let Some(PageCursor::Cursor(cursor)) = other {
                    url.push_str("&cursor=");
                    url.push_str(&urlencoding::encode(cursor));
                }
                url
            }
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self.http.get(url);
        match self.token {
            Some(ref token) => req.header(AUTHORIZATION, format!("Bearer {token}")),
            None => req,
        }
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn fetch_page(
        &self,
        username: &str,
        cursor: Option<&PageCursor>,
    ) -> CatalogResult<CatalogPage> {
        let url = self.page_url(username, cursor);
        tracing::debug!(username = %username, url = %url, "Fetching listing page");

        let response = self
            .get(&url)
            .send()
            .await
            .map_err(CatalogError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::from_status(status, &url));
        }

        let body = response
            .bytes()
            .await
            .map_err(CatalogError::from_transport)?;

        serde_json::from_slice(&body)
            .map_err(|e| CatalogError::PaginationProtocol(format!("{}: {}", url, e)))
    }

    async fn download(&self, url: &str) -> CatalogResult<Download> {
        let response = self
            .get(url)
            .send()
            .await
            .map_err(CatalogError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::from_status(status, url));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(media_type);
        let content_length = response.content_length();

        let body = response
            .bytes_stream()
            .map_err(CatalogError::from_transport)
            .boxed();

        Ok(Download {
            content_type,
            content_length,
            body,
        })
    }
}

/// Lower-cased media type without parameters ("image/jpeg; q=1" -> "image/jpeg")
pub fn media_type(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
