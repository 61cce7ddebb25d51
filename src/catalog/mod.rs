//! Remote model catalog access
//!
//! Provides functionality for:
//! - Typed catalog entries, versions, files and gallery images
//! - Single-attempt page and artifact requests against the REST API
//! - Lazy, retried pagination over a creator's models

pub mod client;
pub mod listing;
pub mod types;

pub use client::{ByteStream, CatalogClient, Download, HttpCatalogClient};
pub use listing::list_models;
pub use types::{
    CatalogEntry, CatalogPage, MediaKind, ModelFile, ModelImage, ModelVersion, PageCursor,
    PageMetadata,
};
