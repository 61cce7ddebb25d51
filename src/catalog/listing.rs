//! Lazy paginated listing
//!
//! Pages are fetched one at a time as the consumer pulls entries, so memory
//! is bounded by one page and an outage mid-listing only loses the pages not
//! yet fetched.

use super::client::CatalogClient;
use super::types::{CatalogEntry, PageCursor};
use crate::error::CatalogError;
use crate::retry::{RetryFailure, RetryPolicy};
use async_stream::try_stream;
use futures::Stream;
use std::collections::HashSet;

/// Stream every model published by `username`, in catalog order
///
/// Ends on a missing cursor, an empty page, or a 404. Any other failure is
/// yielded once and terminates the stream.
pub fn list_models<'a>(
    client: &'a dyn CatalogClient,
    policy: RetryPolicy,
    username: &'a str,
) -> impl Stream<Item = Result<CatalogEntry, RetryFailure>> + Send + 'a {
    try_stream! {
        let mut cursor: Option<PageCursor> = None;
        let mut visited: HashSet<PageCursor> = HashSet::new();
        let mut page_number = 0u32;

        loop {
            page_number += 1;
            let current = cursor.as_ref();
            let page = match policy.run(|_| client.fetch_page(username, current)).await {
                Ok(page) => page,
                Err(failure) if matches!(failure.error, CatalogError::NotFound { .. }) => {
                    if page_number == 1 {
                        tracing::warn!(username = %username, "User not found in catalog");
                    } else {
                        tracing::debug!(username = %username, page = page_number, "Listing ended with 404");
                    }
                    break;
                }
                Err(failure) => Err(failure)?,
            };

            tracing::debug!(
                username = %username,
                page = page_number,
                items = page.items.len(),
                "Listing page received"
            );

            if page.items.is_empty() {
                break;
            }

            let next = page.next();
            for item in page.items {
                let entry = CatalogEntry::from_value(item).map_err(|e| {
                    fatal(CatalogError::PaginationProtocol(format!(
                        "unreadable entry on page {}: {}",
                        page_number, e
                    )))
                })?;
                yield entry;
            }

            match next {
                None => break,
                Some(next) => {
                    if !visited.insert(next.clone()) {
                        Err(fatal(CatalogError::PaginationProtocol(format!(
                            "page cursor repeated after page {}",
                            page_number
                        ))))?;
                    }
                    cursor = Some(next);
                }
            }
        }
    }
}

fn fatal(error: CatalogError) -> RetryFailure {
    RetryFailure {
        attempts: 1,
        exhausted: false,
        error,
    }
}
