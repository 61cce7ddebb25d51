//! Bounded retry with a fixed inter-attempt delay
//!
//! The policy knows nothing about what it wraps: listing pages and artifact
//! downloads go through the same implementation. It never logs; the caller
//! receives a [`RetryFailure`] and decides what to record.

use crate::error::{CatalogError, CatalogResult};
use std::future::Future;
use std::time::Duration;

/// Terminal outcome of a retried operation
#[derive(Debug)]
pub struct RetryFailure {
    /// Attempts actually made, the first one included
    pub attempts: u32,
    /// True when every attempt failed with a retryable error
    pub exhausted: bool,
    pub error: CatalogError,
}

impl std::fmt::Display for RetryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.exhausted {
            write!(f, "{} (gave up after {} attempts)", self.error, self.attempts)
        } else {
            write!(f, "{}", self.error)
        }
    }
}

impl std::error::Error for RetryFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Retry parameters: (max_tries, delay, retryable predicate)
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_tries: u32,
    delay: Duration,
    retryable: fn(&CatalogError) -> bool,
}

impl RetryPolicy {
    /// Policy retrying [`CatalogError::is_retryable`] errors
    ///
    /// `max_tries` counts the first attempt; zero is treated as one.
    pub fn new(max_tries: u32, delay: Duration) -> Self {
        Self {
            max_tries: max_tries.max(1),
            delay,
            retryable: CatalogError::is_retryable,
        }
    }

    /// Replace the retryable predicate
    pub fn with_predicate(mut self, retryable: fn(&CatalogError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn max_tries(&self) -> u32 {
        self.max_tries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op` until it succeeds, fails non-retryably, or runs out of tries
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, RetryFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = CatalogResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if !(self.retryable)(&error) => {
                    return Err(RetryFailure {
                        attempts: attempt,
                        exhausted: false,
                        error,
                    });
                }
                Err(error) if attempt >= self.max_tries => {
                    return Err(RetryFailure {
                        attempts: attempt,
                        exhausted: true,
                        error,
                    });
                }
                Err(_) => {
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
