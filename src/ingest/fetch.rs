// src/ingest/fetch.rs
//! Bounded retry around a single source fetch.
//!
//! Two attempts, a fixed pause between them, no backoff: the scheduler
//! already re-invokes the whole run every interval.

use std::time::Duration;

use metrics::counter;
use tracing::{debug, warn};

use crate::error::{Result, WatchError};
use crate::ingest::types::SourceAdapter;
use crate::listing::{Listing, RawListing};

pub const DEFAULT_ATTEMPTS: u32 = 2;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

pub struct FetchOrchestrator {
    policy: RetryPolicy,
}

impl FetchOrchestrator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Fetch `address` through `adapter`, returning namespaced listings.
    ///
    /// Each attempt opens its own session and closes it before the next
    /// attempt starts, on success and failure alike.
    pub async fn fetch(&self, adapter: &dyn SourceAdapter, address: &str) -> Result<Vec<Listing>> {
        let attempts = self.policy.attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                counter!("watch_fetch_retries_total").increment(1);
                tokio::time::sleep(self.policy.delay).await;
            }

            match attempt_once(adapter, address).await {
                Ok(raw) => {
                    debug!(source = adapter.name(), address, attempt, count = raw.len(), "page fetched");
                    return Ok(raw
                        .into_iter()
                        .map(|r| Listing::from_raw(adapter.name(), r))
                        .collect());
                }
                Err(e) => {
                    warn!(source = adapter.name(), address, attempt, error = %format!("{e:#}"), "fetch attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(WatchError::SourceUnavailable {
            address: address.to_string(),
            attempts,
            source: last_err.unwrap_or_else(|| anyhow::anyhow!("no attempt made")),
        })
    }
}

async fn attempt_once(adapter: &dyn SourceAdapter, address: &str) -> anyhow::Result<Vec<RawListing>> {
    let mut session = adapter.open_session().await?;
    let out = session.fetch_page(address).await;
    session.close().await;
    out
}
