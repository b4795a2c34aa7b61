// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod dedup;
pub mod error;
pub mod ingest;
pub mod listing;
pub mod notify;
pub mod run;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::error::{Result, WatchError};
pub use crate::listing::{Listing, RawListing};
pub use crate::run::{RunController, RunOutcome, RunReport, RunSettings};

use std::sync::Arc;

use crate::config::Config;
use crate::ingest::providers::browserless::BrowserlessClient;
use crate::ingest::providers::selector::SelectorAdapter;
use crate::ingest::types::SourceAdapter;
use crate::ingest::Source;

/// One selector adapter per configured site, rendering through Browserless
/// when it is configured and fetching plain HTTP otherwise.
pub fn build_sources(cfg: &Config) -> Result<Vec<Source>> {
    let browserless = match &cfg.browserless {
        Some(b) => Some(
            BrowserlessClient::new(&b.url, b.token.as_deref())
                .map_err(|e| WatchError::Validation(format!("{e:#}")))?,
        ),
        None => None,
    };

    cfg.sites
        .iter()
        .map(|(site, addresses)| {
            let adapter = match &browserless {
                Some(client) => SelectorAdapter::via_browserless(site, client.clone()),
                None => SelectorAdapter::direct(site),
            }
            .map_err(|e| WatchError::Validation(format!("{e:#}")))?;
            let adapter: Arc<dyn SourceAdapter> = Arc::new(adapter);
            Ok(Source::new(adapter, addresses.clone()))
        })
        .collect()
}
