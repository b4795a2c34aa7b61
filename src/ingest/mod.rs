// src/ingest/mod.rs
pub mod fetch;
pub mod providers;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;

use metrics::{counter, histogram};

use crate::error::Result;
use crate::ingest::fetch::FetchOrchestrator;
use crate::ingest::types::SourceAdapter;
use crate::listing::Listing;

/// A site adapter together with the search pages configured for it.
#[derive(Clone)]
pub struct Source {
    pub adapter: Arc<dyn SourceAdapter>,
    pub addresses: Vec<String>,
}

impl Source {
    pub fn new(adapter: Arc<dyn SourceAdapter>, addresses: Vec<String>) -> Self {
        Self { adapter, addresses }
    }
}

/// Keep the first record per id, preserving source order.
pub fn aggregate_unique(batches: Vec<Vec<Listing>>) -> Vec<Listing> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for batch in batches {
        for l in batch {
            if seen.insert(l.id.clone()) {
                out.push(l);
            }
        }
    }
    out
}

/// Fetch every configured address, one at a time, and aggregate by id.
///
/// The first source that stays unavailable after its retries fails the whole
/// fetch; partial results are never returned.
pub async fn fetch_all(orchestrator: &FetchOrchestrator, sources: &[Source]) -> Result<Vec<Listing>> {
    let mut batches = Vec::new();
    for source in sources {
        for address in &source.addresses {
            let t0 = std::time::Instant::now();
            let batch = orchestrator.fetch(source.adapter.as_ref(), address).await?;
            histogram!("watch_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
            counter!("watch_listings_fetched_total").increment(batch.len() as u64);
            tracing::info!(
                target: "watch",
                source = source.adapter.name(),
                address = address.as_str(),
                count = batch.len(),
                "source fetched"
            );
            batches.push(batch);
        }
    }
    Ok(aggregate_unique(batches))
}
