//! # Run Controller
//! One invocation: read seen-state, fetch every source, classify, persist,
//! notify. Any error ends the run; [`RunController::run_or_report`] sends a
//! best-effort error notification before handing the error back to `main`.
//!
//! Write order on the new-listing path:
//! 1. ids of new-by-id listings (new and reposts) go to the identity set
//!    *before* any notification is attempted, so a crash mid-dispatch never
//!    re-announces them;
//! 2. fingerprints of the whole batch are resynced after dispatch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tracing::{error, info};

use crate::dedup::{batch_fingerprints, classify, Classification};
use crate::error::Result;
use crate::ingest::fetch::{FetchOrchestrator, RetryPolicy};
use crate::ingest::{fetch_all, Source};
use crate::notify::{messages, send_solitary, Dispatcher, DispatchReport, Transport, DEFAULT_PACING};
use crate::store::{add_and_refresh, load_seen_state, SeenStore, StoreKeys, DEFAULT_TTL};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("watch_runs_total", "Runs started.");
        describe_counter!("watch_listings_fetched_total", "Listings read from source pages.");
        describe_counter!("watch_new_total", "Listings classified as genuinely new.");
        describe_counter!("watch_reposts_total", "Listings classified as reposts.");
        describe_counter!("watch_fetch_retries_total", "Second fetch attempts.");
        describe_counter!("watch_notify_failures_total", "Failed notification sends.");
        describe_histogram!("watch_fetch_ms", "Per-address fetch time in milliseconds.");
        describe_histogram!("watch_run_ms", "Whole run time in milliseconds.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Start,
    /// Entered by the binary before a controller exists.
    Validating,
    Fetching,
    ZeroListings,
    FirstRun,
    Comparing,
    Notifying,
    Persisting,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub keys: StoreKeys,
    pub ttl: Duration,
    pub retry: RetryPolicy,
    pub pacing: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            keys: StoreKeys::default(),
            ttl: DEFAULT_TTL,
            retry: RetryPolicy::default(),
            pacing: DEFAULT_PACING,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    ZeroListings,
    Seeded { count: usize },
    Compared {
        new: usize,
        reposts: usize,
        already_seen: usize,
        dispatch: DispatchReport,
    },
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub unique_listings: usize,
    pub outcome: RunOutcome,
    pub elapsed: Duration,
}

pub struct RunController {
    store: Arc<dyn SeenStore>,
    transport: Arc<dyn Transport>,
    sources: Vec<Source>,
    settings: RunSettings,
}

impl RunController {
    pub fn new(
        store: Arc<dyn SeenStore>,
        transport: Arc<dyn Transport>,
        sources: Vec<Source>,
        settings: RunSettings,
    ) -> Self {
        Self {
            store,
            transport,
            sources,
            settings,
        }
    }

    fn enter(&self, state: RunState) {
        tracing::debug!(target: "watch", ?state, "run state");
    }

    /// Run once; on failure send one error notification (ignoring its result)
    /// and return the original error.
    pub async fn run_or_report(&self) -> Result<RunReport> {
        match self.run().await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.enter(RunState::Failed);
                error!(target: "watch", error = %e, "run failed");
                send_solitary(self.transport.as_ref(), &messages::run_failed(&e.to_string())).await;
                Err(e)
            }
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        ensure_metrics_described();
        counter!("watch_runs_total").increment(1);
        let t0 = Instant::now();
        self.enter(RunState::Start);

        let keys = &self.settings.keys;
        let store = self.store.as_ref();

        // State must be readable before anything is scraped.
        let seen = load_seen_state(store, keys).await?;

        self.enter(RunState::Fetching);
        let orchestrator = FetchOrchestrator::new(self.settings.retry);
        let listings = fetch_all(&orchestrator, &self.sources).await?;

        if listings.is_empty() {
            self.enter(RunState::ZeroListings);
            let addresses: usize = self.sources.iter().map(|s| s.addresses.len()).sum();
            info!(target: "watch", addresses, "no listings on any source");
            send_solitary(self.transport.as_ref(), &messages::zero_listings(addresses)).await;
            return Ok(self.finish(t0, 0, RunOutcome::ZeroListings));
        }

        let unique_listings = listings.len();
        let fingerprints = batch_fingerprints(&listings);

        let classification = classify(&listings, seen.first_run, &seen.ids, &seen.fingerprints);
        let (genuinely_new, reposts, already_seen) = match &classification {
            Classification::Seeded(seeded) => {
                self.enter(RunState::FirstRun);
                let ids = classification.ids_to_record();

                self.enter(RunState::Persisting);
                add_and_refresh(store, &keys.identity, &ids, self.settings.ttl).await?;
                add_and_refresh(store, &keys.fingerprints, &fingerprints, self.settings.ttl).await?;

                info!(target: "watch", count = seeded.len(), "first run: seeded");
                send_solitary(self.transport.as_ref(), &messages::initialized(seeded.len())).await;
                let outcome = RunOutcome::Seeded { count: seeded.len() };
                return Ok(self.finish(t0, unique_listings, outcome));
            }
            Classification::Compared {
                genuinely_new,
                reposts,
                already_seen,
            } => (genuinely_new, reposts, *already_seen),
        };

        self.enter(RunState::Comparing);
        counter!("watch_new_total").increment(genuinely_new.len() as u64);
        counter!("watch_reposts_total").increment(reposts.len() as u64);
        for r in reposts {
            info!(target: "watch", id = %r.id, title = %r.title, "repost suppressed");
        }

        self.enter(RunState::Persisting);
        add_and_refresh(
            store,
            &keys.identity,
            &classification.ids_to_record(),
            self.settings.ttl,
        )
        .await?;

        self.enter(RunState::Notifying);
        let dispatch = Dispatcher::new(self.transport.clone(), self.settings.pacing)
            .dispatch(genuinely_new)
            .await;

        self.enter(RunState::Persisting);
        add_and_refresh(store, &keys.fingerprints, &fingerprints, self.settings.ttl).await?;

        let outcome = RunOutcome::Compared {
            new: genuinely_new.len(),
            reposts: reposts.len(),
            already_seen,
            dispatch,
        };
        Ok(self.finish(t0, unique_listings, outcome))
    }

    fn finish(&self, t0: Instant, unique_listings: usize, outcome: RunOutcome) -> RunReport {
        self.enter(RunState::Done);
        let elapsed = t0.elapsed();
        histogram!("watch_run_ms").record(elapsed.as_secs_f64() * 1_000.0);
        info!(
            target: "watch",
            unique_listings,
            outcome = ?outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            "run finished"
        );
        RunReport {
            unique_listings,
            outcome,
            elapsed,
        }
    }
}
