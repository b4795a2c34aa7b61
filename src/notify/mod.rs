// src/notify/mod.rs
pub mod capture;
pub mod messages;
pub mod telegram;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use metrics::counter;
use tracing::{info, warn};

use crate::error::WatchError;
use crate::listing::Listing;

pub const DEFAULT_PACING: Duration = Duration::from_millis(500);
/// At or above this many new listings a summary message goes out first.
pub const SUMMARY_THRESHOLD: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    pub html: bool,
    pub link_preview: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            html: true,
            link_preview: true,
        }
    }
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, text: &str, opts: SendOptions) -> Result<()>;
}

/// Sends one message per new listing, never failing the run.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    pacing: Duration,
}

/// Counts for the run log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, pacing: Duration) -> Self {
        Self { transport, pacing }
    }

    pub async fn dispatch(&self, new_listings: &[Listing]) -> DispatchReport {
        let mut report = DispatchReport::default();
        if new_listings.is_empty() {
            return report;
        }

        if new_listings.len() >= SUMMARY_THRESHOLD {
            self.send_counted(&messages::summary(new_listings.len()), &mut report, None)
                .await;
        }

        for (i, listing) in new_listings.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.pacing).await;
            }
            self.send_counted(&messages::listing(listing), &mut report, Some(listing.id.as_str()))
                .await;
        }

        info!(target: "watch", sent = report.sent, failed = report.failed, "dispatch finished");
        report
    }

    async fn send_counted(&self, text: &str, report: &mut DispatchReport, id: Option<&str>) {
        match self.transport.send(text, SendOptions::default()).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                report.failed += 1;
                counter!("watch_notify_failures_total").increment(1);
                let err = WatchError::Notify(format!("{e:#}"));
                warn!(listing = id.unwrap_or("-"), error = %err, "listing notification skipped");
            }
        }
    }
}

/// Single unconditional send for init / warning / error messages.
/// Failures are logged and swallowed.
pub async fn send_solitary(transport: &dyn Transport, text: &str) -> bool {
    match transport.send(text, SendOptions::default()).await {
        Ok(()) => true,
        Err(e) => {
            counter!("watch_notify_failures_total").increment(1);
            let err = WatchError::Notify(format!("{e:#}"));
            warn!(error = %err, "solitary notification failed");
            false
        }
    }
}
