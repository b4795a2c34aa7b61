//! classifieds-watch: one-shot entrypoint.
//! The external scheduler starts one process per interval; exit code 0 means
//! the run completed (including "nothing new"), 1 means it failed.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use classifieds_watch::config::sites::load_sites_default;
use classifieds_watch::config::{Settings, ENV_METRICS_TEXTFILE};
use classifieds_watch::ingest::fetch::{RetryPolicy, DEFAULT_ATTEMPTS};
use classifieds_watch::notify::telegram::TelegramTransport;
use classifieds_watch::notify::{messages, send_solitary};
use classifieds_watch::store::upstash::UpstashStore;
use classifieds_watch::store::StoreKeys;
use classifieds_watch::run::RunState;
use classifieds_watch::{build_sources, RunController, RunSettings, WatchError};

/// `LOG_FORMAT=json` for log shippers, compact text otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("classifieds_watch=info,watch=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

fn install_metrics() -> Option<PrometheusHandle> {
    std::env::var(ENV_METRICS_TEXTFILE).ok()?;
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "metrics recorder not installed");
            None
        }
    }
}

fn write_metrics(handle: &PrometheusHandle) -> anyhow::Result<()> {
    let path = std::env::var(ENV_METRICS_TEXTFILE).context("metrics path")?;
    std::fs::write(&path, handle.render()).with_context(|| format!("writing metrics to {path}"))
}

async fn run() -> classifieds_watch::Result<()> {
    debug!(target: "watch", state = ?RunState::Validating, "run state");
    let sites = load_sites_default().map_err(|e| WatchError::Validation(format!("{e:#}")))?;
    let settings = Settings::from_env(sites);
    let fallback_transport = settings.telegram().map(|c| TelegramTransport::new(&c));

    let cfg = match settings.validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            if let Some(t) = &fallback_transport {
                send_solitary(t, &messages::run_failed(&e.to_string())).await;
            }
            return Err(e);
        }
    };

    let store = Arc::new(UpstashStore::new(&cfg.store)?);
    let transport = Arc::new(TelegramTransport::new(&cfg.telegram));
    let sources = match build_sources(&cfg) {
        Ok(s) => s,
        Err(e) => {
            send_solitary(transport.as_ref(), &messages::run_failed(&e.to_string())).await;
            return Err(e);
        }
    };

    let run_settings = RunSettings {
        keys: StoreKeys::default(),
        ttl: cfg.ttl,
        retry: RetryPolicy {
            attempts: DEFAULT_ATTEMPTS,
            delay: cfg.retry_delay,
        },
        pacing: cfg.pacing,
    };

    let controller = RunController::new(store, transport, sources, run_settings);
    let report = controller.run_or_report().await?;
    info!(target: "watch", outcome = ?report.outcome, "done");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();
    let metrics = install_metrics();

    let result = run().await;

    if let Some(handle) = &metrics {
        if let Err(e) = write_metrics(handle) {
            tracing::warn!(error = %format!("{e:#}"), "metrics textfile not written");
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(target: "watch", error = %e, "exiting with failure");
            ExitCode::from(1)
        }
    }
}
