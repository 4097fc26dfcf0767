//! Scrape Orchestration
//!
//! One scrape fans out to every selected target at once and joins on all of
//! them before returning, so the wall time of a scrape is that of the slowest
//! target, not the sum. Inside a target everything is sequential: first the
//! session token is ensured, then each enabled collector runs in turn against
//! the same [`TargetClient`], which keeps the load on each array bounded.
//!
//! # Failure Isolation
//!
//! - A target without a valid token skips its collectors; other targets are unaffected
//! - A failing or panicking collector is logged and the next one still runs
//! - Health series are emitted for every target on every scrape, whatever happened

use crate::collectors::CollectorRegistry;
use crate::metrics::{
    MetricSink, AUTHTOKEN_RENEW_FAILURE, AUTHTOKEN_RENEW_INTERVAL, AUTHTOKEN_RENEW_SUCCESS,
    HEALTH_METRICS, SCRAPE_DURATION, SCRAPE_SUCCESS,
};
use crate::spectrum::{HealthCounter, TargetClient, TargetHandle};
use futures_util::future::join_all;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// What happened to one target during a scrape
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub address: String,
    /// System name, or the address while unknown
    pub resource: String,
    /// Whether a valid token was available and collectors ran
    pub ok: bool,
    pub counter: HealthCounter,
    pub duration: Duration,
    /// Collectors that returned a reportable error or panicked
    pub failed_collectors: Vec<&'static str>,
}

/// Scrape all `targets` with the collectors in `collectors`, emitting into `sink`.
///
/// Returns once every target is done, with one outcome per target in input order.
pub async fn collect(
    targets: &[Arc<TargetHandle>],
    collectors: &CollectorRegistry,
    sink: &MetricSink,
) -> Vec<TargetOutcome> {
    for desc in HEALTH_METRICS {
        if let Err(e) = sink.describe(desc) {
            warn!("Failed to describe {}: {}", desc.full_name(), e);
        }
    }
    if let Err(e) = collectors.describe(sink) {
        warn!("Failed to describe collector metrics: {}", e);
    }

    let started = Instant::now();
    let outcomes = join_all(
        targets
            .iter()
            .map(|target| scrape_target(Arc::clone(target), collectors, sink)),
    )
    .await;

    info!(
        "Scraped {} target(s) in {:.3}s ({} healthy)",
        outcomes.len(),
        started.elapsed().as_secs_f64(),
        outcomes.iter().filter(|o| o.ok).count()
    );
    outcomes
}

/// Must not return before `record_health`: every target reports health on every scrape.
async fn scrape_target(
    target: Arc<TargetHandle>,
    collectors: &CollectorRegistry,
    sink: &MetricSink,
) -> TargetOutcome {
    let start = Instant::now();
    let mut client = TargetClient::new(target);
    let mut failed_collectors = Vec::new();

    let status = client.ensure_token(true).await;
    if !status.ok {
        error!(
            "No valid auth token for {}, skip executing metrics collectors",
            client.address()
        );
    } else {
        for collector in collectors.iter() {
            let result = AssertUnwindSafe(collector.collect(&client, sink))
                .catch_unwind()
                .await;
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_benign() => {
                    debug!("{} on {}: {}", collector.name(), client.address(), e);
                }
                Ok(Err(e)) => {
                    warn!("{} on {}: {}", collector.name(), client.address(), e);
                    failed_collectors.push(collector.name());
                }
                Err(_) => {
                    error!("{} panicked on {}", collector.name(), client.address());
                    failed_collectors.push(collector.name());
                }
            }
        }
    }

    // Renewals may have happened mid-scrape, so read the counters again.
    let counter = client.handle().counter().await;
    let outcome = TargetOutcome {
        address: client.address().to_string(),
        resource: client.resource().to_string(),
        ok: status.ok,
        counter,
        duration: start.elapsed(),
        failed_collectors,
    };
    record_health(sink, &outcome);
    outcome
}

/// Emit the health series for one target.
pub fn record_health(sink: &MetricSink, outcome: &TargetOutcome) {
    let labels = [outcome.address.as_str(), outcome.resource.as_str()];
    sink.gauge(&SCRAPE_DURATION, &labels, outcome.duration.as_secs_f64());
    sink.gauge(&SCRAPE_SUCCESS, &labels, if outcome.ok { 1.0 } else { 0.0 });
    sink.gauge(
        &AUTHTOKEN_RENEW_INTERVAL,
        &labels,
        outcome.counter.renew_interval_seconds as f64,
    );
    sink.counter(
        &AUTHTOKEN_RENEW_SUCCESS,
        &labels,
        outcome.counter.renew_success_count as f64,
    );
    sink.counter(
        &AUTHTOKEN_RENEW_FAILURE,
        &labels,
        outcome.counter.renew_failure_count as f64,
    );
}
