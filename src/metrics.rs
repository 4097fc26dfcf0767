//! Prometheus Metric Sink
//!
//! Every scrape request gets its own [`MetricSink`], backed by a fresh
//! `prometheus::Registry`. The orchestrator and the collector plugins emit into
//! it concurrently, the HTTP handler renders it and drops it. Values therefore
//! never leak from one scrape into the next; the only state that survives
//! between scrapes lives in the per-target session.
//!
//! # Metric Descriptors
//!
//! Plugins declare their series as `const` [`MetricDesc`] values. The sink
//! creates the matching `GaugeVec`/`CounterVec` the first time a descriptor is
//! described or emitted, appending the configured extra labels to every series.
//!
//! # Health Series
//!
//! Emitted by the orchestrator once per target and scrape, labelled by
//! `target` (address) and `resource` (system name):
//!
//! - `spectrum_collector_scrape_duration_seconds`
//! - `spectrum_collector_scrape_success`
//! - `spectrum_collector_authtoken_renew_interval_seconds`
//! - `spectrum_collector_authtoken_renew_success_total`
//! - `spectrum_collector_authtoken_renew_failure_total`
//!
//! All metrics use the `spectrum_` namespace prefix.

use crate::config::ExtraLabel;
use crate::error::Result;
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::warn;

pub const NAMESPACE: &str = "spectrum";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

/// Static description of one metric family.
#[derive(Debug, Clone, Copy)]
pub struct MetricDesc {
    /// Name without the `spectrum_` prefix
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
    pub kind: MetricKind,
}

impl MetricDesc {
    pub const fn gauge(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            labels,
            kind: MetricKind::Gauge,
        }
    }

    pub const fn counter(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            labels,
            kind: MetricKind::Counter,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}_{}", NAMESPACE, self.name)
    }
}

const HEALTH_LABELS: &[&str] = &["target", "resource"];

pub const SCRAPE_DURATION: MetricDesc = MetricDesc::gauge(
    "collector_scrape_duration_seconds",
    "Duration of a collector scraping for one host",
    HEALTH_LABELS,
);

pub const SCRAPE_SUCCESS: MetricDesc = MetricDesc::gauge(
    "collector_scrape_success",
    "Whether a valid auth token was available for the scrape (1=success, 0=failure)",
    HEALTH_LABELS,
);

pub const AUTHTOKEN_RENEW_INTERVAL: MetricDesc = MetricDesc::gauge(
    "collector_authtoken_renew_interval_seconds",
    "Interval of renewing auth token",
    HEALTH_LABELS,
);

pub const AUTHTOKEN_RENEW_SUCCESS: MetricDesc = MetricDesc::counter(
    "collector_authtoken_renew_success_total",
    "Cumulative count of successful auth token renewals",
    HEALTH_LABELS,
);

pub const AUTHTOKEN_RENEW_FAILURE: MetricDesc = MetricDesc::counter(
    "collector_authtoken_renew_failure_total",
    "Cumulative count of failed auth token renewals",
    HEALTH_LABELS,
);

pub const HEALTH_METRICS: &[MetricDesc] = &[
    SCRAPE_DURATION,
    SCRAPE_SUCCESS,
    AUTHTOKEN_RENEW_INTERVAL,
    AUTHTOKEN_RENEW_SUCCESS,
    AUTHTOKEN_RENEW_FAILURE,
];

#[derive(Clone)]
enum Family {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

/// Write side of one scrape's metrics
#[derive(Clone)]
pub struct MetricSink {
    registry: Arc<Registry>,
    families: Arc<Mutex<HashMap<&'static str, Family>>>,
    /// Series set so far, keyed by family name and full label values
    emitted: Arc<Mutex<HashSet<(&'static str, Vec<String>)>>>,
    extra_names: Arc<Vec<String>>,
    extra_values: Arc<Vec<String>>,
}

impl MetricSink {
    pub fn new(extra_labels: &[ExtraLabel]) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            families: Arc::new(Mutex::new(HashMap::new())),
            emitted: Arc::new(Mutex::new(HashSet::new())),
            extra_names: Arc::new(extra_labels.iter().map(|l| l.name.clone()).collect()),
            extra_values: Arc::new(extra_labels.iter().map(|l| l.value.clone()).collect()),
        }
    }

    /// Register a metric family so it is advertised even before a value is set.
    pub fn describe(&self, desc: &MetricDesc) -> Result<()> {
        self.family(desc).map(|_| ())
    }

    pub fn gauge(&self, desc: &MetricDesc, labels: &[&str], value: f64) {
        self.emit(desc, labels, value);
    }

    /// Set a counter to an absolute cumulative value.
    pub fn counter(&self, desc: &MetricDesc, labels: &[&str], value: f64) {
        self.emit(desc, labels, value);
    }

    fn family(&self, desc: &MetricDesc) -> Result<Family> {
        let mut families = self.families.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(family) = families.get(desc.name) {
            return Ok(family.clone());
        }

        let opts = Opts::new(desc.name, desc.help).namespace(NAMESPACE);
        let mut label_names: Vec<&str> = desc.labels.to_vec();
        label_names.extend(self.extra_names.iter().map(String::as_str));

        let family = match desc.kind {
            MetricKind::Gauge => {
                let vec = GaugeVec::new(opts, label_names.as_slice())?;
                self.registry.register(Box::new(vec.clone()))?;
                Family::Gauge(vec)
            }
            MetricKind::Counter => {
                let vec = CounterVec::new(opts, label_names.as_slice())?;
                self.registry.register(Box::new(vec.clone()))?;
                Family::Counter(vec)
            }
        };
        families.insert(desc.name, family.clone());
        Ok(family)
    }

    fn emit(&self, desc: &MetricDesc, labels: &[&str], value: f64) {
        let family = match self.family(desc) {
            Ok(family) => family,
            Err(e) => {
                warn!("Failed to register metric {}: {}", desc.full_name(), e);
                return;
            }
        };

        let mut values: Vec<&str> = labels.to_vec();
        values.extend(self.extra_values.iter().map(String::as_str));

        let outcome = match family {
            Family::Gauge(vec) => vec
                .get_metric_with_label_values(values.as_slice())
                .map(|g| g.set(value)),
            Family::Counter(vec) => {
                if !value.is_finite() || value < 0.0 {
                    warn!(
                        "Dropping invalid counter value {} for {}",
                        value,
                        desc.full_name()
                    );
                    return;
                }
                vec.get_metric_with_label_values(values.as_slice())
                    .map(|c| c.inc_by(value))
            }
        };

        match outcome {
            Ok(()) => {
                let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                self.emitted
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert((desc.name, key));
            }
            Err(e) => warn!("Failed to set metric {}: {}", desc.full_name(), e),
        }
    }

    /// Current value of one series, if it has been emitted.
    ///
    /// Never creates the series, so reading does not change the rendered output.
    pub fn value(&self, desc: &MetricDesc, labels: &[&str]) -> Option<f64> {
        let mut values: Vec<&str> = labels.to_vec();
        values.extend(self.extra_values.iter().map(String::as_str));

        let key: (&'static str, Vec<String>) =
            (desc.name, values.iter().map(|v| v.to_string()).collect());
        if !self
            .emitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&key)
        {
            return None;
        }

        let family = {
            let families = self.families.lock().unwrap_or_else(|e| e.into_inner());
            families.get(desc.name)?.clone()
        };

        match family {
            Family::Gauge(vec) => vec
                .get_metric_with_label_values(values.as_slice())
                .ok()
                .map(|g| g.get()),
            Family::Counter(vec) => vec
                .get_metric_with_label_values(values.as_slice())
                .ok()
                .map(|c| c.get()),
        }
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        self.render_with(None)
    }

    /// Render this scrape's metrics followed by those of a long-lived registry.
    pub fn render_with(&self, exporter: Option<&Registry>) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut metric_families = self.registry.gather();
        if let Some(exporter) = exporter {
            metric_families.extend(exporter.gather());
        }
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Registry with the exporter's own process metrics (CPU, memory, open fds).
///
/// Built once at startup; only Linux exposes process statistics.
pub fn exporter_registry() -> Result<Registry> {
    let registry = Registry::new();
    #[cfg(target_os = "linux")]
    registry.register(Box::new(
        prometheus::process_collector::ProcessCollector::for_self(),
    ))?;
    Ok(registry)
}

impl Default for MetricSink {
    fn default() -> Self {
        Self::new(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POOL_STATUS: MetricDesc =
        MetricDesc::gauge("mdiskgrp_status", "Pool status", &["resource", "pool_name"]);

    #[test]
    fn gauge_renders_with_namespace_and_labels() {
        let sink = MetricSink::default();
        sink.gauge(&POOL_STATUS, &["SARA", "Pool0"], 2.0);

        let rendered = sink.render().unwrap();
        assert!(rendered.contains("# TYPE spectrum_mdiskgrp_status gauge"));
        assert!(rendered.contains("pool_name=\"Pool0\""));
        assert!(rendered.contains("resource=\"SARA\""));
        assert_eq!(sink.value(&POOL_STATUS, &["SARA", "Pool0"]), Some(2.0));
    }

    #[test]
    fn extra_labels_are_appended() {
        let sink = MetricSink::new(&[ExtraLabel {
            name: "datacenter".to_string(),
            value: "wdc04".to_string(),
        }]);
        sink.gauge(&POOL_STATUS, &["SARA", "Pool0"], 0.0);

        let rendered = sink.render().unwrap();
        assert!(rendered.contains("datacenter=\"wdc04\""));
        assert_eq!(sink.value(&POOL_STATUS, &["SARA", "Pool0"]), Some(0.0));
    }

    #[test]
    fn label_mismatch_is_dropped_not_panicking() {
        let sink = MetricSink::default();
        sink.gauge(&POOL_STATUS, &["only-one"], 1.0);
        assert_eq!(sink.value(&POOL_STATUS, &["only-one"]), None);
        assert!(sink.render().is_ok());
    }

    #[test]
    fn counter_holds_absolute_value() {
        let sink = MetricSink::default();
        sink.counter(&AUTHTOKEN_RENEW_SUCCESS, &["10.0.0.5", "SARA"], 7.0);
        sink.counter(&AUTHTOKEN_RENEW_FAILURE, &["10.0.0.5", "SARA"], -1.0);

        assert_eq!(sink.value(&AUTHTOKEN_RENEW_SUCCESS, &["10.0.0.5", "SARA"]), Some(7.0));
        assert_eq!(sink.value(&AUTHTOKEN_RENEW_FAILURE, &["10.0.0.5", "SARA"]), None);
    }

    #[test]
    fn reading_unset_series_leaves_output_unchanged() {
        let sink = MetricSink::default();
        sink.gauge(&POOL_STATUS, &["SARA", "Pool0"], 1.0);
        let before = sink.render().unwrap();

        assert_eq!(sink.value(&POOL_STATUS, &["SARA", "Pool9"]), None);

        let after = sink.render().unwrap();
        assert_eq!(before, after);
        assert!(!after.contains("Pool9"));
    }

    #[test]
    fn exporter_registry_is_appended() {
        let exporter = Registry::new();
        let up = prometheus::Gauge::new("exporter_test_up", "test").unwrap();
        exporter.register(Box::new(up.clone())).unwrap();
        up.set(1.0);

        let sink = MetricSink::default();
        sink.gauge(&POOL_STATUS, &["SARA", "Pool0"], 0.0);

        let rendered = sink.render_with(Some(&exporter)).unwrap();
        assert!(rendered.contains("spectrum_mdiskgrp_status"));
        assert!(rendered.contains("exporter_test_up 1"));
        assert!(!sink.render().unwrap().contains("exporter_test_up"));
    }

    #[test]
    fn describe_is_idempotent() {
        let sink = MetricSink::default();
        for desc in HEALTH_METRICS {
            sink.describe(desc).unwrap();
            sink.describe(desc).unwrap();
        }
        assert!(sink.render().is_ok());
    }
}
