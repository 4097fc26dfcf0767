//! Collector Plugins
//!
//! Each collector knows one REST command of the Spectrum Virtualize API and how
//! to turn its answer into gauges. Collectors are plain values implementing
//! [`Collector`]; the set that runs on a scrape is an explicit
//! [`CollectorRegistry`] built once at startup from the configuration.
//!
//! # Architecture
//!
//! Collectors follow a consistent pattern:
//! - Receive a [`TargetClient`] whose token is already valid
//! - Issue their command through [`collect_command`] (auto-renew on rejection)
//! - Walk the JSON answer and emit series into the [`MetricSink`]
//! - Return `Err` only when the answer as a whole is unusable
//!
//! # Error Handling
//!
//! A single unparseable field is logged and skipped. A failed call or a body of
//! the wrong shape is returned to the orchestrator, which logs it and moves on
//! to the next collector.
//!
//! # Registries
//!
//! Two registries are exposed over HTTP: [`metrics_collectors`] for capacity
//! metrics (`/metrics`) and [`settings_collectors`] for component status
//! (`/settings`).

use crate::config::Config;
use crate::error::{ExporterError, Result};
use crate::metrics::{MetricDesc, MetricSink};
use crate::spectrum::TargetClient;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

/// A unit that maps one REST command onto metrics.
#[async_trait]
pub trait Collector: Send + Sync {
    /// REST command name, also the key of the enable flag in the configuration
    fn name(&self) -> &'static str;

    fn default_enabled(&self) -> bool {
        true
    }

    /// Metric families produced by this collector
    fn metrics(&self) -> &'static [MetricDesc];

    /// Advertise the metric schema independent of any target.
    fn describe(&self, sink: &MetricSink) -> Result<()> {
        for desc in self.metrics() {
            sink.describe(desc)?;
        }
        Ok(())
    }

    async fn collect(&self, client: &TargetClient, sink: &MetricSink) -> Result<()>;
}

/// Ordered set of enabled collectors.
#[derive(Default)]
pub struct CollectorRegistry {
    collectors: Vec<Box<dyn Collector>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, collector: Box<dyn Collector>) {
        self.collectors.push(collector);
    }

    pub fn with(mut self, collector: impl Collector + 'static) -> Self {
        self.register(Box::new(collector));
        self
    }

    /// Keep the collectors enabled by `config`, in the order given.
    pub fn from_config(config: &Config, available: Vec<Box<dyn Collector>>) -> Self {
        let mut registry = Self::new();
        for collector in available {
            if config.collector_enabled(collector.name(), collector.default_enabled()) {
                info!(" - {}", collector.name());
                registry.register(collector);
            } else {
                debug!("Collector {} disabled", collector.name());
            }
        }
        registry
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Box<dyn Collector>> {
        self.collectors.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    pub fn describe(&self, sink: &MetricSink) -> Result<()> {
        for collector in self.iter() {
            collector.describe(sink)?;
        }
        Ok(())
    }
}

/// Capacity collectors served on `/metrics`
pub fn metrics_collectors() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(system::SystemCollector),
        Box::new(mdiskgrp::MdiskgrpCollector),
        Box::new(volume::VolumeCollector),
    ]
}

/// Component status collectors served on `/settings`
pub fn settings_collectors() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(drive::DriveCollector),
        Box::new(nodecanister::NodeCanisterCollector),
    ]
}

/// Helper to reduce boilerplate in collectors
///
/// Runs `command` with auto-renew and hands the body to `process`.
///
/// # Examples
///
/// ```no_run
/// # use spectrum_exporter::collectors::collect_command;
/// # use spectrum_exporter::metrics::MetricSink;
/// # use spectrum_exporter::spectrum::TargetClient;
/// async fn example(client: &TargetClient, sink: &MetricSink) -> spectrum_exporter::error::Result<()> {
///     collect_command(client, "lsmdiskgrp", |_body| {
///         // Update metrics...
///         Ok(())
///     })
///     .await
/// }
/// ```
pub async fn collect_command<P>(client: &TargetClient, command: &str, process: P) -> Result<()>
where
    P: FnOnce(Value) -> Result<()>,
{
    let body = client.call(command, true).await?;
    process(body)?;
    debug!("Updated {} metrics for {}", command, client.resource());
    Ok(())
}

/// Require a JSON array answer, as returned by the `ls*` listing commands.
pub fn expect_array(command: &str, body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(entries) => Ok(entries),
        other => Err(ExporterError::Parse(format!(
            "invalid json for {}: expected an array, got {}",
            command,
            json_kind(&other)
        ))),
    }
}

/// Require a JSON object answer.
pub fn expect_object(command: &str, body: Value) -> Result<serde_json::Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        other => Err(ExporterError::Parse(format!(
            "invalid json for {}: expected an object, got {}",
            command,
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// String field of an entry, empty when missing or not a string.
pub fn str_field<'a>(entry: &'a Value, key: &str) -> &'a str {
    entry.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Emit a capacity field as bytes, logging and skipping unparseable values.
pub fn emit_bytes(
    sink: &MetricSink,
    desc: &MetricDesc,
    labels: &[&str],
    entry: &Value,
    key: &str,
) {
    let raw = str_field(entry, key);
    match units::to_bytes(raw) {
        Ok(bytes) => sink.gauge(desc, labels, bytes as f64),
        Err(e) => warn!("Converting {} failed: {}", key, e),
    }
}

// Collector modules
pub mod drive;
pub mod mdiskgrp;
pub mod nodecanister;
pub mod system;
pub mod units;
pub mod volume;

pub use drive::DriveCollector;
pub use mdiskgrp::MdiskgrpCollector;
pub use nodecanister::NodeCanisterCollector;
pub use system::SystemCollector;
pub use volume::VolumeCollector;
