//! System Capacity Metrics Collector
//!
//! Collects cluster-wide capacity figures from `lssystem`.
//!
//! # Metrics Produced
//! - `spectrum_system_total_mdisk_capacity` - mdiskgrp capacity plus unmanaged MDisks
//! - `spectrum_system_total_free_space` - Sum of mdiskgrp free capacity
//! - `spectrum_system_total_used_capacity` - Sum of mdiskgrp used capacity
//! - `spectrum_system_total_vdisk_capacity` - Virtual capacity of all volumes
//! - `spectrum_system_physical_capacity` - Physical capacity managed by the system
//! - `spectrum_system_physical_free_capacity` - Free physical capacity
//!   - Labels: resource
//! - `spectrum_system_tier_capacity` / `spectrum_system_tier_free_capacity`
//!   - Labels: resource, tier
//! - `spectrum_system_physical_capacity_used_percent` - Physical capacity utilization
//!   - Labels: resource
//!
//! All capacities are in bytes.

use super::{collect_command, emit_bytes, expect_object, str_field, units, Collector};
use crate::error::Result;
use crate::metrics::{MetricDesc, MetricSink};
use crate::spectrum::TargetClient;
use async_trait::async_trait;
use serde_json::Value;

const LABELS: &[&str] = &["resource"];
const TIER_LABELS: &[&str] = &["resource", "tier"];

const TOTAL_MDISK_CAPACITY: MetricDesc = MetricDesc::gauge(
    "system_total_mdisk_capacity",
    "The sum of mdiskgrp capacity plus the capacity of all unmanaged MDisks",
    LABELS,
);
const TOTAL_FREE_SPACE: MetricDesc = MetricDesc::gauge(
    "system_total_free_space",
    "The sum of mdiskgrp free_capacity",
    LABELS,
);
const TOTAL_USED_CAPACITY: MetricDesc = MetricDesc::gauge(
    "system_total_used_capacity",
    "The sum of mdiskgrp used_capacity",
    LABELS,
);
const TOTAL_VDISK_CAPACITY: MetricDesc = MetricDesc::gauge(
    "system_total_vdisk_capacity",
    "The total virtual capacity of volumes in the cluster",
    LABELS,
);
const PHYSICAL_CAPACITY: MetricDesc = MetricDesc::gauge(
    "system_physical_capacity",
    "The total physical capacity of all storage managed by the system",
    LABELS,
);
const PHYSICAL_FREE_CAPACITY: MetricDesc = MetricDesc::gauge(
    "system_physical_free_capacity",
    "The total free physical capacity of all storage managed by the system",
    LABELS,
);
const TIER_CAPACITY: MetricDesc = MetricDesc::gauge(
    "system_tier_capacity",
    "The total MDisk storage in the tier",
    TIER_LABELS,
);
const TIER_FREE_CAPACITY: MetricDesc = MetricDesc::gauge(
    "system_tier_free_capacity",
    "The amount of MDisk storage in the tier that is unused",
    TIER_LABELS,
);
const PHYSICAL_CAPACITY_USED_PERCENT: MetricDesc = MetricDesc::gauge(
    "system_physical_capacity_used_percent",
    "The physical capacity utilization",
    LABELS,
);

const METRICS: &[MetricDesc] = &[
    TOTAL_MDISK_CAPACITY,
    TOTAL_FREE_SPACE,
    TOTAL_USED_CAPACITY,
    TOTAL_VDISK_CAPACITY,
    PHYSICAL_CAPACITY,
    PHYSICAL_FREE_CAPACITY,
    TIER_CAPACITY,
    TIER_FREE_CAPACITY,
    PHYSICAL_CAPACITY_USED_PERCENT,
];

const CAPACITY_FIELDS: &[(&str, MetricDesc)] = &[
    ("total_mdisk_capacity", TOTAL_MDISK_CAPACITY),
    ("total_free_space", TOTAL_FREE_SPACE),
    ("total_used_capacity", TOTAL_USED_CAPACITY),
    ("total_vdisk_capacity", TOTAL_VDISK_CAPACITY),
    ("physical_capacity", PHYSICAL_CAPACITY),
    ("physical_free_capacity", PHYSICAL_FREE_CAPACITY),
];

pub struct SystemCollector;

#[async_trait]
impl Collector for SystemCollector {
    fn name(&self) -> &'static str {
        "lssystem"
    }

    fn metrics(&self) -> &'static [MetricDesc] {
        METRICS
    }

    async fn collect(&self, client: &TargetClient, sink: &MetricSink) -> Result<()> {
        collect_command(client, self.name(), |body| {
            let system = Value::Object(expect_object(self.name(), body)?);
            record_system(client.resource(), &system, sink);
            Ok(())
        })
        .await
    }
}

fn record_system(resource: &str, system: &Value, sink: &MetricSink) {
    let labels = [resource];
    for (field, desc) in CAPACITY_FIELDS {
        emit_bytes(sink, desc, &labels, system, field);
    }

    if let Some(tiers) = system.get("tiers").and_then(Value::as_array) {
        for tier in tiers {
            let tier_labels = [resource, str_field(tier, "tier")];
            emit_bytes(sink, &TIER_CAPACITY, &tier_labels, tier, "tier_capacity");
            emit_bytes(sink, &TIER_FREE_CAPACITY, &tier_labels, tier, "tier_free_capacity");
        }
    }

    let physical = units::to_bytes(str_field(system, "physical_capacity"));
    let free = units::to_bytes(str_field(system, "physical_free_capacity"));
    if let (Ok(physical), Ok(free)) = (physical, free) {
        if physical > 0 {
            let used = physical.saturating_sub(free) as f64 / physical as f64 * 100.0;
            sink.gauge(&PHYSICAL_CAPACITY_USED_PERCENT, &labels, used);
        }
    }
}
