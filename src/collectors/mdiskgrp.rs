//! Storage Pool (MDisk Group) Metrics Collector
//!
//! Collects status and capacity of every storage pool from `lsmdiskgrp`.
//!
//! # Metrics Produced
//! - `spectrum_mdiskgrp_status` - Pool status (0=online, 1=offline, 2=other)
//! - `spectrum_mdiskgrp_capacity` - Total pool capacity in bytes
//! - `spectrum_mdiskgrp_free_capacity` - Free pool capacity in bytes
//! - `spectrum_mdiskgrp_used_capacity` - Used pool capacity in bytes
//! - `spectrum_mdiskgrp_real_capacity` - Capacity assigned to volume copies in bytes
//! - `spectrum_mdiskgrp_overallocation` - Virtual capacity as a percentage of capacity
//! - `spectrum_mdiskgrp_compression_active` - Whether compressed volume copies exist (1/0)
//!   - Labels: resource, pool_name

use super::{collect_command, emit_bytes, expect_array, str_field, units, Collector};
use crate::error::Result;
use crate::metrics::{MetricDesc, MetricSink};
use crate::spectrum::TargetClient;
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

const LABELS: &[&str] = &["resource", "pool_name"];

const STATUS: MetricDesc = MetricDesc::gauge(
    "mdiskgrp_status",
    "Status of the storage pool. 0-online; 1-offline; 2-degraded or other",
    LABELS,
);
const CAPACITY: MetricDesc = MetricDesc::gauge(
    "mdiskgrp_capacity",
    "The total amount of MDisk storage that is assigned to the storage pool",
    LABELS,
);
const FREE_CAPACITY: MetricDesc = MetricDesc::gauge(
    "mdiskgrp_free_capacity",
    "The amount of MDisk storage that is assigned to the storage pool that is unused",
    LABELS,
);
const USED_CAPACITY: MetricDesc = MetricDesc::gauge(
    "mdiskgrp_used_capacity",
    "The amount of data that is stored on MDisks in the storage pool",
    LABELS,
);

const REAL_CAPACITY: MetricDesc = MetricDesc::gauge(
    "mdiskgrp_real_capacity",
    "The total MDisk storage capacity assigned to volume copies",
    LABELS,
);
const OVERALLOCATION: MetricDesc = MetricDesc::gauge(
    "mdiskgrp_overallocation",
    "The ratio of the virtual_capacity value to the capacity",
    LABELS,
);
const COMPRESSION_ACTIVE: MetricDesc = MetricDesc::gauge(
    "mdiskgrp_compression_active",
    "Indicates whether any compressed volume copies are in the storage pool",
    LABELS,
);

const METRICS: &[MetricDesc] = &[
    STATUS,
    CAPACITY,
    FREE_CAPACITY,
    USED_CAPACITY,
    REAL_CAPACITY,
    OVERALLOCATION,
    COMPRESSION_ACTIVE,
];

pub struct MdiskgrpCollector;

#[async_trait]
impl Collector for MdiskgrpCollector {
    fn name(&self) -> &'static str {
        "lsmdiskgrp"
    }

    fn metrics(&self) -> &'static [MetricDesc] {
        METRICS
    }

    async fn collect(&self, client: &TargetClient, sink: &MetricSink) -> Result<()> {
        collect_command(client, self.name(), |body| {
            for pool in expect_array(self.name(), body)? {
                record_pool(client.resource(), &pool, sink);
            }
            Ok(())
        })
        .await
    }
}

fn record_pool(resource: &str, pool: &Value, sink: &MetricSink) {
    let labels = [resource, str_field(pool, "name")];
    sink.gauge(
        &STATUS,
        &labels,
        units::resource_status(str_field(pool, "status")),
    );
    emit_bytes(sink, &CAPACITY, &labels, pool, "capacity");
    emit_bytes(sink, &FREE_CAPACITY, &labels, pool, "free_capacity");
    emit_bytes(sink, &USED_CAPACITY, &labels, pool, "used_capacity");
    emit_bytes(sink, &REAL_CAPACITY, &labels, pool, "real_capacity");

    match str_field(pool, "overallocation").parse::<f64>() {
        Ok(ratio) => sink.gauge(&OVERALLOCATION, &labels, ratio),
        Err(e) => warn!("Converting overallocation failed: {}", e),
    }
    match units::to_bool(str_field(pool, "compression_active")) {
        Ok(active) => sink.gauge(&COMPRESSION_ACTIVE, &labels, active),
        Err(e) => warn!("Converting compression_active failed: {}", e),
    }
}
