//! Volume Metrics Collector
//!
//! # Metrics Produced
//! - `spectrum_volume_capacity` - Virtual capacity of the volume as seen by hosts, in bytes
//!   - Labels: resource, volume_id, volume_name

use super::{collect_command, emit_bytes, expect_array, str_field, Collector};
use crate::error::Result;
use crate::metrics::{MetricDesc, MetricSink};
use crate::spectrum::TargetClient;
use async_trait::async_trait;

const CAPACITY: MetricDesc = MetricDesc::gauge(
    "volume_capacity",
    "The virtual capacity of the volume that is the size of the volume as seen by the host",
    &["resource", "volume_id", "volume_name"],
);

const METRICS: &[MetricDesc] = &[CAPACITY];

pub struct VolumeCollector;

#[async_trait]
impl Collector for VolumeCollector {
    fn name(&self) -> &'static str {
        "lsvdisk"
    }

    fn metrics(&self) -> &'static [MetricDesc] {
        METRICS
    }

    async fn collect(&self, client: &TargetClient, sink: &MetricSink) -> Result<()> {
        collect_command(client, self.name(), |body| {
            for volume in expect_array(self.name(), body)? {
                let labels = [
                    client.resource(),
                    str_field(&volume, "id"),
                    str_field(&volume, "name"),
                ];
                emit_bytes(sink, &CAPACITY, &labels, &volume, "capacity");
            }
            Ok(())
        })
        .await
    }
}
