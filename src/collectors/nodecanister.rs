//! Node Canister Status Collector
//!
//! # Metrics Produced
//! - `spectrum_nodecanister_status` - Status of nodes that are part of the system
//!   (0=online, 1=offline, 2=service, 3=flushing, 4=pending, 5=adding, 6=deleting)
//!   - Labels: resource, node_name

use super::{collect_command, expect_array, str_field, units, Collector};
use crate::error::Result;
use crate::metrics::{MetricDesc, MetricSink};
use crate::spectrum::TargetClient;
use async_trait::async_trait;
use tracing::warn;

const STATUS: MetricDesc = MetricDesc::gauge(
    "nodecanister_status",
    "Status of nodes that are part of the system. 0-online; 1-offline; 2-service; 3-flushing; 4-pending; 5-adding; 6-deleting",
    &["resource", "node_name"],
);

const METRICS: &[MetricDesc] = &[STATUS];

pub struct NodeCanisterCollector;

#[async_trait]
impl Collector for NodeCanisterCollector {
    fn name(&self) -> &'static str {
        "lsnodecanister"
    }

    fn metrics(&self) -> &'static [MetricDesc] {
        METRICS
    }

    async fn collect(&self, client: &TargetClient, sink: &MetricSink) -> Result<()> {
        collect_command(client, self.name(), |body| {
            for node in expect_array(self.name(), body)? {
                let name = str_field(&node, "name");
                let status = str_field(&node, "status");
                match units::node_status(status) {
                    Some(value) => sink.gauge(&STATUS, &[client.resource(), name], value),
                    None => warn!("Unknown status '{}' for node {}", status, name),
                }
            }
            Ok(())
        })
        .await
    }
}
