//! Drive Status Collector
//!
//! Lists drives with `lsdrive`, then reads each drive's detail view
//! (`lsdrive/<id>`) to compare firmware levels across the system.
//!
//! # Metrics Produced
//! - `spectrum_drive_status` - Drive status (0=online, 1=offline, 2=degraded)
//!   - Labels: resource, drive_id
//! - `spectrum_drive_firmware_level` - Firmware consistency with the first drive
//!   listed (0=consistent, 1=inconsistent)
//!   - Labels: resource, drive_id, firmware_level

use super::{expect_array, expect_object, str_field, units, Collector};
use crate::error::Result;
use crate::metrics::{MetricDesc, MetricSink};
use crate::spectrum::TargetClient;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

const STATUS: MetricDesc = MetricDesc::gauge(
    "drive_status",
    "Indicates the summary status of the drive. 0-online; 1-offline; 2-degraded",
    &["resource", "drive_id"],
);
const FIRMWARE_LEVEL: MetricDesc = MetricDesc::gauge(
    "drive_firmware_level",
    "Indicates the firmware level consistency of disks. 0-consistent; 1-inconsistent",
    &["resource", "drive_id", "firmware_level"],
);

const METRICS: &[MetricDesc] = &[STATUS, FIRMWARE_LEVEL];

pub struct DriveCollector;

#[async_trait]
impl Collector for DriveCollector {
    fn name(&self) -> &'static str {
        "lsdrive"
    }

    fn metrics(&self) -> &'static [MetricDesc] {
        METRICS
    }

    async fn collect(&self, client: &TargetClient, sink: &MetricSink) -> Result<()> {
        let drives = expect_array(self.name(), client.call(self.name(), true).await?)?;
        let resource = client.resource();

        let mut ids = Vec::with_capacity(drives.len());
        for drive in &drives {
            let id = str_field(drive, "id");
            sink.gauge(
                &STATUS,
                &[resource, id],
                units::resource_status(str_field(drive, "status")),
            );
            ids.push(id.to_string());
        }

        let mut levels = FirmwareLevels::default();
        for id in ids {
            let command = format!("{}/{}", self.name(), id);
            let body = client.call(&command, true).await?;
            let detail = Value::Object(expect_object(&command, body)?);
            let level = firmware_level(&detail);
            let inconsistent = levels.observe(&level);
            sink.gauge(
                &FIRMWARE_LEVEL,
                &[resource, id.as_str(), level.as_str()],
                inconsistent,
            );
        }

        debug!("Updated drive metrics for {}", resource);
        Ok(())
    }
}

fn firmware_level(detail: &Value) -> String {
    let level = str_field(detail, "firmware_level").trim();
    if level.is_empty() {
        "unknown".to_string()
    } else {
        level.to_string()
    }
}

/// Tracks the first firmware level seen as the reference.
#[derive(Default)]
struct FirmwareLevels {
    base: Option<String>,
}

impl FirmwareLevels {
    fn observe(&mut self, level: &str) -> f64 {
        match &self.base {
            None => {
                self.base = Some(level.to_string());
                0.0
            }
            Some(base) if base == level => 0.0,
            Some(_) => 1.0,
        }
    }
}
