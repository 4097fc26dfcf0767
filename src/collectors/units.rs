//! Conversions from the array's human-readable field values to gauge values
//!
//! Capacities come back as strings such as `"99.01TB"` or `"0.00MB"`. Binary
//! and SI suffixes both mean base-2 units here: `KB` = `K` = `KiB` = 1024.

use crate::error::{ExporterError, Result};

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;
const TIB: f64 = GIB * 1024.0;
const PIB: f64 = TIB * 1024.0;

/// Parse a capacity string like `"558.02GB"` into bytes.
pub fn to_bytes(raw: &str) -> Result<u64> {
    let s = raw.trim().to_ascii_uppercase();
    let invalid = || {
        ExporterError::Parse(format!(
            "byte quantity must be a positive number with a unit like M, MB, MiB, G, GiB or GB, got '{}'",
            raw
        ))
    };

    let split = s.find(|c: char| c.is_ascii_alphabetic()).ok_or_else(invalid)?;
    let (number, unit) = s.split_at(split);
    let value: f64 = number.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }

    let multiplier = match unit {
        "P" | "PB" | "PIB" => PIB,
        "T" | "TB" | "TIB" => TIB,
        "G" | "GB" | "GIB" => GIB,
        "M" | "MB" | "MIB" => MIB,
        "K" | "KB" | "KIB" => KIB,
        "B" => 1.0,
        _ => return Err(invalid()),
    };
    Ok((value * multiplier) as u64)
}

/// Parse an on/off style flag into 1.0 or 0.0.
pub fn to_bool(raw: &str) -> Result<f64> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "ON" | "YES" => Ok(1.0),
        "OFF" | "NO" => Ok(0.0),
        _ => Err(ExporterError::Parse(format!(
            "bool quantity must be one of ON, OFF, YES, NO, got '{}'",
            raw
        ))),
    }
}

/// Pool, drive and mdisk status: 0-online, 1-offline, 2-degraded or anything else.
pub fn resource_status(status: &str) -> f64 {
    match status {
        "online" => 0.0,
        "offline" => 1.0,
        _ => 2.0,
    }
}

/// Node canister status: 0-online, 1-offline, 2-service, 3-flushing,
/// 4-pending, 5-adding, 6-deleting. Unknown values are `None`.
pub fn node_status(status: &str) -> Option<f64> {
    let value = match status {
        "online" => 0.0,
        "offline" => 1.0,
        "service" => 2.0,
        "flushing" => 3.0,
        "pending" => 4.0,
        "adding" => 5.0,
        "deleting" => 6.0,
        _ => return None,
    };
    Some(value)
}
