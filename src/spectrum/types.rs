//! Spectrum Virtualize REST Type Definitions
//!
//! Only the response shapes the exporter's core depends on are typed here.
//! Collector plugins walk the raw [`serde_json::Value`] returned by
//! [`TargetClient::call`](crate::spectrum::TargetClient::call) themselves.
//!
//! # API Endpoints Covered
//!
//! - `POST /rest/auth` → [`AuthResponse`]
//! - `POST /rest/lssystem` → [`SystemSummary`] (liveness probe)

use serde::Deserialize;

/// Body returned by `/rest/auth`
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: String,
}

/// Subset of `lssystem` used to resolve the system's display name
#[derive(Debug, Deserialize, Default)]
pub struct SystemSummary {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub code_level: Option<String>,
}
