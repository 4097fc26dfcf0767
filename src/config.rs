use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::error::ExporterError;

/// Label names the exporter attaches itself; extra labels may not reuse them.
pub const RESERVED_LABELS: &[&str] = &["target", "resource"];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub targets: Vec<TargetConfig>,
    #[serde(default)]
    pub token: TokenConfig,
    /// Per-collector enable flags, keyed by collector name (e.g. "lssystem")
    #[serde(default)]
    pub collectors: HashMap<String, bool>,
    #[serde(default)]
    pub extra_labels: Vec<ExtraLabel>,
}

/// One managed storage array.
#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    pub address: String,
    pub user: String,
    pub password: SecretString,
    #[serde(default = "default_true")]
    pub verify_cert: bool,
    #[serde(default = "default_true")]
    pub use_tls: bool,
    #[serde(default = "default_rest_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Append the exporter's own process metrics to every scrape
    #[serde(default = "default_true")]
    pub exporter_metrics: bool,
}

/// Session token reuse and renewal policy.
///
/// A session on the array lasts at most two active hours or thirty idle
/// minutes, so the verified window stays below two hours.
#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    #[serde(default = "default_fresh_window")]
    pub fresh_window_seconds: u64,
    #[serde(default = "default_verified_window")]
    pub verified_window_seconds: u64,
    #[serde(default = "default_verify_retry_delay")]
    pub verify_retry_delay_ms: u64,
    #[serde(default = "default_max_renew_attempts")]
    pub max_renew_attempts: u32,
    #[serde(default = "default_max_verify_probes")]
    pub max_verify_probes: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ExtraLabel {
    pub name: String,
    pub value: String,
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9119
}

fn default_rest_port() -> u16 {
    7443
}

fn default_true() -> bool {
    true
}

fn default_fresh_window() -> u64 {
    28
}

fn default_verified_window() -> u64 {
    118 * 60
}

fn default_verify_retry_delay() -> u64 {
    2000
}

fn default_max_renew_attempts() -> u32 {
    3
}

fn default_max_verify_probes() -> u32 {
    2
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
            exporter_metrics: true,
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            fresh_window_seconds: default_fresh_window(),
            verified_window_seconds: default_verified_window(),
            verify_retry_delay_ms: default_verify_retry_delay(),
            max_renew_attempts: default_max_renew_attempts(),
            max_verify_probes: default_max_verify_probes(),
        }
    }
}

impl TokenConfig {
    pub fn fresh_window(&self) -> Duration {
        Duration::from_secs(self.fresh_window_seconds)
    }

    pub fn verified_window(&self) -> Duration {
        Duration::from_secs(self.verified_window_seconds)
    }

    pub fn verify_retry_delay(&self) -> Duration {
        Duration::from_millis(self.verify_retry_delay_ms)
    }
}

impl TargetConfig {
    /// Base URL of the REST API, without trailing slash
    pub fn rest_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}/rest", scheme, self.address, self.port)
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SPECTRUM_EXPORTER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> std::result::Result<(), ExporterError> {
        if self.targets.is_empty() {
            return Err(ExporterError::Config(
                "At least one target must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.address.trim().is_empty() {
                return Err(ExporterError::Config(
                    "Target address must not be empty".to_string(),
                ));
            }
            if !seen.insert(target.address.as_str()) {
                return Err(ExporterError::Config(format!(
                    "Duplicate target address: {}",
                    target.address
                )));
            }
        }

        if self.token.max_renew_attempts == 0 || self.token.max_verify_probes == 0 {
            return Err(ExporterError::Config(
                "Token renewal attempts and verify probes must be at least 1".to_string(),
            ));
        }

        for label in &self.extra_labels {
            if !is_valid_label_name(&label.name) {
                return Err(ExporterError::Config(format!(
                    "Invalid extra label name: '{}'",
                    label.name
                )));
            }
            if RESERVED_LABELS.contains(&label.name.as_str()) {
                return Err(ExporterError::Config(format!(
                    "Extra label '{}' collides with a built-in label",
                    label.name
                )));
            }
        }

        Ok(())
    }

    /// Whether a collector is enabled, falling back to its own default.
    pub fn collector_enabled(&self, name: &str, default: bool) -> bool {
        self.collectors.get(name).copied().unwrap_or(default)
    }
}

fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    !name.starts_with("__") && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
