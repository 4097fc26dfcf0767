//! Per-scrape client for one Spectrum Virtualize target
//!
//! A [`TargetClient`] is built fresh for every scrape and borrows the target's
//! long-lived [`TargetHandle`], which owns the cached session token. Collector
//! plugins only ever see this client: they issue commands through
//! [`TargetClient::call`] and never manage tokens themselves.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use spectrum_exporter::config::{TargetConfig, TokenConfig};
//! use spectrum_exporter::spectrum::{TargetClient, TargetHandle};
//! use secrecy::SecretString;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let target = TargetConfig {
//!     address: "10.0.0.5".to_string(),
//!     user: "monitor".to_string(),
//!     password: SecretString::from("secret"),
//!     verify_cert: false,
//!     use_tls: true,
//!     port: 7443,
//! };
//! let handle = Arc::new(TargetHandle::new(target, TokenConfig::default())?);
//!
//! let mut client = TargetClient::new(handle);
//! if client.ensure_token(true).await.ok {
//!     let pools = client.call("lsmdiskgrp", true).await?;
//!     println!("{} reports {}", client.resource(), pools);
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{ExporterError, Result};
use crate::spectrum::credentials::TargetHandle;
use crate::spectrum::token::TokenStatus;
use std::sync::Arc;
use tracing::info;

pub struct TargetClient {
    target: Arc<TargetHandle>,
    display_name: String,
}

impl TargetClient {
    pub fn new(target: Arc<TargetHandle>) -> Self {
        Self {
            target,
            display_name: String::new(),
        }
    }

    pub fn address(&self) -> &str {
        self.target.address()
    }

    pub fn handle(&self) -> &Arc<TargetHandle> {
        &self.target
    }

    /// System name reported by the array, empty until first resolved
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Value of the `resource` label: the system name, or the address while unknown
    pub fn resource(&self) -> &str {
        if self.display_name.is_empty() {
            self.target.address()
        } else {
            &self.display_name
        }
    }

    /// Obtain or validate the session token and pick up the resolved system name.
    pub async fn ensure_token(&mut self, need_verify: bool) -> TokenStatus {
        let status = self.target.ensure_token(need_verify).await;
        if status.ok {
            self.display_name = self.target.display_name().await;
        }
        status
    }

    /// Run a REST command with the cached token.
    ///
    /// With `auto_renew`, a 401/403 answer triggers one token renewal and one
    /// retry of the command. A second rejection is returned as is.
    pub async fn call(&self, command: &str, auto_renew: bool) -> Result<serde_json::Value> {
        let token = self.target.current_token().await;
        let transport = self.target.transport();

        match transport.post_command(command, &token).await {
            Err(e) if auto_renew && e.is_token_rejection() => {
                info!(
                    "Token rejected by {} on '{}', renewing and retrying",
                    self.address(),
                    command
                );
                let status = self.target.renew_rejected(&token).await;
                if !status.ok {
                    return Err(ExporterError::TokenRenewal(format!(
                        "failed to auto renew auth token for {}",
                        self.address()
                    )));
                }
                let token = self.target.current_token().await;
                transport.post_command(command, &token).await
            }
            result => result,
        }
    }
}
