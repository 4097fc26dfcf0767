//! Raw REST transport to a Spectrum Virtualize management endpoint
//!
//! Every request is a `POST`. Authentication exchanges the configured user and
//! password for a session token at `/rest/auth`; all other commands carry that
//! token in `X-Auth-Token`. This layer knows nothing about token caching, it
//! only performs single requests and classifies their outcome.

use crate::config::TargetConfig;
use crate::error::{ExporterError, Result};
use crate::spectrum::types::AuthResponse;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::debug;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// HTTP plumbing for one target, built once and reused across scrapes.
pub struct RestTransport {
    http: Client,
    base_url: String,
    user: String,
    password: SecretString,
}

impl RestTransport {
    pub fn new(target: &TargetConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(!target.verify_cert)
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .build()
            .map_err(|e| {
                ExporterError::Config(format!(
                    "Failed to build HTTP client for {}: {}",
                    target.address, e
                ))
            })?;

        Ok(Self {
            http,
            base_url: target.rest_url(),
            user: target.user.clone(),
            password: target.password.clone(),
        })
    }

    fn url(&self, command: &str) -> String {
        format!("{}/{}", self.base_url, command)
    }

    /// Exchange credentials for a new session token.
    ///
    /// Any non-200 answer is a hard authentication failure.
    pub async fn request_token(&self) -> Result<String> {
        let url = self.url("auth");
        debug!("Requesting auth token from {}", url);

        let response = self
            .http
            .post(&url)
            .header("X-Auth-Username", &self.user)
            .header("X-Auth-Password", self.password.expose_secret())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(ExporterError::Auth(format!(
                "status {} from {}: {}",
                status.as_u16(),
                url,
                body.trim()
            )));
        }

        let parsed: AuthResponse = serde_json::from_str(&body)?;
        if parsed.token.is_empty() {
            return Err(ExporterError::Auth(format!(
                "{} returned no token",
                url
            )));
        }
        Ok(parsed.token)
    }

    /// Run one REST command with an explicit token.
    pub async fn post_command(&self, command: &str, token: &str) -> Result<serde_json::Value> {
        let url = self.url(command);
        debug!("Requesting {}", url);

        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("X-Auth-Token", token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            debug!("{} answered {}: {}", url, status, body.trim());
            return Err(ExporterError::Status {
                command: command.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Err(ExporterError::EmptyResponse(command.to_string()));
        }
        Ok(serde_json::from_str(&body)?)
    }
}
