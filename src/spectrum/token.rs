//! Session token lifecycle
//!
//! Decides, per target, whether the cached token can be reused, proves it live
//! when a caller needs that, and renews it otherwise. The whole decision runs
//! under the target's session lock, so concurrent collectors that all find an
//! old token queue up behind a single renewal and then reuse its result
//! through the freshness window instead of authenticating again.
//!
//! # Remote calls per invocation
//!
//! - cached token reused: none
//! - acquisition fails: one `/rest/auth`, no retry (bad credentials must not be hammered)
//! - verification keeps failing: `max_renew_attempts` acquisitions, each followed by
//!   up to `max_verify_probes` `lssystem` probes

use crate::error::Result;
use crate::spectrum::credentials::{HealthCounter, Session, TargetHandle};
use crate::spectrum::types::SystemSummary;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Read-only command used to prove a token live and learn the system name.
pub const PROBE_COMMAND: &str = "lssystem";

/// Outcome of a token check, with the counters as they were when the lock was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenStatus {
    pub counter: HealthCounter,
    pub ok: bool,
}

impl TargetHandle {
    /// Make sure the target has a usable session token.
    ///
    /// With `need_verify` the token must have been proven live recently; without it
    /// an existing fresh token is enough.
    pub async fn ensure_token(&self, need_verify: bool) -> TokenStatus {
        self.renew_token(need_verify, None).await
    }

    /// Renew after the array rejected `rejected`. If another task already
    /// replaced that token, the replacement is reused.
    pub(crate) async fn renew_rejected(&self, rejected: &str) -> TokenStatus {
        self.renew_token(false, Some(rejected)).await
    }

    async fn renew_token(&self, need_verify: bool, rejected: Option<&str>) -> TokenStatus {
        let mut session = self.lock_session().await;
        let policy = self.policy();
        let now = Instant::now();

        let superseded = rejected.is_none_or(|r| r != session.store.token());
        if superseded && session.store.acquired_within(policy.fresh_window(), now) {
            debug!(
                "Reusing token for {} acquired within the last {:?}",
                self.address(),
                policy.fresh_window()
            );
            return finish(&session, true);
        }

        if need_verify && session.store.verified_within(policy.verified_window(), now) {
            debug!(
                "Reusing token for {} verified within the last {:?}",
                self.address(),
                policy.verified_window()
            );
            return finish(&session, true);
        }

        for attempt in 1..=policy.max_renew_attempts {
            debug!(
                "Requesting auth token for {} (attempt {})",
                self.address(),
                attempt
            );
            let token = match self.transport().request_token().await {
                Ok(token) => token,
                Err(e) => {
                    error!("Failed to request auth token for {}: {}", self.address(), e);
                    session.counter.renew_failure_count += 1;
                    return finish(&session, false);
                }
            };

            if let Some(interval) = session.store.store_token(token, Instant::now()) {
                session.counter.renew_interval_seconds = interval.as_secs();
            }

            if !need_verify {
                return renewed(self, &mut session);
            }

            let token = session.store.token().to_string();
            match self.probe(&token).await {
                Ok(summary) => {
                    debug!(
                        "Verified token for {} ({} {}, code level {})",
                        self.address(),
                        summary.name,
                        summary.product_name.as_deref().unwrap_or("unknown product"),
                        summary.code_level.as_deref().unwrap_or("unknown")
                    );
                    session.store.mark_verified(Instant::now(), Some(summary.name));
                    return renewed(self, &mut session);
                }
                Err(e) => {
                    session.store.clear_token();
                    warn!(
                        "Token verification failed for {} ({}), re-requesting auth token",
                        self.address(),
                        e
                    );
                }
            }
        }

        session.counter.renew_failure_count += 1;
        error!(
            "Failed getting a verified auth token for {} after {} attempts, check network or credentials",
            self.address(),
            policy.max_renew_attempts
        );
        finish(&session, false)
    }

    /// Call the probe command up to `max_verify_probes` times.
    async fn probe(&self, token: &str) -> Result<SystemSummary> {
        let policy = self.policy();
        let mut probes = 0;
        loop {
            probes += 1;
            match self.transport().post_command(PROBE_COMMAND, token).await {
                Ok(body) => return Ok(system_summary(self.address(), body)),
                Err(e) if probes >= policy.max_verify_probes => return Err(e),
                Err(e) => {
                    debug!("Probe {} for {} failed: {}", probes, self.address(), e);
                    tokio::time::sleep(policy.verify_retry_delay()).await;
                }
            }
        }
    }
}

/// The probe only proves the token live; an unexpected body still counts.
fn system_summary(address: &str, body: serde_json::Value) -> SystemSummary {
    serde_json::from_value(body).unwrap_or_else(|e| {
        debug!(
            "Unexpected {} answer from {}, system name unresolved: {}",
            PROBE_COMMAND, address, e
        );
        SystemSummary::default()
    })
}

fn renewed(target: &TargetHandle, session: &mut Session) -> TokenStatus {
    session.counter.renew_success_count += 1;
    info!("Renewed auth token for {}", target.address());
    finish(session, true)
}

fn finish(session: &Session, ok: bool) -> TokenStatus {
    TokenStatus {
        counter: session.counter,
        ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_summary_reads_name() {
        let summary = system_summary("10.0.0.5", json!({"name": "SARA", "code_level": "8.5.0.6"}));
        assert_eq!(summary.name, "SARA");
        assert_eq!(summary.code_level.as_deref(), Some("8.5.0.6"));
    }

    #[test]
    fn system_summary_defaults_on_unexpected_shape() {
        let summary = system_summary("10.0.0.5", json!([{"name": "SARA"}]));
        assert!(summary.name.is_empty());
        assert!(summary.product_name.is_none());
    }
}
