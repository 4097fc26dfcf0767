//! Per-target session state
//!
//! Each configured array owns exactly one [`TargetHandle`] for the lifetime of
//! the process. The handle holds the REST transport and a mutex-guarded
//! [`Session`] (cached token plus renewal counters). Every scrape, and every
//! collector running inside it, shares that one session, so the cached token
//! survives across scrapes and is renewed by at most one task at a time.

use crate::config::{Config, TargetConfig, TokenConfig};
use crate::error::{ExporterError, Result};
use crate::spectrum::rest::RestTransport;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};

/// Cached session credential for one target.
///
/// Invariant: a non-empty token always has an acquisition time.
#[derive(Debug, Default)]
pub struct CredentialStore {
    token: String,
    display_name: String,
    acquired_at: Option<Instant>,
    verified_at: Option<Instant>,
}

impl CredentialStore {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn acquired_at(&self) -> Option<Instant> {
        self.acquired_at
    }

    pub fn verified_at(&self) -> Option<Instant> {
        self.verified_at
    }

    /// Token present and acquired less than `window` before `now`.
    pub fn acquired_within(&self, window: Duration, now: Instant) -> bool {
        self.has_token() && within(self.acquired_at, window, now)
    }

    /// Token present and proven live less than `window` before `now`.
    pub fn verified_within(&self, window: Duration, now: Instant) -> bool {
        self.has_token() && within(self.verified_at, window, now)
    }

    /// Store a freshly acquired token, returning the time since the previous acquisition.
    pub(crate) fn store_token(&mut self, token: String, now: Instant) -> Option<Duration> {
        let interval = self
            .acquired_at
            .map(|previous| now.saturating_duration_since(previous));
        self.token = token;
        self.acquired_at = Some(now);
        self.verified_at = None;
        interval
    }

    pub(crate) fn mark_verified(&mut self, now: Instant, display_name: Option<String>) {
        self.verified_at = Some(now);
        if let Some(name) = display_name.filter(|n| !n.is_empty()) {
            self.display_name = name;
        }
    }

    /// Drop the token so the next caller re-acquires. Timestamps of the last
    /// acquisition are kept for the renewal interval metric.
    pub(crate) fn clear_token(&mut self) {
        self.token.clear();
        self.verified_at = None;
    }
}

fn within(at: Option<Instant>, window: Duration, now: Instant) -> bool {
    at.is_some_and(|at| now.saturating_duration_since(at) < window)
}

/// Token renewal health for one target, copied out as a point-in-time snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthCounter {
    /// Seconds between the two most recent token acquisitions
    pub renew_interval_seconds: u64,
    pub renew_success_count: u64,
    pub renew_failure_count: u64,
}

/// State mutated under the target's lock.
#[derive(Debug, Default)]
pub struct Session {
    pub store: CredentialStore,
    pub counter: HealthCounter,
}

/// Long-lived handle for one configured array.
pub struct TargetHandle {
    config: TargetConfig,
    policy: TokenConfig,
    transport: RestTransport,
    session: Mutex<Session>,
}

impl TargetHandle {
    pub fn new(config: TargetConfig, policy: TokenConfig) -> Result<Self> {
        let transport = RestTransport::new(&config)?;
        Ok(Self {
            config,
            policy,
            transport,
            session: Mutex::new(Session::default()),
        })
    }

    pub fn address(&self) -> &str {
        &self.config.address
    }

    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    pub fn policy(&self) -> &TokenConfig {
        &self.policy
    }

    pub(crate) fn transport(&self) -> &RestTransport {
        &self.transport
    }

    /// Exclusive access for a whole read-decide-write sequence.
    pub(crate) async fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().await
    }

    pub async fn current_token(&self) -> String {
        self.session.lock().await.store.token().to_string()
    }

    pub async fn display_name(&self) -> String {
        self.session.lock().await.store.display_name().to_string()
    }

    pub async fn counter(&self) -> HealthCounter {
        self.session.lock().await.counter
    }
}

/// All configured targets, created once at startup.
pub struct TargetRegistry {
    targets: Vec<Arc<TargetHandle>>,
}

impl TargetRegistry {
    pub fn from_config(config: &Config) -> Result<Self> {
        let targets = config
            .targets
            .iter()
            .map(|t| TargetHandle::new(t.clone(), config.token.clone()).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { targets })
    }

    pub fn all(&self) -> &[Arc<TargetHandle>] {
        &self.targets
    }

    pub fn get(&self, address: &str) -> Option<Arc<TargetHandle>> {
        self.targets
            .iter()
            .find(|t| t.address() == address)
            .cloned()
    }

    /// Resolve the optional `target` query parameter of a scrape request.
    pub fn select(&self, address: Option<&str>) -> Result<Vec<Arc<TargetHandle>>> {
        match address {
            None | Some("") => Ok(self.targets.clone()),
            Some(address) => self.get(address).map(|t| vec![t]).ok_or_else(|| {
                ExporterError::Config(format!(
                    "The target '{}' is not defined in the configuration",
                    address
                ))
            }),
        }
    }
}
