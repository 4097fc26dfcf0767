//! In-process fake Spectrum Virtualize array
//!
//! Serves `POST /rest/<command>` on `127.0.0.1:0` over plain HTTP and counts
//! every request per command, so tests can assert exactly how many remote
//! calls the exporter made.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use secrecy::SecretString;
use serde_json::{json, Value};
use spectrum_exporter::config::{TargetConfig, TokenConfig};
use spectrum_exporter::spectrum::TargetHandle;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct FakeState {
    name: String,
    calls: Mutex<HashMap<String, usize>>,
    issued: AtomicUsize,
    reject_auth: AtomicBool,
    fail_probe: AtomicBool,
    /// Reject the n-th non-auth, non-probe command with 403 (0 = never)
    reject_command_at: AtomicUsize,
    commands_seen: AtomicUsize,
    responses: Mutex<HashMap<String, String>>,
    /// Latency added to every answer
    delay_ms: AtomicU64,
}

#[derive(Clone)]
pub struct FakeArray {
    state: Arc<FakeState>,
    addr: SocketAddr,
}

impl FakeArray {
    /// Start a fake array reporting `name` from `lssystem`.
    pub async fn start(name: &str) -> Self {
        let state = Arc::new(FakeState {
            name: name.to_string(),
            ..Default::default()
        });

        let app = Router::new()
            .route("/rest/{*command}", post(handle))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake array");
        let addr = listener.local_addr().expect("Failed to read local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake array failed");
        });

        Self { state, addr }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Target configuration pointing at this fake.
    pub fn target_config(&self) -> TargetConfig {
        TargetConfig {
            address: "127.0.0.1".to_string(),
            user: "monitor".to_string(),
            password: SecretString::from("secret"),
            verify_cert: false,
            use_tls: false,
            port: self.port(),
        }
    }

    pub fn handle(&self, policy: TokenConfig) -> Arc<TargetHandle> {
        Arc::new(TargetHandle::new(self.target_config(), policy).expect("Failed to build handle"))
    }

    pub fn calls(&self, command: &str) -> usize {
        self.state
            .calls
            .lock()
            .unwrap()
            .get(command)
            .copied()
            .unwrap_or(0)
    }

    pub fn auth_calls(&self) -> usize {
        self.calls("auth")
    }

    pub fn reject_auth(&self) {
        self.state.reject_auth.store(true, Ordering::SeqCst);
    }

    pub fn fail_probe(&self) {
        self.state.fail_probe.store(true, Ordering::SeqCst);
    }

    /// Delay every answer, auth included, by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.state
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn reject_command_at(&self, n: usize) {
        self.state.reject_command_at.store(n, Ordering::SeqCst);
    }

    /// Raw body returned for `command`.
    pub fn respond(&self, command: &str, body: &str) {
        self.state
            .responses
            .lock()
            .unwrap()
            .insert(command.to_string(), body.to_string());
    }

    pub fn respond_json(&self, command: &str, body: Value) {
        self.respond(command, &body.to_string());
    }
}

/// Token policy with no retry delay, otherwise the production defaults.
pub fn fast_policy() -> TokenConfig {
    TokenConfig {
        verify_retry_delay_ms: 0,
        ..TokenConfig::default()
    }
}

async fn handle(
    State(state): State<Arc<FakeState>>,
    Path(command): Path<String>,
    headers: HeaderMap,
) -> Response {
    let delay = state.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    *state.calls.lock().unwrap().entry(command.clone()).or_insert(0) += 1;

    if command == "auth" {
        if state.reject_auth.load(Ordering::SeqCst) {
            return (StatusCode::FORBIDDEN, "bad credentials").into_response();
        }
        let n = state.issued.fetch_add(1, Ordering::SeqCst) + 1;
        return json!({ "token": format!("tok-{}", n) })
            .to_string()
            .into_response();
    }

    let token = headers
        .get("X-Auth-Token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !token.starts_with("tok-") {
        return (StatusCode::FORBIDDEN, "missing token").into_response();
    }

    if command == "lssystem" && state.fail_probe.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "probe failed").into_response();
    }

    if command != "lssystem" {
        let seen = state.commands_seen.fetch_add(1, Ordering::SeqCst) + 1;
        if seen == state.reject_command_at.load(Ordering::SeqCst) {
            return (StatusCode::FORBIDDEN, "token expired").into_response();
        }
    }

    if let Some(body) = state.responses.lock().unwrap().get(&command) {
        return body.clone().into_response();
    }

    match command.as_str() {
        "lssystem" => json!({
            "name": state.name,
            "physical_capacity": "40.00TB",
            "physical_free_capacity": "30.00TB",
        })
        .to_string()
        .into_response(),
        _ => "[]".into_response(),
    }
}

/// Value of the first sample of `metric` carrying all `labels`, label order ignored.
pub fn sample(rendered: &str, metric: &str, labels: &[(&str, &str)]) -> Option<f64> {
    let prefix = format!("{}{{", metric);
    rendered
        .lines()
        .filter(|line| line.starts_with(&prefix))
        .find(|line| {
            labels
                .iter()
                .all(|(name, value)| line.contains(&format!("{}=\"{}\"", name, value)))
        })
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}
