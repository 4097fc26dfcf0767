//! Server integration tests
//!
//! Tests for HTTP endpoints, served in-process in front of a fake array.

mod common;

use common::{sample, FakeArray};
use serde_json::json;
use spectrum_exporter::config::Config;
use spectrum_exporter::server::{self, AppState};

/// Start the exporter for one fake array and return its base URL.
async fn start_exporter(array: &FakeArray) -> String {
    start_exporter_with(array, true).await
}

async fn start_exporter_with(array: &FakeArray, exporter_metrics: bool) -> String {
    let config: Config = serde_json::from_value(json!({
        "server": {"exporter_metrics": exporter_metrics},
        "targets": [{
            "address": "127.0.0.1",
            "user": "monitor",
            "password": "secret",
            "use_tls": false,
            "port": array.port()
        }],
        "token": {"verify_retry_delay_ms": 0},
        "extra_labels": [{"name": "datacenter", "value": "wdc04"}]
    }))
    .expect("Failed to build config");
    config.validate().expect("Config should be valid");

    let state = AppState::from_config(&config).expect("Failed to build state");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, server::router(state)).await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    // Given: An exporter in front of a healthy array
    let array = FakeArray::start("SARA").await;
    let base = start_exporter(&array).await;

    // When: Scraping /metrics
    let response = reqwest::get(format!("{}/metrics", base)).await.unwrap();

    // Then: Health and collector series are rendered with the extra label
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("# HELP"), "Missing HELP comment");
    assert!(body.contains("# TYPE"), "Missing TYPE comment");
    assert_eq!(
        sample(
            &body,
            "spectrum_collector_scrape_success",
            &[("target", "127.0.0.1"), ("resource", "SARA"), ("datacenter", "wdc04")]
        ),
        Some(1.0)
    );
    assert!(body.contains("spectrum_system_physical_capacity_used_percent"));
}

#[tokio::test]
async fn test_settings_endpoint_runs_settings_collectors() {
    let array = FakeArray::start("SARA").await;
    let base = start_exporter(&array).await;

    let response = reqwest::get(format!("{}/settings?target=127.0.0.1", base))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("spectrum_collector_scrape_success"));
    assert_eq!(array.calls("lsdrive"), 1);
    assert_eq!(array.calls("lsnodecanister"), 1);
    assert_eq!(array.calls("lsmdiskgrp"), 0);
}

#[tokio::test]
async fn test_unknown_target_is_not_found() {
    // Given: An exporter with a single configured target
    let array = FakeArray::start("SARA").await;
    let base = start_exporter(&array).await;

    // When: Asking for a target that is not configured
    let response = reqwest::get(format!("{}/metrics?target=10.9.9.9", base))
        .await
        .unwrap();

    // Then: 404 and no remote calls
    assert_eq!(response.status(), 404);
    assert!(response.text().await.unwrap().contains("10.9.9.9"));
    assert_eq!(array.auth_calls(), 0);
}

#[tokio::test]
async fn test_empty_target_scrapes_all() {
    let array = FakeArray::start("SARA").await;
    let base = start_exporter(&array).await;

    let response = reqwest::get(format!("{}/metrics?target=", base)).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(array.auth_calls(), 1);
}

#[tokio::test]
async fn test_token_is_reused_across_endpoints() {
    // Given: An exporter in front of a healthy array
    let array = FakeArray::start("SARA").await;
    let base = start_exporter(&array).await;

    // When: Scraping both endpoints twice
    for path in ["metrics", "settings", "metrics", "settings"] {
        let response = reqwest::get(format!("{}/{}", base, path)).await.unwrap();
        assert_eq!(response.status(), 200);
    }

    // Then: The array saw a single login
    assert_eq!(array.auth_calls(), 1);
}

#[tokio::test]
async fn test_health_and_landing_page() {
    let array = FakeArray::start("SARA").await;
    let base = start_exporter(&array).await;

    let health = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(health.status(), 200);
    assert_eq!(health.text().await.unwrap(), "OK");

    let root = reqwest::get(format!("{}/", base)).await.unwrap();
    assert_eq!(root.status(), 200);
    let page = root.text().await.unwrap();
    assert!(page.contains("/metrics"));
    assert!(page.contains("/settings"));
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_exporter_process_metrics_follow_the_flag() {
    // Given: One exporter with process metrics and one without
    let array = FakeArray::start("SARA").await;
    let with = start_exporter_with(&array, true).await;
    let without = start_exporter_with(&array, false).await;

    // When: Scraping both endpoints of each
    for path in ["metrics", "settings"] {
        let body = reqwest::get(format!("{}/{}", with, path))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        let bare = reqwest::get(format!("{}/{}", without, path))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        // Then: process_* series appear only when enabled, target series in both
        assert!(body.contains("\nprocess_"), "missing process metrics on /{}", path);
        assert!(!bare.contains("process_"), "unexpected process metrics on /{}", path);
        assert!(body.contains("spectrum_collector_scrape_success"));
        assert!(bare.contains("spectrum_collector_scrape_success"));
    }
}

#[test]
fn test_exporter_metrics_enabled_by_default() {
    let config: Config = serde_json::from_value(json!({
        "targets": [{"address": "10.0.0.5", "user": "u", "password": "p"}]
    }))
    .unwrap();

    assert!(config.server.exporter_metrics);
}
