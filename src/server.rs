//! HTTP Server
//!
//! Serves Prometheus scrapes. There is no background collection loop: every
//! request to `/metrics` or `/settings` runs one orchestrated scrape against the
//! selected targets and renders a fresh [`MetricSink`].
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page with links to the scrape endpoints
//! - `GET /metrics[?target=<address>]` - Capacity metrics
//! - `GET /settings[?target=<address>]` - Drive and node status
//! - `GET /health` - Liveness of the exporter itself
//!
//! An unknown `target` answers 404; an empty or missing one scrapes all targets.
//! Unless `[server] exporter_metrics` is off, both scrape endpoints also carry
//! the exporter's own `process_*` series.
//!
//! # State Management
//!
//! Target sessions live in the shared [`TargetRegistry`] and outlast every
//! request, so tokens are reused across scrapes and across both endpoints.

use crate::collectors::{self, CollectorRegistry};
use crate::config::{Config, ExtraLabel};
use crate::metrics::{exporter_registry, MetricSink};
use crate::scrape;
use crate::spectrum::TargetRegistry;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::Registry;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    targets: Arc<TargetRegistry>,
    metrics: Arc<CollectorRegistry>,
    settings: Arc<CollectorRegistry>,
    extra_labels: Arc<Vec<ExtraLabel>>,
    /// Process metrics of the exporter itself, absent when disabled
    exporter: Option<Arc<Registry>>,
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let targets = TargetRegistry::from_config(config)?;

        info!("Enabled metrics collectors:");
        let metrics = CollectorRegistry::from_config(config, collectors::metrics_collectors());
        info!("Enabled settings collectors:");
        let settings = CollectorRegistry::from_config(config, collectors::settings_collectors());

        let exporter = if config.server.exporter_metrics {
            Some(Arc::new(exporter_registry()?))
        } else {
            info!("Exporter process metrics disabled");
            None
        };

        Ok(Self {
            targets: Arc::new(targets),
            metrics: Arc::new(metrics),
            settings: Arc::new(settings),
            extra_labels: Arc::new(config.extra_labels.clone()),
            exporter,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ScrapeParams {
    target: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/settings", get(settings_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

pub async fn start(config: Config) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let app = router(state);

    let addr = format!("{}:{}", config.server.addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Metrics server listening on {}", addr);
    info!("Metrics available at http://{}/metrics", addr);
    info!("Settings available at http://{}/settings", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn root_handler() -> impl IntoResponse {
    axum::response::Html(
        r#"<html>
<head><title>Spectrum Virtualize Exporter</title></head>
<body>
<h1>Spectrum Virtualize Prometheus Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
<p><a href="/settings">Settings</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>"#,
    )
}

async fn metrics_handler(
    State(state): State<AppState>,
    Query(params): Query<ScrapeParams>,
) -> Response {
    let collectors = Arc::clone(&state.metrics);
    scrape_response(&state, &collectors, params).await
}

async fn settings_handler(
    State(state): State<AppState>,
    Query(params): Query<ScrapeParams>,
) -> Response {
    let collectors = Arc::clone(&state.settings);
    scrape_response(&state, &collectors, params).await
}

async fn scrape_response(
    state: &AppState,
    collectors: &CollectorRegistry,
    params: ScrapeParams,
) -> Response {
    let targets = match state.targets.select(params.target.as_deref()) {
        Ok(targets) => targets,
        Err(e) => {
            warn!("Rejected scrape request: {}", e);
            return (StatusCode::NOT_FOUND, e.to_string()).into_response();
        }
    };

    let sink = MetricSink::new(&state.extra_labels);
    scrape::collect(&targets, collectors, &sink).await;

    match sink.render_with(state.exporter.as_deref()) {
        Ok(metrics) => metrics.into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
