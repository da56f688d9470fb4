//! HTTP API: liveness, readiness, recorder status and Prometheus metrics

use agent_lib::{
    collector::PollerConfig,
    format_epoch_millis,
    health::{ComponentStatus, HealthRegistry},
    observability::AgentMetrics,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// What this agent records, fixed for the process lifetime
#[derive(Debug, Clone, Serialize)]
pub struct RecorderInfo {
    pub version: String,
    pub nodes: Vec<String>,
    pub namespace: String,
    pub cadence_ms: u64,
}

impl RecorderInfo {
    pub fn new(version: impl Into<String>, poller: &PollerConfig) -> Self {
        Self {
            version: version.into(),
            nodes: poller.nodes.clone(),
            namespace: poller.namespace.clone(),
            cadence_ms: poller.cadence.as_millis() as u64,
        }
    }
}

/// Body of `/status`
#[derive(Debug, Serialize)]
struct StatusResponse<'a> {
    #[serde(flatten)]
    recorder: &'a RecorderInfo,
    status: ComponentStatus,
    last_tick_ms: Option<i64>,
    last_tick_utc: Option<String>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health: HealthRegistry,
    pub recorder: RecorderInfo,
    metrics: AgentMetrics,
}

impl AppState {
    pub fn new(health: HealthRegistry, recorder: RecorderInfo) -> Self {
        Self {
            health,
            recorder,
            metrics: AgentMetrics::new(),
        }
    }
}

/// 200 while every component is at least degraded, 503 otherwise
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health.health().await;
    let code = if health.status.is_operational() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(health))
}

/// 200 once the store is connected and a tick has completed
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health.readiness().await;
    let code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(readiness))
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health.health().await;
    Json(StatusResponse {
        recorder: &state.recorder,
        status: health.status,
        last_tick_ms: health.last_tick_ms,
        last_tick_utc: health.last_tick_ms.map(format_epoch_millis),
    })
    .into_response()
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, TEXT_FORMAT)], body),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, TEXT_FORMAT)],
                Vec::new(),
            )
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve the API on all interfaces until the task is aborted
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "API server listening");

    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
