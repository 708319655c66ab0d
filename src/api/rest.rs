//! REST API Handlers
//!
//! Endpoints for submitting a host's USB payload and reading back its stored
//! snapshot, plus health, readiness and metrics.

use crate::error::Error;
use crate::inventory::processor::{parse_payload, InventoryProcessor};
use crate::metrics::IngestMetrics;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Json, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

/// Default request body limit
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

// =============================================================================
// Request/Response Types
// =============================================================================

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
}

impl From<&Error> for ApiErrorResponse {
    fn from(err: &Error) -> Self {
        Self {
            error: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
    pub payloads_total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payload_at: Option<DateTime<Utc>>,
}

// =============================================================================
// REST Router
// =============================================================================

/// REST API router builder
pub struct RestRouter {
    processor: Arc<InventoryProcessor>,
    metrics: Arc<IngestMetrics>,
    max_body_size: usize,
}

impl RestRouter {
    pub fn new(processor: Arc<InventoryProcessor>, metrics: Arc<IngestMetrics>) -> Self {
        Self {
            processor,
            metrics,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState {
            processor: self.processor,
            metrics: self.metrics,
        };

        Router::new()
            // Inventory endpoints
            .route("/v1/usb/:serial", get(get_snapshot).post(ingest_payload))
            // Health and metrics
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .route("/metrics", get(metrics_text))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(DefaultBodyLimit::max(self.max_body_size)),
            )
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    processor: Arc<InventoryProcessor>,
    metrics: Arc<IngestMetrics>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Replace a host's snapshot with the submitted payload
async fn ingest_payload(
    State(state): State<AppState>,
    Path(serial): Path<String>,
    body: Bytes,
) -> Response {
    let result = match parse_payload(&body) {
        Ok(payload) => state.processor.process(&serial, payload).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(summary) => {
            state.metrics.record(&summary);
            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(e) => {
            state.metrics.record_error();
            error_response(&serial, e)
        }
    }
}

/// Stored records for a host
async fn get_snapshot(State(state): State<AppState>, Path(serial): Path<String>) -> Response {
    match state.processor.snapshot(&serial).await {
        Ok(records) => {
            debug!(serial_number = %serial, count = records.len(), "Serving USB snapshot");
            (StatusCode::OK, Json(records)).into_response()
        }
        Err(e) => error_response(&serial, e),
    }
}

/// Health check
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness check
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(ReadinessResponse {
        status: "ready".into(),
        version: crate::VERSION.into(),
        backend: state.processor.backend_name().to_string(),
        payloads_total: state.metrics.payloads_total(),
        last_payload_at: state.metrics.last_payload_at(),
    })
}

/// Prometheus exposition
async fn metrics_text(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, state.metrics.content_type())],
            text,
        )
            .into_response(),
        Err(e) => error_response("-", e),
    }
}

fn error_response(serial: &str, err: Error) -> Response {
    let status = err.status_code();
    if err.is_client_error() {
        warn!(serial_number = %serial, "Rejected USB inventory request: {}", err);
    } else {
        error!(serial_number = %serial, "USB inventory request failed: {}", err);
    }

    (status, Json(ApiErrorResponse::from(&err))).into_response()
}
