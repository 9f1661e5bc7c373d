use axum::{
    extract::{OriginalUri, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use pdfconvert_core::{CircuitSnapshot, LicenseStatus, SanitizedConfig, TargetFormat};

use super::error::ApiError;
use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP".to_string(),
    })
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub engine: String,
    pub license: LicenseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /health/ready
///
/// Ready when the conversion engine answers its self-check.
pub async fn readiness(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let engine = state.engine();
    let (status, error) = match engine.validate().await {
        Ok(()) => (StatusCode::OK, None),
        Err(e) => {
            warn!(engine = engine.name(), error = %e, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Some(e.to_string()))
        }
    };

    (
        status,
        Json(ReadinessResponse {
            status: if status.is_success() { "UP" } else { "DOWN" }.to_string(),
            engine: engine.name().to_string(),
            license: state.license().clone(),
            error,
        }),
    )
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

#[derive(Serialize)]
pub struct CircuitStatus {
    pub pair: String,
    #[serde(flatten)]
    pub snapshot: CircuitSnapshot,
}

/// GET /api/circuit
pub async fn list_circuits(State(state): State<Arc<AppState>>) -> Json<Vec<CircuitStatus>> {
    let mut circuits = Vec::new();
    for policy in state.policies() {
        circuits.push(CircuitStatus {
            pair: policy.target().pair().to_string(),
            snapshot: policy.snapshot().await,
        });
    }
    Json(circuits)
}

/// POST /api/circuit/{format_pair}/reset
pub async fn reset_circuit(
    State(state): State<Arc<AppState>>,
    Path(format_pair): Path<String>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let policy = match TargetFormat::from_pair(&format_pair).and_then(|t| state.policy(t)) {
        Some(policy) => policy,
        None => return ApiError::UnsupportedPair(format_pair).into_response_at(uri.path()),
    };

    policy.reset().await;
    Json(CircuitStatus {
        pair: policy.target().pair().to_string(),
        snapshot: policy.snapshot().await,
    })
    .into_response()
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>, OriginalUri(uri): OriginalUri) -> Response {
    collect_dynamic_metrics(&state).await;
    match encode_metrics() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => ApiError::Internal(e.to_string()).into_response_at(uri.path()),
    }
}
