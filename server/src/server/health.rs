//! Health and readiness endpoints.

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

/// Health payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status string
    pub status: &'static str,
}

/// Liveness: the process is up.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Readiness: the process can serve traffic.
pub async fn readiness_check() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse { status: "ready" }))
}
