use axum::Json;
use chrono::Utc;

use crate::api::{HealthResponse, ServiceStatusResponse};

/// GET /
pub async fn root() -> &'static str {
    "PulseVote API running!"
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        ts: Utc::now().timestamp_millis(),
    })
}

/// GET /test
pub async fn service_status() -> Json<ServiceStatusResponse> {
    Json(ServiceStatusResponse {
        status: "ok",
        service: "pulsevote-backend",
        timestamp: Utc::now().to_rfc3339(),
    })
}
