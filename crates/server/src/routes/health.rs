//! Health check endpoint

use axum::Json;
use chrono::Local;
use serde::Serialize;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
}

/// GET /health - Liveness probe; no dependency checks
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Local::now().to_rfc3339(),
    })
}
