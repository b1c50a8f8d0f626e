//! Capability listing endpoint

use axum::Json;
use serde_json::{Value as JsonValue, json};

/// GET / - Static listing of the API surface
pub async fn index() -> Json<JsonValue> {
    Json(json!({
        "message": "Medical Image Analysis API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Upload medical prescription images for AI-powered analysis",
        "endpoints": {
            "/analyze-image": "POST - Upload and analyze medical prescription image",
            "/analyze-patient": "POST - Analyze patient by PID with AI-powered medical insights",
            "/vector-search": "POST - Semantic search for similar patients using natural language queries",
            "/patients": "GET - Get patients with pagination (limit, offset params)",
            "/patients/count": "GET - Get total patient count",
            "/patients/{pid}": "GET - Get specific patient by PID",
            "/search": "GET - Search patients by query",
            "/health": "GET - Health check"
        }
    }))
}
