mod analyze;
mod health;
mod patients;
mod root;
mod search;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root::index))
        .route("/analyze-image", post(analyze::image))
        .route("/analyze-patient", post(analyze::patient))
        .route("/vector-search", post(search::vector))
        .route("/patients", get(patients::list))
        .route("/patients/count", get(patients::count))
        .route("/patients/{pid}", get(patients::read))
        .route("/search", get(search::text))
        .route("/health", get(health::check))
}
