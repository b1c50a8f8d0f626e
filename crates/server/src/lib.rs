//! medrx-server library crate
//!
//! Exposes `build_app`, `config` and `AppState` for integration tests.
//! The actual binary entrypoint is in `main.rs`.

pub mod ai;
pub mod config;
pub mod db;
mod error;
mod routes;
mod state;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
pub use state::AppState;

/// Build the full application router with all routes and middleware.
///
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a TCP port.
pub fn build_app(state: AppState, config: &Config) -> Router {
    // Build CORS layer
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    routes::api_routes()
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
