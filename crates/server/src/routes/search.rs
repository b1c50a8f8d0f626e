//! Search HTTP handlers: vector search and substring search

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Local;
use medrx_core::query::{SearchMode, classify_query};
use medrx_core::{PatientListing, SearchOutcome};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// Request body for vector search
#[derive(Deserialize)]
pub struct VectorSearchRequest {
    query: String,
    #[serde(default = "default_top_k")]
    top_k: u32,
}

fn default_top_k() -> u32 {
    5
}

/// Response body: the search outcome plus timestamp and status
#[derive(Serialize)]
pub struct VectorSearchResponse {
    #[serde(flatten)]
    outcome: SearchOutcome,
    search_date: String,
    status: String,
}

/// Query parameters for substring search
#[derive(Deserialize, Default)]
pub struct TextSearchParams {
    pub q: Option<String>,
}

/// POST /vector-search - Find patients by id or semantic similarity
///
/// A query naming a pid becomes an exact lookup at similarity 100.0;
/// anything else is embedded and ranked by cosine distance. `top_k` is
/// caller-supplied and deliberately unbounded.
pub async fn vector(
    State(state): State<AppState>,
    Json(body): Json<VectorSearchRequest>,
) -> Result<Json<VectorSearchResponse>, AppError> {
    let outcome = match classify_query(&body.query) {
        SearchMode::PidLookup(pid) => {
            tracing::info!(pid, "Vector search resolved to pid lookup");
            match state.warehouse.get_patient(pid).await? {
                Some(record) => SearchOutcome::pid_match(body.query.clone(), record),
                None => SearchOutcome::pid_miss(body.query.clone(), pid),
            }
        }
        SearchMode::Semantic => {
            tracing::info!(query = %body.query, top_k = body.top_k, "Semantic vector search");
            let embedding = state
                .gemini
                .embed(&body.query)
                .await
                .map_err(|e| AppError::Upstream(format!("Embedding request failed: {}", e)))?;
            let hits = state.warehouse.vector_search(&embedding, body.top_k).await?;
            SearchOutcome::ranked(body.query.clone(), hits)
        }
    };

    Ok(Json(VectorSearchResponse {
        outcome,
        search_date: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        status: "success".to_string(),
    }))
}

/// GET /search?q= - Case-insensitive substring search over name, id
/// and address
pub async fn text(
    State(state): State<AppState>,
    Query(params): Query<TextSearchParams>,
) -> Result<Json<Vec<PatientListing>>, AppError> {
    let term = params.q.unwrap_or_default().trim().to_lowercase();
    if term.is_empty() {
        return Err(AppError::BadRequest(
            "Query parameter 'q' is required".to_string(),
        ));
    }

    let records = state.warehouse.fetch_all().await?;
    let matches: Vec<PatientListing> = records
        .iter()
        .filter(|r| r.matches_term(&term))
        .map(|r| r.to_listing())
        .collect();

    Ok(Json(matches))
}
