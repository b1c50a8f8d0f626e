//! Patient listing HTTP handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use medrx_core::PatientListing;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// Query parameters for patient pagination
#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response body for the count endpoint
#[derive(Serialize)]
pub struct CountResponse {
    total_count: i64,
}

/// GET /patients - Page through patients ordered by id
///
/// `limit` defaults to 50 and is capped at 100; `offset` defaults to 0
/// and is floored at 0.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<PatientListing>>, AppError> {
    let limit = params.limit.unwrap_or(50).min(100);
    let offset = params.offset.unwrap_or(0).max(0);

    let records = state.warehouse.list_patients(limit, offset).await?;
    Ok(Json(records.iter().map(|r| r.to_listing()).collect()))
}

/// GET /patients/count - Total number of patients
pub async fn count(State(state): State<AppState>) -> Result<Json<CountResponse>, AppError> {
    let total_count = state.warehouse.count_patients().await?;
    Ok(Json(CountResponse { total_count }))
}

/// GET /patients/{pid} - Read one patient
pub async fn read(
    State(state): State<AppState>,
    Path(pid): Path<i64>,
) -> Result<Json<PatientListing>, AppError> {
    match state.warehouse.get_patient(pid).await? {
        Some(record) => Ok(Json(record.to_listing())),
        None => Err(AppError::NotFound(format!(
            "Patient with PID {} not found",
            pid
        ))),
    }
}
