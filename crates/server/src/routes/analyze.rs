//! AI analysis HTTP handlers

use axum::{
    Json,
    extract::{Multipart, State},
};
use chrono::Local;
use medrx_core::PatientDetail;
use serde::{Deserialize, Serialize};

use crate::ai::{insights, prescription};
use crate::ai::prescription::ImageAnalysis;
use crate::error::AppError;
use crate::state::AppState;

/// Request body for patient history analysis
#[derive(Deserialize)]
pub struct PatientAnalysisRequest {
    pid: i64,
    query: String,
}

/// Response body for patient history analysis
#[derive(Serialize)]
pub struct PatientAnalysisResponse {
    analysis_date: String,
    query: String,
    patient_data: PatientDetail,
    ai_analysis: String,
    status: String,
}

/// POST /analyze-image - Extract patient id and remedies from a
/// prescription image
///
/// Content-type validation happens before the vision call; a failed
/// vision call still yields a 200 with sentinel fields.
pub async fn image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImageAnalysis>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::BadRequest("File must be an image".to_string()));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
        upload = Some((content_type, bytes.to_vec()));
        break;
    }

    let (content_type, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("Missing file field".to_string()))?;

    tracing::info!(content_type = %content_type, size = bytes.len(), "Analyzing prescription image");

    let analysis = prescription::analyze_image(&state.gemini, &content_type, &bytes).await;
    Ok(Json(analysis))
}

/// POST /analyze-patient - AI analysis of one patient's history
pub async fn patient(
    State(state): State<AppState>,
    Json(body): Json<PatientAnalysisRequest>,
) -> Result<Json<PatientAnalysisResponse>, AppError> {
    let record = state
        .warehouse
        .get_patient(body.pid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Patient with PID {} not found", body.pid)))?;

    let detail = record.to_detail();

    tracing::info!(pid = body.pid, query = %body.query, "Patient history analysis");

    let ai_analysis = insights::analyze_history(&state.gemini, &detail, &body.query)
        .await
        .map_err(|e| AppError::Upstream(format!("Error in AI analysis: {}", e)))?;

    Ok(Json(PatientAnalysisResponse {
        analysis_date: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        query: body.query,
        patient_data: detail,
        ai_analysis,
        status: "success".to_string(),
    }))
}
