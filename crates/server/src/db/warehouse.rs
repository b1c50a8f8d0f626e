//! Warehouse read client speaking the BigQuery `jobs.query` REST shape.
//!
//! The warehouse owns the patient table; this client only issues
//! read-only SQL and types the loosely-typed row cells at the boundary.
//! Numeric parameters are interpolated directly — every value placed in
//! SQL here is an `i64` or an `f64`, never caller-supplied text.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use medrx_core::PatientRecord;
use medrx_core::patient::PATIENT_COLUMNS;

use crate::error::AppError;

/// Read-only client for the patient embeddings table
#[derive(Clone)]
pub struct Warehouse {
    http: reqwest::Client,
    api_base: String,
    project_id: String,
    location: String,
    access_token: Option<String>,
    table_id: String,
}

#[derive(Serialize)]
struct QueryRequest {
    query: String,
    #[serde(rename = "useLegacySql")]
    use_legacy_sql: bool,
    location: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default, rename = "jobComplete")]
    job_complete: Option<bool>,
    #[serde(default)]
    rows: Vec<TableRow>,
}

#[derive(Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<Cell>,
}

#[derive(Deserialize)]
struct Cell {
    #[serde(default)]
    v: JsonValue,
}

/// Error detail returned by the warehouse API
#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl Warehouse {
    pub fn new(
        api_base: String,
        project_id: String,
        location: String,
        access_token: Option<String>,
        table_id: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base,
            project_id,
            location,
            access_token,
            table_id,
        }
    }

    /// Page through patients ordered by id
    pub async fn list_patients(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PatientRecord>, AppError> {
        let sql = format!(
            "SELECT {} FROM `{}` ORDER BY PID LIMIT {} OFFSET {}",
            PATIENT_COLUMNS.join(", "),
            self.table_id,
            limit,
            offset
        );
        let rows = self.query(sql).await?;
        rows.iter()
            .map(|cells| PatientRecord::from_cells(cells).map_err(AppError::from))
            .collect()
    }

    /// Total number of patients in the table
    pub async fn count_patients(&self) -> Result<i64, AppError> {
        let sql = format!("SELECT COUNT(*) AS total_count FROM `{}`", self.table_id);
        let rows = self.query(sql).await?;
        let raw = rows
            .first()
            .and_then(|cells| cells.first())
            .and_then(|c| c.clone())
            .ok_or_else(|| AppError::Internal("Count query returned no rows".to_string()))?;
        raw.parse::<i64>()
            .map_err(|_| AppError::Internal(format!("Malformed count value `{}`", raw)))
    }

    /// Fetch one patient by exact id, including the free-text description
    pub async fn get_patient(&self, pid: i64) -> Result<Option<PatientRecord>, AppError> {
        let sql = format!(
            "SELECT {}, patient_description FROM `{}` WHERE PID = {} LIMIT 1",
            PATIENT_COLUMNS.join(", "),
            self.table_id,
            pid
        );
        let rows = self.query(sql).await?;
        match rows.first() {
            Some(cells) => Ok(Some(PatientRecord::from_cells(cells)?)),
            None => Ok(None),
        }
    }

    /// Full-table read, used by the substring search endpoint
    pub async fn fetch_all(&self) -> Result<Vec<PatientRecord>, AppError> {
        let sql = format!(
            "SELECT {}, patient_description FROM `{}` ORDER BY PID",
            PATIENT_COLUMNS.join(", "),
            self.table_id
        );
        let rows = self.query(sql).await?;
        rows.iter()
            .map(|cells| PatientRecord::from_cells(cells).map_err(AppError::from))
            .collect()
    }

    /// Cosine nearest-neighbor search over the embedding column.
    /// Returns (record, distance) pairs ordered by ascending distance.
    pub async fn vector_search(
        &self,
        embedding: &[f64],
        top_k: u32,
    ) -> Result<Vec<(PatientRecord, f64)>, AppError> {
        let vector_literal = embedding
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let base_columns = PATIENT_COLUMNS
            .iter()
            .map(|c| format!("base.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {base_columns}, distance \
             FROM VECTOR_SEARCH( \
               TABLE `{table}`, \
               'ml_generate_embedding_result', \
               (SELECT [{vector_literal}] AS ml_generate_embedding_result), \
               distance_type => 'COSINE', \
               top_k => {top_k}) \
             ORDER BY distance",
            table = self.table_id,
        );

        let rows = self.query(sql).await?;
        rows.iter()
            .map(|cells| {
                let record = PatientRecord::from_cells(&cells[..cells.len().min(8)])?;
                let raw = cells
                    .get(8)
                    .and_then(|c| c.clone())
                    .ok_or_else(|| AppError::Internal("Missing distance column".to_string()))?;
                let distance = raw
                    .parse::<f64>()
                    .map_err(|_| AppError::Internal(format!("Malformed distance `{}`", raw)))?;
                Ok((record, distance))
            })
            .collect()
    }

    /// Run one SQL statement and return its rows as string cells
    async fn query(&self, sql: String) -> Result<Vec<Vec<Option<String>>>, AppError> {
        tracing::debug!(sql = %sql, "Warehouse query");

        let url = format!("{}/projects/{}/queries", self.api_base, self.project_id);
        let request = QueryRequest {
            query: sql,
            use_legacy_sql: false,
            location: self.location.clone(),
        };

        let mut builder = self.http.post(&url).json(&request);
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Warehouse request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if let Ok(api_err) = serde_json::from_str::<ApiError>(&body) {
                return Err(AppError::Upstream(format!(
                    "Warehouse error ({}): {}",
                    status, api_err.error.message
                )));
            }
            return Err(AppError::Upstream(format!(
                "Warehouse error ({}): {}",
                status, body
            )));
        }

        let body = response
            .json::<QueryResponse>()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse warehouse response: {}", e)))?;

        if body.job_complete == Some(false) {
            return Err(AppError::Upstream(
                "Warehouse query did not complete".to_string(),
            ));
        }

        Ok(body
            .rows
            .into_iter()
            .map(|row| row.f.into_iter().map(|cell| cell_to_string(cell.v)).collect())
            .collect())
    }
}

/// The warehouse encodes every scalar cell as a JSON string or null
fn cell_to_string(value: JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
