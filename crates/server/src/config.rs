//! Server configuration
//!
//! Assembled once at startup from environment variables and passed
//! explicitly into the router; nothing reads the environment after
//! this point.

use thiserror::Error;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const BIGQUERY_API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";
const DEFAULT_GENERATION_MODEL: &str = "gemini-2.0-flash-exp";
const DEFAULT_EMBEDDING_MODEL: &str = "text-multilingual-embedding-002";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),
}

/// Server configuration loaded from environment variables
pub struct Config {
    pub bind_address: String,
    pub cors_origins: Vec<String>,

    pub google_api_key: String,
    pub generation_model: String,
    pub embedding_model: String,
    pub gemini_api_base: String,

    pub project_id: String,
    pub location: String,
    pub dataset_name: String,
    pub table_name: String,
    pub bigquery_api_base: String,
    /// Bearer token for the warehouse API. Optional so local stubs can
    /// be queried without credentials.
    pub bigquery_access_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_address: env_or("BIND_ADDRESS", "0.0.0.0:8000"),
            cors_origins: env_or("CORS_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            google_api_key: required("GOOGLE_API_KEY")?,
            generation_model: env_or("GENERATION_MODEL", DEFAULT_GENERATION_MODEL),
            embedding_model: env_or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            gemini_api_base: env_or("GEMINI_API_BASE", GEMINI_API_BASE),
            project_id: required("PROJECT_ID")?,
            location: env_or("LOCATION", "US"),
            dataset_name: env_or("DATASET_NAME", "patients_vector_search_demo"),
            table_name: env_or("TABLE_NAME", "patients_with_embeddings"),
            bigquery_api_base: env_or("BIGQUERY_API_BASE", BIGQUERY_API_BASE),
            bigquery_access_token: std::env::var("BIGQUERY_ACCESS_TOKEN").ok(),
        })
    }

    /// Fully-qualified id of the table that carries the embeddings
    /// column; every patient query runs against it.
    pub fn embedding_table_id(&self) -> String {
        format!(
            "{}.{}.{}_embeddings",
            self.project_id, self.dataset_name, self.table_name
        )
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}
