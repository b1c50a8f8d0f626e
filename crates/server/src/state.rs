//! Shared per-process state handed to every handler

use crate::ai::GeminiClient;
use crate::config::Config;
use crate::db::Warehouse;

/// Immutable application state, assembled once at startup
#[derive(Clone)]
pub struct AppState {
    pub gemini: GeminiClient,
    pub warehouse: Warehouse,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            gemini: GeminiClient::new(
                config.gemini_api_base.clone(),
                config.google_api_key.clone(),
                config.generation_model.clone(),
                config.embedding_model.clone(),
            ),
            warehouse: Warehouse::new(
                config.bigquery_api_base.clone(),
                config.project_id.clone(),
                config.location.clone(),
                config.bigquery_access_token.clone(),
                config.embedding_table_id(),
            ),
        }
    }
}
