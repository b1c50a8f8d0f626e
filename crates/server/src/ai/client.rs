//! Gemini API client for the Generative Language REST API

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

/// Client for the Gemini generateContent / embedContent endpoints
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    generation_model: String,
    embedding_model: String,
}

/// One content part of a request — text or inline image data
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

/// Base64-encoded media attached to a request
#[derive(Debug, Clone, Serialize)]
pub struct Blob {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
struct EmbedRequest {
    content: RequestContent,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f64>,
}

/// Error detail returned by Google APIs
#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GeminiClient {
    pub fn new(
        api_base: String,
        api_key: String,
        generation_model: String,
        embedding_model: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base,
            api_key,
            generation_model,
            embedding_model,
        }
    }

    /// Send a text-only prompt, return the model's text reply
    pub async fn generate_text(&self, prompt: &str) -> Result<String, String> {
        self.generate(vec![Part::Text {
            text: prompt.to_string(),
        }])
        .await
    }

    /// Send a prompt plus an inline image, return the model's text reply
    pub async fn generate_vision(
        &self,
        prompt: &str,
        mime_type: &str,
        image: &[u8],
    ) -> Result<String, String> {
        self.generate(vec![
            Part::Text {
                text: prompt.to_string(),
            },
            Part::InlineData {
                inline_data: Blob {
                    mime_type: mime_type.to_string(),
                    data: BASE64.encode(image),
                },
            },
        ])
        .await
    }

    /// Embed a piece of text into a vector
    pub async fn embed(&self, text: &str) -> Result<Vec<f64>, String> {
        let url = format!(
            "{}/models/{}:embedContent?key={}",
            self.api_base, self.embedding_model, self.api_key
        );
        let request = EmbedRequest {
            content: RequestContent {
                parts: vec![Part::Text {
                    text: text.to_string(),
                }],
            },
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(Self::error_message("Embedding", response).await);
        }

        let body = response
            .json::<EmbedResponse>()
            .await
            .map_err(|e| format!("Failed to parse embedding response: {}", e))?;

        Ok(body.embedding.values)
    }

    async fn generate(&self, parts: Vec<Part>) -> Result<String, String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, self.generation_model, self.api_key
        );
        let request = GenerateRequest {
            contents: vec![RequestContent { parts }],
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(Self::error_message("Gemini", response).await);
        }

        let body = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))?;

        Self::extract_text(&body)
    }

    /// Pull the first text part out of the first candidate
    fn extract_text(response: &GenerateResponse) -> Result<String, String> {
        response
            .candidates
            .first()
            .and_then(|c| c.content.parts.iter().find_map(|p| p.text.clone()))
            .ok_or_else(|| "No text content in response".to_string())
    }

    async fn error_message(api: &str, response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if let Ok(api_err) = serde_json::from_str::<ApiError>(&body) {
            return format!("{} API error ({}): {}", api, status, api_err.error.message);
        }
        format!("{} API error ({}): {}", api, status, body)
    }
}
