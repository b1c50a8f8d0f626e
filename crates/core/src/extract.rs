//! Best-effort parsing of the vision model's prescription reply.
//!
//! The model is instructed to return a bare JSON object with
//! `patient_id` and `prescription` keys, but in practice the reply may
//! arrive wrapped in markdown fences or with surrounding prose. Parsing
//! is a two-stage strategy: strict JSON first, then independent regex
//! fallbacks over the raw text. It never fails — absent data degrades
//! to the `"Not found"` sentinel.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Sentinel for a field the model's reply did not contain.
pub const NOT_FOUND: &str = "Not found";

static PATIENT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""patient_id":\s*"([^"]*)""#).unwrap());
static PRESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""prescription":\s*"([^"]*)""#).unwrap());

/// The two fields extracted from a prescription image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPrescription {
    pub patient_id: String,
    pub prescription: String,
}

/// Outcome of parsing the model's reply, tagged by confidence.
///
/// `Parsed` means the reply was a well-formed JSON object;
/// `FallbackParsed` means at least one field was recovered by regex
/// from an otherwise unparseable reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Parsed(ExtractedPrescription),
    FallbackParsed(ExtractedPrescription),
    NotFound,
}

impl Extraction {
    /// Collapse into the two response fields, substituting sentinels.
    pub fn into_fields(self) -> (String, String) {
        match self {
            Extraction::Parsed(p) | Extraction::FallbackParsed(p) => {
                (p.patient_id, p.prescription)
            }
            Extraction::NotFound => (NOT_FOUND.to_string(), NOT_FOUND.to_string()),
        }
    }
}

/// Parse the model's raw reply into the two prescription fields.
pub fn parse_model_reply(raw: &str) -> Extraction {
    let cleaned = strip_fences(raw);

    // Strict parse of the cleaned text; missing keys degrade to the
    // sentinel rather than failing the whole parse.
    if let Ok(JsonValue::Object(map)) = serde_json::from_str::<JsonValue>(cleaned) {
        return Extraction::Parsed(ExtractedPrescription {
            patient_id: field_or_sentinel(map.get("patient_id")),
            prescription: field_or_sentinel(map.get("prescription")),
        });
    }

    // Regex fallback runs over the original raw text, not the cleaned
    // form, so values outside the fenced block still match.
    let patient_id = PATIENT_ID_RE
        .captures(raw)
        .map(|c| c[1].to_string());
    let prescription = PRESCRIPTION_RE
        .captures(raw)
        .map(|c| c[1].to_string());

    if patient_id.is_none() && prescription.is_none() {
        return Extraction::NotFound;
    }

    Extraction::FallbackParsed(ExtractedPrescription {
        patient_id: patient_id.unwrap_or_else(|| NOT_FOUND.to_string()),
        prescription: prescription.unwrap_or_else(|| NOT_FOUND.to_string()),
    })
}

/// Strip leading/trailing markdown code fences from a reply.
fn strip_fences(text: &str) -> &str {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

fn field_or_sentinel(value: Option<&JsonValue>) -> String {
    match value {
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => NOT_FOUND.to_string(),
    }
}
