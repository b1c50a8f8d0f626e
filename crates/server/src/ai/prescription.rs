//! Prescription image extraction via the vision model

use chrono::Local;
use medrx_core::extract::{Extraction, parse_model_reply};
use serde::Serialize;

use super::client::GeminiClient;

const EXTRACTION_PROMPT: &str = r#"You are an expert-level AI assistant specializing in analyzing and extracting information from handwritten and printed homeopathic medical prescriptions. Your task is to meticulously analyze the provided image of a medical document and extract specific pieces of information.

Your output must be a single, valid JSON object and nothing else. Do not include any introductory text, explanations, markdown formatting, or code blocks. The JSON object should strictly adhere to the following structure and keys:

{
  "patient_id": "...",
  "prescription": "..."
}

Detailed Instructions for Extraction:

patient_id:

Locate the patient's unique identifier on the prescription. This is typically a numerical or alphanumeric code.

Extract this identifier exactly as it appears.

prescription:

This field should contain a single, comma-separated string of all prescribed remedies and their potencies, including both homeopathic and biochemic remedies.

Homeopathic Remedies:

Identify all prescribed homeopathic remedies and their potencies (e.g., 30, 200c, 1M). These are often abbreviated.

Interpret the abbreviations to their full remedy names. For example:

Arn -> Arnica
Bry -> Bryonia
Aco -> Aconitum Napellus
Ruta -> Ruta Graveolens
Phyto -> Phytolacca
Sulfo or Sul -> Sulphur
fp -> Ferrum Phosphoricum
NM -> Natrum Muriaticum
Chame -> Chamomilla

Pay close attention to remedies prescribed in combination, such as "Aco Bry 30", which should be interpreted as "Aconitum Napellus 30, Bryonia 30".

If you see "SL", it refers to "Sac Lac" (Sugar of Milk). Note its presence in the prescription string.

Biochemic Remedies:

Identify any biochemic remedies. These are often indicated by the word "mouth" or have potencies ending in 'x' (e.g., 6x, 12x).

Interpret the abbreviations for these remedies. For example:

mp6x -> Magnesia Phosphorica 6x
np6x -> Natrum Phosphoricum 6x
kp6x or KPCF6x -> Kali Phosphoricum 6x

Combine all remedies (homeopathic and biochemic) into a single, comma-separated string in the prescription field.

Example:

If the prescription shows:

Patient ID: 12345

Remedies: Arn 30, and next to the word "mouth" is mp6x.

Your output should be:

{
  "patient_id": "12345",
  "prescription": "Arnica 30, Magnesia Phosphorica 6x"
}

Now, analyze the provided medical document image and return only the JSON object with the extracted information."#;

/// Result of one image analysis call
#[derive(Debug, Clone, Serialize)]
pub struct ImageAnalysis {
    pub analysis_date: String,
    pub patient_id: String,
    pub prescription: String,
}

/// Send a prescription image to the vision model and extract the
/// patient id and remedy list from its reply.
///
/// Never fails: an upstream error degrades to a well-formed result
/// with `"Analysis failed"` as the id and the error text as the
/// prescription, and an unparseable reply degrades to the
/// `"Not found"` sentinels.
pub async fn analyze_image(client: &GeminiClient, mime_type: &str, image: &[u8]) -> ImageAnalysis {
    let analysis_date = Local::now().format("%Y-%m-%d").to_string();

    let reply = match client.generate_vision(EXTRACTION_PROMPT, mime_type, image).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(error = %e, "Vision analysis call failed");
            return ImageAnalysis {
                analysis_date,
                patient_id: "Analysis failed".to_string(),
                prescription: format!("Error occurred during analysis: {}", e),
            };
        }
    };

    let extraction = parse_model_reply(&reply);
    match &extraction {
        Extraction::Parsed(_) => {}
        Extraction::FallbackParsed(_) => {
            tracing::warn!("Model reply was not valid JSON, fields recovered by regex");
        }
        Extraction::NotFound => {
            tracing::warn!(reply_len = reply.len(), "No prescription fields found in model reply");
        }
    }

    let (patient_id, prescription) = extraction.into_fields();
    ImageAnalysis {
        analysis_date,
        patient_id,
        prescription,
    }
}
