//! Extraction Client: one structured-output call per image.

use std::sync::Arc;

use tracing::{info, warn};

use rxlens_core::{Error, ExtractionResult, Result};

use crate::payload::ImagePayload;
use crate::prompt::{response_schema, EXTRACTION_PROMPT};
use crate::provider::{GenerationRequest, GenerativeModel};

/// Turns prescription images into [`ExtractionResult`]s.
///
/// The provider is trusted to honour the response schema; the only local
/// checks are that some text came back and that it deserializes into the
/// typed result. Failed calls are not retried.
#[derive(Clone)]
pub struct Extractor {
    model: Arc<dyn GenerativeModel>,
}

impl Extractor {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub async fn extract(&self, image: &ImagePayload, mime_type: &str) -> Result<ExtractionResult> {
        let (image_base64, mime_type) = image.encode(mime_type)?;

        let request = GenerationRequest {
            prompt: EXTRACTION_PROMPT.to_string(),
            image_base64,
            mime_type,
            response_schema: response_schema(),
        };

        let text = match self.model.generate(&request).await? {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                warn!("Model {} returned no text", self.model.model_name());
                return Err(Error::AiEmptyResponse);
            }
        };

        let result = parse_response(&text)?;
        info!(
            "Extracted {} medication(s), status={:?}, confidence={:.2}",
            result.medications.len(),
            result.status,
            result.confidence
        );
        Ok(result)
    }
}

/// Parse the model's JSON text, tolerating a surrounding Markdown code fence.
pub fn parse_response(text: &str) -> Result<ExtractionResult> {
    let trimmed = strip_code_fence(text.trim());
    if trimmed.is_empty() {
        return Err(Error::AiEmptyResponse);
    }
    serde_json::from_str(trimmed).map_err(|e| Error::AiParse(e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
