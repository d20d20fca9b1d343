//! Google Gemini `generateContent` provider.
//!
//! Sends the image as inline data and constrains the answer with
//! `responseMimeType: application/json` plus a `responseSchema`.

use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use rxlens_core::{Error, ExtractorConfig, Result};

use crate::provider::{GenerationRequest, GenerativeModel};

pub struct GeminiClient {
    client: Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_base: &str, model: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Build a client from configuration. Fails when no API key is set.
    pub fn from_config(config: &ExtractorConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("GEMINI_API_KEY is not set".into()))?;
        Ok(Self::new(&config.api_base, &config.model, api_key))
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

/// Request body for one structured-output call.
pub fn request_body(request: &GenerationRequest) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "text": request.prompt },
                {
                    "inlineData": {
                        "mimeType": request.mime_type,
                        "data": request.image_base64,
                    }
                }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": request.response_schema,
        }
    })
}

/// Concatenated text parts of the first candidate, if any.
pub fn response_text(body: &Value) -> Option<String> {
    let parts = body["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect();
    (!text.is_empty()).then_some(text)
}

impl GenerativeModel for GeminiClient {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            let url = self.endpoint();
            debug!("Requesting extraction from {} ({})", self.model, request.mime_type);

            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .header("Content-Type", "application/json")
                .json(&request_body(request))
                .send()
                .await
                .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Http(format!("API error {}: {}", status, body)));
            }

            let body: Value = response
                .json()
                .await
                .map_err(|e| Error::AiParse(format!("Invalid provider envelope: {}", e)))?;

            if let Some(reason) = body["promptFeedback"]["blockReason"].as_str() {
                debug!("Extraction prompt blocked: {}", reason);
            }

            Ok(response_text(&body))
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
