//! Provider seam for the extraction call.

use futures::future::BoxFuture;
use rxlens_core::Result;

/// One structured-output request: an instruction, one inline image and the
/// schema the answer must follow.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Base64 image body, without any data-URL prefix.
    pub image_base64: String,
    pub mime_type: String,
    pub response_schema: serde_json::Value,
}

/// A multimodal model that can answer a [`GenerationRequest`].
///
/// Returns `Ok(None)` when the provider answered without any text.
pub trait GenerativeModel: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<Option<String>>>;

    /// Model identifier for logs.
    fn model_name(&self) -> &str;
}
