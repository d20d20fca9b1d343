//! Prescription extraction through an external multimodal model.
//!
//! The model receives the image, a fixed instruction and a strict response
//! schema, and returns JSON text. Everything beyond shaping that request and
//! parsing the answer is delegated to the provider.

pub mod client;
pub mod gemini;
pub mod payload;
pub mod prompt;
pub mod provider;

pub use client::{parse_response, Extractor};
pub use gemini::GeminiClient;
pub use payload::ImagePayload;
pub use provider::{GenerationRequest, GenerativeModel};
