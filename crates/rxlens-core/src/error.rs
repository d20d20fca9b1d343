//! Error types for RxLens.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Store corrupt: {0}")]
    StoreCorrupt(String),

    #[error("Storage error: {0}")]
    StoreIo(String),

    #[error("No response from AI model")]
    AiEmptyResponse,

    #[error("Failed to parse AI response: {0}")]
    AiParse(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable kind tag reported alongside error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION",
            Error::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Error::NotFound(_) => "NOT_FOUND",
            Error::AccessDenied(_) => "ACCESS_DENIED",
            Error::StoreCorrupt(_) | Error::Json(_) => "STORE_CORRUPT",
            Error::StoreIo(_) | Error::Io(_) => "STORE_IO",
            Error::AiEmptyResponse => "AI_EMPTY_RESPONSE",
            Error::AiParse(_) => "AI_PARSE_ERROR",
            Error::Http(_) => "HTTP",
            Error::Config(_) => "CONFIG",
        }
    }

    /// Failures of the extraction call itself (as opposed to local storage).
    pub fn is_extraction_failure(&self) -> bool {
        matches!(self, Error::AiEmptyResponse | Error::AiParse(_) | Error::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
