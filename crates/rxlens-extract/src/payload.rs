//! Image payload normalisation.

use base64::Engine as _;
use rxlens_core::{Error, Result};

/// Image as received from a caller.
#[derive(Debug, Clone)]
pub enum ImagePayload {
    /// Raw file bytes.
    Bytes(Vec<u8>),
    /// `data:<mime>;base64,<body>` string, or a bare base64 body.
    DataUrl(String),
}

impl ImagePayload {
    /// Base64 body and effective MIME type for transmission.
    ///
    /// A data URL's own MIME type is used when `declared_mime` is empty.
    pub fn encode(&self, declared_mime: &str) -> Result<(String, String)> {
        let declared = declared_mime.trim();

        let (data, mime) = match self {
            ImagePayload::Bytes(bytes) => {
                if bytes.is_empty() {
                    return Err(Error::Validation("image is empty".into()));
                }
                (
                    base64::engine::general_purpose::STANDARD.encode(bytes),
                    declared.to_string(),
                )
            }
            ImagePayload::DataUrl(url) => {
                let (url_mime, body) = split_data_url(url)?;
                let mime = if declared.is_empty() { url_mime } else { declared };
                (body.to_string(), mime.to_string())
            }
        };

        if data.is_empty() {
            return Err(Error::Validation("image is empty".into()));
        }
        if mime.is_empty() {
            return Err(Error::Validation("image MIME type is missing".into()));
        }
        Ok((data, mime))
    }
}

/// Split a data URL into (mime, base64 body). Bare bodies pass through.
fn split_data_url(url: &str) -> Result<(&str, &str)> {
    let url = url.trim();
    let Some(rest) = url.strip_prefix("data:") else {
        return Ok(("", url));
    };

    let (header, body) = rest
        .split_once(',')
        .ok_or_else(|| Error::Validation("malformed data URL".into()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| Error::Validation("data URL is not base64-encoded".into()))?;
    Ok((mime, body))
}
