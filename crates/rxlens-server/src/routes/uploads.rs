//! Image upload routes: temporary storage and server-side extraction.

use std::sync::Arc;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use rxlens_core::Error;
use rxlens_extract::ImagePayload;
use tracing::{error, info, warn};

use crate::media::{extension_for_mime, image_mime};
use crate::state::AppState;

const IMAGE_FIELD: &str = "image";
const NO_IMAGE: &str = "No image uploaded";
const NOT_AN_IMAGE: &str = "Only image files are allowed";
const PROCESSING_FAILED: &str =
    "Failed to process prescription. Please try again with a clearer image.";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/process-prescription", post(process_prescription))
        .route("/extract", post(extract_prescription))
}

/// An image read from the `image` multipart field.
struct UploadedImage {
    filename: Option<String>,
    mime: String,
    bytes: Vec<u8>,
}

enum UploadError {
    Missing,
    NotAnImage,
    Read(Error),
}

impl From<MultipartError> for UploadError {
    fn from(e: MultipartError) -> Self {
        let message = e.body_text();
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::Read(Error::PayloadTooLarge(message))
        } else {
            UploadError::Read(Error::Validation(message))
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match self {
            UploadError::Missing => upload_error(StatusCode::BAD_REQUEST, NO_IMAGE, "VALIDATION"),
            UploadError::NotAnImage => {
                upload_error(StatusCode::BAD_REQUEST, NOT_AN_IMAGE, "VALIDATION")
            }
            UploadError::Read(e) => {
                warn!("Upload read failed: {} ({})", e, e.kind());
                upload_error(super::status_for(&e), &e.to_string(), e.kind())
            }
        }
    }
}

/// `{ status: "error", error, errors: [error], kind }` body used by the upload endpoints.
fn upload_error(status: StatusCode, message: &str, kind: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "status": "error",
            "error": message,
            "errors": [message],
            "kind": kind,
        })),
    )
        .into_response()
}

async fn read_image(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadedImage, UploadError> {
    let mut multipart = multipart.map_err(|_| UploadError::Missing)?;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(UploadError::Missing),
            Err(e) => return Err(e.into()),
        };
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(String::from);
        let declared = field.content_type().map(String::from);
        let bytes = field.bytes().await?;

        if bytes.is_empty() {
            return Err(UploadError::Missing);
        }
        let mime = image_mime(declared.as_deref(), filename.as_deref())
            .ok_or(UploadError::NotAnImage)?;

        return Ok(UploadedImage {
            filename,
            mime,
            bytes: bytes.to_vec(),
        });
    }
}

/// POST /api/process-prescription: accept an image for later processing.
async fn process_prescription(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let image = match read_image(multipart).await {
        Ok(image) => image,
        Err(e) => return e.into_response(),
    };

    let ext = extension_for_mime(&image.mime).unwrap_or("img");
    let temp_name = format!("{}.{}", uuid::Uuid::new_v4(), ext);
    let temp_path = state.config.data_paths.uploads.join(&temp_name);

    if let Err(e) = std::fs::write(&temp_path, &image.bytes) {
        error!("Failed to store upload {}: {}", temp_path.display(), e);
        return upload_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Failed to store upload: {}", e),
            "STORE_IO",
        );
    }

    info!(
        "Stored upload {} ({} bytes) as {}",
        image.filename.as_deref().unwrap_or("<unnamed>"),
        image.bytes.len(),
        temp_name
    );

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "success",
            "message": "Image uploaded successfully",
            "temp_path": temp_path.to_string_lossy(),
        })),
    )
        .into_response()
}

/// POST /api/extract: run the Extraction Client on an uploaded image.
async fn extract_prescription(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let Some(extractor) = state.extractor.as_ref() else {
        return upload_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Extraction is not configured",
            "CONFIG",
        );
    };

    let image = match read_image(multipart).await {
        Ok(image) => image,
        Err(e) => return e.into_response(),
    };

    match extractor
        .extract(&ImagePayload::Bytes(image.bytes), &image.mime)
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            error!("Extraction with {} failed: {}", extractor.model_name(), e);
            let status = super::status_for(&e);
            let message = if e.is_extraction_failure() {
                PROCESSING_FAILED.to_string()
            } else {
                e.to_string()
            };
            upload_error(status, &message, e.kind())
        }
    }
}
