//! Archive routes: save, list and download individual result files.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rxlens_core::{Error, StoragePayload};
use serde::Deserialize;

use super::error_response;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/save-result", post(save_result))
        .route("/results", get(list_results))
        .route("/results/{filename}", get(download_result))
}

#[derive(Deserialize)]
struct SaveResultRequest {
    #[serde(default)]
    result: Option<serde_json::Value>,
}

/// POST /api/save-result: write `{ result }` to the archive.
async fn save_result(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SaveResultRequest>, JsonRejection>,
) -> Response {
    let value = match body {
        Ok(Json(SaveResultRequest { result: Some(v) })) if !v.is_null() => v,
        Ok(_) => {
            return error_response(&Error::Validation("No result data provided".into()))
                .into_response()
        }
        Err(rejection) => {
            return error_response(&Error::Validation(rejection.body_text())).into_response()
        }
    };

    let saved = match StoragePayload::extraction_from_value(value)
        .and_then(|payload| state.archive.save(&payload))
    {
        Ok(saved) => saved,
        Err(e) => return error_response(&e).into_response(),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "filename": saved.filename,
            "filepath": saved.filepath,
            "message": "Result saved successfully",
        })),
    )
        .into_response()
}

/// GET /api/results: archived file names.
async fn list_results(State(state): State<Arc<AppState>>) -> Response {
    match state.archive.list() {
        Ok(results) => Json(serde_json::json!({ "results": results })).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// GET /api/results/:filename: download one archived file.
async fn download_result(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Response {
    let path = match state.archive.resolve(&filename) {
        Ok(path) => path,
        Err(e) => return error_response(&e).into_response(),
    };
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => return error_response(&Error::from(e)).into_response(),
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().replace('"', ""))
        .unwrap_or_default();

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        bytes,
    )
        .into_response()
}
