//! Result Store routes: append and list stored prescription records.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rxlens_core::{Error, StoragePayload};
use serde::Deserialize;
use tracing::info;

use super::error_response;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/prescriptions", get(list_prescriptions).post(store_prescription))
}

#[derive(Deserialize)]
struct StoreRequest {
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// POST /api/prescriptions: append `{ data }` to the Result Store.
async fn store_prescription(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StoreRequest>, JsonRejection>,
) -> Response {
    let data = match body {
        Ok(Json(StoreRequest { data: Some(data) })) if !data.is_null() => data,
        Ok(_) => {
            return error_response(&Error::Validation("No data provided".into())).into_response()
        }
        Err(rejection) => {
            return error_response(&Error::Validation(rejection.body_text())).into_response()
        }
    };

    let payload = match StoragePayload::from_value(data) {
        Ok(p) => p,
        Err(e) => return error_response(&e).into_response(),
    };

    match state.store.append(payload) {
        Ok(record) => {
            info!("Stored prescription record {}", record.id);
            (
                StatusCode::OK,
                Json(serde_json::json!({ "success": true, "id": record.id })),
            )
                .into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

/// GET /api/prescriptions: full record history in append order.
async fn list_prescriptions(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list() {
        Ok(records) => Json(records).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}
