//! HTTP contract tests: drive the real router against an in-memory store,
//! a temporary archive directory and a stub extraction model.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures::future::BoxFuture;
use rxlens_core::{ExtractionResult, RxLensConfig};
use rxlens_extract::{Extractor, GenerationRequest, GenerativeModel};
use rxlens_server::{build_router, AppState};
use rxlens_store::MemoryStore;
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "rxlens-test-boundary";

struct StubModel {
    reply: Option<String>,
}

impl GenerativeModel for StubModel {
    fn generate<'a>(
        &'a self,
        _request: &'a GenerationRequest,
    ) -> BoxFuture<'a, rxlens_core::Result<Option<String>>> {
        Box::pin(async move { Ok(self.reply.clone()) })
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

fn sample_result() -> Value {
    json!({
        "status": "success",
        "confidence": 0.93,
        "extracted_text": "Lisinopril 10mg once daily",
        "medications": [{
            "name": "Lisinopril",
            "dosage": "10mg",
            "frequency": "once daily",
            "duration": "30 days",
            "quantity": 30.0,
            "instructions": "Take in the morning",
            "confidence": 0.97
        }],
        "metadata": {
            "prescription_date": "2024-05-02",
            "doctor_name": "Dr. Jane Smith",
            "image_quality": "good",
            "has_handwriting": false
        },
        "errors": []
    })
}

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    _dir: tempfile::TempDir,
}

fn test_app(model_reply: Option<Option<&str>>) -> TestApp {
    test_app_with_limit(model_reply, None)
}

fn test_app_with_limit(
    model_reply: Option<Option<&str>>,
    max_upload_bytes: Option<usize>,
) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = RxLensConfig::with_defaults(dir.path()).unwrap();
    if let Some(limit) = max_upload_bytes {
        config.max_upload_bytes = limit;
    }
    let extractor = model_reply.map(|reply| {
        Extractor::new(Arc::new(StubModel {
            reply: reply.map(String::from),
        }))
    });

    let state = Arc::new(AppState::new(config, Arc::new(MemoryStore::new()), extractor).unwrap());
    TestApp {
        router: build_router(state.clone()),
        state,
        _dir: dir,
    }
}

async fn send(
    app: &TestApp,
    request: Request<Body>,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, headers, body)
}

async fn send_json(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_multipart(
    uri: &str,
    field: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

// ---------------------------------------------------------------
// Health
// ---------------------------------------------------------------

#[tokio::test]
async fn test_health() {
    let app = test_app(None);
    let (status, body) = send_json(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

// ---------------------------------------------------------------
// Result Store
// ---------------------------------------------------------------

#[tokio::test]
async fn test_store_and_list_prescriptions() {
    let app = test_app(None);

    let (status, first) =
        send_json(&app, post_json("/api/prescriptions", json!({ "data": sample_result() }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert!(first["id"].is_i64());

    let (status, second) = send_json(
        &app,
        post_json("/api/prescriptions", json!({ "data": { "note": "entered by hand" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(second["id"].as_i64().unwrap() > first["id"].as_i64().unwrap());

    let (status, list) = send_json(&app, get("/api/prescriptions")).await;
    assert_eq!(status, StatusCode::OK);
    let records = list.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["id"], first["id"]);
    assert_eq!(records[0]["data"], sample_result());
    assert_eq!(records[1]["data"], json!({ "note": "entered by hand" }));
    assert!(records[1]["created_at"].is_string());
}

#[tokio::test]
async fn test_store_keeps_caller_fields() {
    let app = test_app(None);
    let mut sent = sample_result();
    sent["patient_name"] = json!("John Doe");
    sent["source"] = json!("mobile");
    sent["medications"][0]["quantity"] = json!(30);

    let (status, _) =
        send_json(&app, post_json("/api/prescriptions", json!({ "data": sent.clone() }))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = send_json(&app, get("/api/prescriptions")).await;
    assert_eq!(list[0]["data"], sent);
    assert!(list[0]["data"]["medications"][0]["quantity"].is_u64());
}

#[tokio::test]
async fn test_store_rejects_malformed_payloads() {
    let app = test_app(None);

    let bodies = [
        json!({}),
        json!({ "data": null }),
        json!({ "data": 42 }),
        json!({ "data": [1] }),
    ];
    for body in bodies {
        let (status, err) = send_json(&app, post_json("/api/prescriptions", body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(err["kind"], "VALIDATION");
        assert!(err["error"].is_string());
    }

    let mut out_of_range = sample_result();
    out_of_range["confidence"] = json!(3.0);
    let (status, _) =
        send_json(&app, post_json("/api/prescriptions", json!({ "data": out_of_range }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.state.store.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_store_rejects_invalid_json_body() {
    let app = test_app(None);
    let request = Request::builder()
        .method("POST")
        .uri("/api/prescriptions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{oops"))
        .unwrap();
    let (status, err) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "VALIDATION");
}

// ---------------------------------------------------------------
// Archive
// ---------------------------------------------------------------

#[tokio::test]
async fn test_save_list_and_download_result() {
    let app = test_app(None);

    let (status, saved) =
        send_json(&app, post_json("/api/save-result", json!({ "result": sample_result() }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["success"], true);
    assert!(saved["message"].is_string());

    let filename = saved["filename"].as_str().unwrap().to_string();
    let timestamp = filename
        .strip_prefix("prescription_Dr._Jane_Smith_")
        .and_then(|rest| rest.strip_suffix(".json"))
        .unwrap();
    assert_eq!(timestamp.len(), "2024-01-15T10-30-45".len());
    assert!(!timestamp.contains(':') && !timestamp.contains('.'));
    assert!(saved["filepath"].as_str().unwrap().ends_with(&filename));

    let (status, list) = send_json(&app, get("/api/results")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["results"], json!([filename.clone()]));

    let (status, headers, bytes) = send(&app, get(&format!("/api/results/{filename}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert!(headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains(&filename));

    let on_disk = std::fs::read(saved["filepath"].as_str().unwrap()).unwrap();
    assert_eq!(bytes, on_disk);
    let parsed: ExtractionResult = serde_json::from_slice(&bytes).unwrap();
    let expected: ExtractionResult = serde_json::from_value(sample_result()).unwrap();
    assert_eq!(parsed, expected);
}

#[tokio::test]
async fn test_save_result_keeps_caller_fields() {
    let app = test_app(None);
    let mut sent = sample_result();
    sent["patient_name"] = json!("John Doe");
    sent["medications"][0]["quantity"] = json!(30);

    let (status, saved) =
        send_json(&app, post_json("/api/save-result", json!({ "result": sent.clone() }))).await;
    assert_eq!(status, StatusCode::OK);

    let filename = saved["filename"].as_str().unwrap();
    let (status, _, bytes) = send(&app, get(&format!("/api/results/{filename}"))).await;
    assert_eq!(status, StatusCode::OK);
    let back: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(back, sent);
}

#[tokio::test]
async fn test_save_result_requires_result() {
    let app = test_app(None);

    let (status, err) = send_json(&app, post_json("/api/save-result", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "VALIDATION");

    let (status, _) =
        send_json(&app, post_json("/api/save-result", json!({ "result": { "status": "success" } })))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.state.archive.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_save_result_unknown_doctor() {
    let app = test_app(None);
    let mut result = sample_result();
    result["metadata"]["doctor_name"] = json!("");

    let (status, saved) =
        send_json(&app, post_json("/api/save-result", json!({ "result": result }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(saved["filename"]
        .as_str()
        .unwrap()
        .starts_with("prescription_unknown_"));
}

#[tokio::test]
async fn test_download_traversal_and_missing() {
    let app = test_app(None);

    let (status, err) = send_json(&app, get("/api/results/..%2F..%2Fetc%2Fpasswd")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["kind"], "ACCESS_DENIED");

    let (status, err) = send_json(&app, get("/api/results/missing.json")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["kind"], "NOT_FOUND");
}

// ---------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------

#[tokio::test]
async fn test_process_prescription_without_image() {
    let app = test_app(None);

    let request = post_multipart("/api/process-prescription", "note", "a.txt", "text/plain", b"hi");
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["errors"], json!(["No image uploaded"]));
    assert_eq!(body["error"], "No image uploaded");
    assert_eq!(body["kind"], "VALIDATION");

    // Not multipart at all
    let (status, body) =
        send_json(&app, post_json("/api/process-prescription", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"], json!(["No image uploaded"]));
}

#[tokio::test]
async fn test_process_prescription_with_image() {
    let app = test_app(None);

    let png = b"\x89PNG fake";
    let request = post_multipart("/api/process-prescription", "image", "rx.png", "image/png", png);
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let temp_path = body["temp_path"].as_str().unwrap();
    assert!(!temp_path.is_empty());
    assert!(temp_path.ends_with(".png"));
    assert_eq!(std::fs::read(temp_path).unwrap(), png);
}

#[tokio::test]
async fn test_process_prescription_rejects_non_image() {
    let app = test_app(None);

    let request =
        post_multipart("/api/process-prescription", "image", "notes.txt", "text/plain", b"hello");
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"], json!(["Only image files are allowed"]));
}

#[tokio::test]
async fn test_process_prescription_over_upload_limit() {
    let app = test_app_with_limit(None, Some(64));

    let image = vec![0u8; 4096];
    let request =
        post_multipart("/api/process-prescription", "image", "rx.png", "image/png", &image);
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["status"], "error");
    assert_eq!(body["kind"], "PAYLOAD_TOO_LARGE");
    assert!(body["error"].is_string());
    assert_eq!(body["errors"][0], body["error"]);
}

// ---------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------

#[tokio::test]
async fn test_extract_returns_model_result() {
    let reply = sample_result().to_string();
    let app = test_app(Some(Some(&reply)));

    let request = post_multipart("/api/extract", "image", "rx.jpg", "image/jpeg", b"jpeg-bytes");
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, sample_result());
}

#[tokio::test]
async fn test_extract_empty_model_response() {
    let app = test_app(Some(Some("")));

    let request = post_multipart("/api/extract", "image", "rx.jpg", "image/jpeg", b"jpeg-bytes");
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert_eq!(body["kind"], "AI_EMPTY_RESPONSE");
    assert!(body["errors"][0].as_str().unwrap().contains("clearer image"));
}

#[tokio::test]
async fn test_extract_unparsable_model_response() {
    let app = test_app(Some(Some("sorry, no JSON today")));

    let request = post_multipart("/api/extract", "image", "rx.jpg", "image/jpeg", b"jpeg-bytes");
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "AI_PARSE_ERROR");
}

#[tokio::test]
async fn test_extract_not_configured() {
    let app = test_app(None);

    let request = post_multipart("/api/extract", "image", "rx.jpg", "image/jpeg", b"jpeg-bytes");
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "CONFIG");
}
