// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /predict tests
//!
//! Requests go straight into the router with `oneshot`; the predictor is a
//! counting fake so cache behaviour and error mapping can be observed.

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use handwriting_ocr_node::{
    api::{create_router, AppState},
    config::UploadConfig,
    vision::Predictor,
    PredictionCache,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::common::{png_bytes, CountingPredictor};

const BOUNDARY: &str = "----hwr-test-boundary";

/// Build a single-part multipart body
fn multipart(field: &str, filename: Option<&str>, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    let disposition = match filename {
        Some(name) => format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            field, name
        ),
        None => format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", field),
    };
    body.extend_from_slice(disposition.as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn predict_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn upload_config(dir: &Path) -> UploadConfig {
    UploadConfig {
        dir: dir.join("uploads"),
        ..UploadConfig::default()
    }
}

fn router_with(predictor: Arc<CountingPredictor>, upload: UploadConfig) -> Router {
    let predictor: Arc<dyn Predictor> = predictor;
    create_router(AppState::new(predictor, PredictionCache::new(16), upload))
}

#[tokio::test]
async fn test_predict_success() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = Arc::new(CountingPredictor::new("Hello World"));
    let router = router_with(predictor.clone(), upload_config(dir.path()));

    let body = multipart("file", Some("my note.png"), &png_bytes(20, 10));
    let (status, json) = send(&router, predict_request("/predict", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["recognized_text"], "Hello World");
    assert_eq!(json["cache_hit"], false);
    assert!(json.get("trace").is_none());

    // Saved under a timestamped, sanitized name
    let seen = predictor.seen();
    let name = seen[0].file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.ends_with("_my_note.png"), "unexpected name {}", name);
}

#[tokio::test]
async fn test_upload_removed_after_request() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = Arc::new(CountingPredictor::new("text"));
    let router = router_with(predictor.clone(), upload_config(dir.path()));

    let body = multipart("file", Some("scan.jpg"), &png_bytes(20, 10));
    let (status, _) = send(&router, predict_request("/predict", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(!predictor.seen()[0].exists());
    let leftovers = std::fs::read_dir(dir.path().join("uploads")).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_identical_upload_hits_cache() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = Arc::new(CountingPredictor::new("cached words"));
    let router = router_with(predictor.clone(), upload_config(dir.path()));
    let image = png_bytes(24, 12);

    let (_, first) = send(
        &router,
        predict_request("/predict", multipart("file", Some("a.png"), &image)),
    )
    .await;
    // Same bytes under another name
    let (status, second) = send(
        &router,
        predict_request("/predict", multipart("file", Some("b.bmp"), &image)),
    )
    .await;

    assert_eq!(first["cache_hit"], false);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["cache_hit"], true);
    assert_eq!(second["recognized_text"], "cached words");
    assert_eq!(predictor.calls(), 1);
}

#[tokio::test]
async fn test_missing_file_part() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = Arc::new(CountingPredictor::new("unused"));
    let router = router_with(predictor.clone(), upload_config(dir.path()));

    let body = multipart("note", None, b"just text");
    let (status, json) = send(&router, predict_request("/predict", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "No file part in the request");
    assert_eq!(predictor.calls(), 0);
}

#[tokio::test]
async fn test_empty_filename() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = Arc::new(CountingPredictor::new("unused"));
    let router = router_with(predictor, upload_config(dir.path()));

    let body = multipart("file", Some(""), b"");
    let (status, json) = send(&router, predict_request("/predict", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No file selected");
}

#[tokio::test]
async fn test_invalid_extension() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = Arc::new(CountingPredictor::new("unused"));
    let router = router_with(predictor.clone(), upload_config(dir.path()));

    let body = multipart("file", Some("notes.gif"), b"GIF89a");
    let (status, json) = send(&router, predict_request("/predict", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["error"],
        "Invalid file type. Allowed types: png, jpg, jpeg, bmp"
    );
    assert_eq!(predictor.calls(), 0);
}

#[tokio::test]
async fn test_predictor_failure_is_500() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = Arc::new(CountingPredictor::failing());
    let router = router_with(predictor, upload_config(dir.path()));

    let body = multipart("file", Some("scan.png"), &png_bytes(20, 10));
    let (status, json) = send(&router, predict_request("/predict", body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    let error = json["error"].as_str().unwrap();
    assert!(error.starts_with("Error processing image: "), "{}", error);
    assert!(error.contains("engine crashed"));
}

#[tokio::test]
async fn test_failed_predictions_are_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = Arc::new(CountingPredictor::failing());
    let router = router_with(predictor.clone(), upload_config(dir.path()));
    let image = png_bytes(20, 10);

    for _ in 0..2 {
        let body = multipart("file", Some("scan.png"), &image);
        send(&router, predict_request("/predict", body)).await;
    }
    assert_eq!(predictor.calls(), 2);
}

#[tokio::test]
async fn test_save_failure_is_500() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the upload directory should be
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();
    let upload = UploadConfig {
        dir: blocker.join("uploads"),
        ..UploadConfig::default()
    };

    let predictor = Arc::new(CountingPredictor::new("unused"));
    let router = router_with(predictor.clone(), upload);

    let body = multipart("file", Some("scan.png"), &png_bytes(20, 10));
    let (status, json) = send(&router, predict_request("/predict", body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to save uploaded file: "));
    assert_eq!(predictor.calls(), 0);
}

#[tokio::test]
async fn test_debug_query_includes_trace() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = Arc::new(CountingPredictor::new("traced"));
    let router = router_with(predictor, upload_config(dir.path()));

    let body = multipart("file", Some("scan.png"), &png_bytes(20, 10));
    let (status, json) = send(&router, predict_request("/predict?debug=true", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["trace"][0]["strategy"], "original_mag1.5");
    assert_eq!(json["trace"][0]["text"], "traced");
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let upload = UploadConfig {
        max_bytes: 1024,
        ..upload_config(dir.path())
    };
    let predictor = Arc::new(CountingPredictor::new("unused"));
    let router = router_with(predictor.clone(), upload);

    let body = multipart("file", Some("big.png"), &vec![0u8; 8 * 1024]);
    let response = router
        .clone()
        .oneshot(predict_request("/predict", body))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert_eq!(predictor.calls(), 0);
}
