//! HTTP API Tests
//!
//! Exercises the router in-process with `tower::ServiceExt::oneshot`.

mod helpers;

use agro_ai::api::identify::{IdentifyResponse, IdentifyStateResponse};
use agro_ai::catalog::CropCatalog;
use agro_ai::classifier::ImageClassifier;
use agro_ai::resolver::CropResolver;
use agro_ai::tracker::IdentificationTracker;
use agro_ai::{build_router, AppState};
use agro_common::events::EventBus;
use agro_common::identification::FALLBACK_ADVISORY;
use agro_common::ClassifierErrorKind;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use helpers::{obs, FailingClassifier, FixedClassifier};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app_with(classifier: Arc<dyn ImageClassifier>) -> Router {
    let catalog = Arc::new(CropCatalog::default());
    let resolver = Arc::new(CropResolver::new(classifier, catalog.clone()));
    let event_bus = EventBus::new(100);
    let tracker = Arc::new(IdentificationTracker::new(resolver, event_bus.clone()));
    build_router(AppState::new(tracker, catalog, event_bus))
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_identify(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/identify")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = app_with(FixedClassifier::new(vec![]));

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "agro-ai");
    assert!(json.get("last_error").is_none());
}

#[tokio::test]
async fn test_crops_in_declaration_order() {
    let app = app_with(FixedClassifier::new(vec![]));

    let response = app.oneshot(get("/crops")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["alface", "mandioca", "tomate", "cenoura", "milho"]);
    assert_eq!(json[0]["displayName"], "Alface");
}

#[tokio::test]
async fn test_identify_resolved() {
    let app = app_with(FixedClassifier::new(vec![obs("cassava", 0.65)]));

    let response = app
        .oneshot(post_identify(json!({"image": "https://example.com/field.jpg"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: IdentifyResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(!body.degraded);
    assert!(body.error.is_none());
    assert_eq!(body.result.crop_id, "mandioca");
    assert_eq!(body.result.crop_name, "Mandioca");
    assert_eq!(body.result.confidence, 0.65);
}

#[tokio::test]
async fn test_identify_wire_uses_camel_case() {
    let app = app_with(FixedClassifier::new(vec![obs("carrot", 0.5)]));

    let response = app
        .oneshot(post_identify(json!({"image": "https://example.com/carrot.jpg"})))
        .await
        .unwrap();

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["result"]["cropId"], "cenoura");
    assert_eq!(json["result"]["cropName"], "Cenoura");
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_identify_degraded_still_succeeds() {
    let app = app_with(FailingClassifier::unavailable());

    let response = app
        .oneshot(post_identify(json!({"image": "https://example.com/field.jpg"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: IdentifyResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(body.degraded);
    assert_eq!(body.result.crop_id, "alface");
    assert_eq!(body.result.confidence, 0.3);

    let error = body.error.unwrap();
    assert_eq!(error.kind, ClassifierErrorKind::ModelUnavailable);
    assert_eq!(error.message, FALLBACK_ADVISORY);
}

#[tokio::test]
async fn test_identify_rejects_empty_image() {
    let classifier = FixedClassifier::new(vec![obs("corn", 0.9)]);
    let app = app_with(classifier.clone());

    let response = app
        .oneshot(post_identify(json!({"image": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert_eq!(classifier.calls(), 0, "Classifier must not run for a bad reference");
}

#[tokio::test]
async fn test_identify_rejects_bad_data_url() {
    let app = app_with(FixedClassifier::new(vec![]));

    let response = app
        .oneshot(post_identify(json!({"image": "data:image/png;base64,@@not-base64@@"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_identify_rejects_local_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("secret.jpg");
    std::fs::write(&path, b"not for upload").unwrap();

    let classifier = FixedClassifier::new(vec![obs("corn", 0.9)]);
    let app = app_with(classifier.clone());

    for image in [path.display().to_string(), "/etc/hostname".to_string()] {
        let response = app
            .clone()
            .oneshot(post_identify(json!({ "image": image })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    assert_eq!(classifier.calls(), 0, "Local files must never reach the classifier");
}

#[tokio::test]
async fn test_identify_accepts_data_url() {
    let classifier = FixedClassifier::new(vec![obs("maize", 0.8)]);
    let app = app_with(classifier.clone());

    let response = app
        .oneshot(post_identify(json!({"image": "data:image/jpeg;base64,/9j/4AAQ"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: IdentifyResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.result.crop_id, "milho");
    assert_eq!(classifier.calls(), 1);
}

#[tokio::test]
async fn test_identify_state_reflects_last_failure() {
    let app = app_with(FailingClassifier::unavailable());

    let response = app.clone().oneshot(get("/identify/state")).await.unwrap();
    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["isLoading"], false);
    assert!(json["lastError"].is_null());

    app.clone()
        .oneshot(post_identify(json!({"image": "https://example.com/x.jpg"})))
        .await
        .unwrap();

    let response = app.oneshot(get("/identify/state")).await.unwrap();
    let state: IdentifyStateResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(!state.is_loading);
    assert_eq!(state.last_error.as_deref(), Some(FALLBACK_ADVISORY));
}

#[tokio::test]
async fn test_health_reports_last_error() {
    let app = app_with(FailingClassifier::unavailable());

    app.clone()
        .oneshot(post_identify(json!({"image": "https://example.com/x.jpg"})))
        .await
        .unwrap();

    let response = app.oneshot(get("/health")).await.unwrap();
    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["last_error"], FALLBACK_ADVISORY);
}
