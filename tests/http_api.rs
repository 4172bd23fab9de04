//! HTTP surface tests
//!
//! Exercise the axum router in-process with `oneshot`; collaborators are the
//! in-memory doubles.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use firebase_push_service::config::Settings;
use firebase_push_service::notification::{PresetDefinition, ServiceConfig};
use firebase_push_service::provider::{MockBlobStorage, MockMessagingProvider};
use firebase_push_service::server::{create_app, AppState, API_KEY_HEADER};

const API_KEY: &str = "test-api-key";

struct TestApp {
    app: Router,
    provider: Arc<MockMessagingProvider>,
    storage: Arc<MockBlobStorage>,
}

fn test_app_with(provider: MockMessagingProvider, settings_json: &str) -> TestApp {
    let provider = Arc::new(provider);
    let storage = Arc::new(MockBlobStorage::new());
    let config = ServiceConfig::new(provider.clone())
        .with_storage(storage.clone(), "push-test-bucket")
        .with_default_targets(["T1", "T2"])
        .with_preset(PresetDefinition {
            name: "alert".to_string(),
            title: "Alert: <<alert_type>>".to_string(),
            body: "This is an alert about <<alert_details>>.".to_string(),
            image_url: None,
        });

    let settings = Settings::from_json(settings_json).unwrap();
    let app = create_app(AppState::new(settings, config));

    TestApp {
        app,
        provider,
        storage,
    }
}

fn test_app() -> TestApp {
    test_app_with(
        MockMessagingProvider::new(),
        &json!({ "api": { "key": API_KEY } }).to_string(),
    )
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(API_KEY_HEADER, API_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

mod command {
    use super::*;

    #[tokio::test]
    async fn send_to_defaults() {
        let test = test_app();

        let (status, body) = call(
            &test.app,
            post(
                "/api/v1/command",
                json!({ "command": "send", "title": "Hello", "body": "Test" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "success": true, "sent_count": 2, "failed_count": 0, "sent_to_tokens": 2 })
        );
    }

    #[tokio::test]
    async fn preset_with_numeric_variable() {
        let test = test_app();

        let (status, body) = call(
            &test.app,
            post(
                "/api/v1/command",
                json!({
                    "command": "send",
                    "preset": "alert",
                    "template_vars": { "alert_type": "Motion", "alert_details": 3 },
                    "fcm_tokens": "T3"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sent_to_tokens"], 1);

        let sent = test.provider.sent().await;
        assert_eq!(sent[0].0, "T3");
        assert_eq!(sent[0].1.title, "Alert: Motion");
        assert_eq!(sent[0].1.body, "This is an alert about 3.");
    }

    #[tokio::test]
    async fn missing_command() {
        let test = test_app();

        let (status, body) = call(&test.app, post("/api/v1/command", json!({ "title": "Hello" }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["message"], "Missing 'command' field in request");
    }

    #[tokio::test]
    async fn unknown_command() {
        let test = test_app();

        let (status, body) = call(&test.app, post("/api/v1/command", json!({ "command": "ping" }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Unknown command: ping");
    }

    #[tokio::test]
    async fn validation_error_is_not_a_summary() {
        let test = test_app();

        let (status, body) = call(
            &test.app,
            post("/api/v1/command", json!({ "command": "send", "preset": "nope" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("sent_count").is_none());
        assert_eq!(body["error"]["message"], "unknown preset");
        assert_eq!(test.provider.attempts(), 0);
    }

    #[tokio::test]
    async fn partial_failure_reports_counts() {
        let test = test_app_with(
            MockMessagingProvider::failing(["T2"]),
            &json!({ "api": { "key": API_KEY } }).to_string(),
        );

        let (status, body) = call(
            &test.app,
            post(
                "/api/v1/command",
                json!({ "command": "send", "title": "Hello", "body": "Test" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["sent_count"], 1);
        assert_eq!(body["failed_count"], 1);
    }

    #[tokio::test]
    async fn media_base64_is_staged_and_released() {
        let test = test_app();

        let (status, body) = call(
            &test.app,
            post(
                "/api/v1/command",
                json!({
                    "command": "send",
                    "title": "Hello",
                    "image_url": "https://img.example/raw.png",
                    "media_base64": "aGVsbG8=",
                    "media_mime_type": "image/png",
                    "fcm_tokens": ["T1"]
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.get("warnings").is_none());

        let uploads = test.storage.uploads().await;
        assert_eq!(uploads.len(), 1);
        assert_eq!(test.storage.deletes().await.len(), 1);
        assert_eq!(
            test.provider.sent().await[0].1.image_url.as_deref(),
            Some(uploads[0].0.signed_url.as_str())
        );
    }

    #[tokio::test]
    async fn invalid_base64() {
        let test = test_app();

        let (status, body) = call(
            &test.app,
            post(
                "/api/v1/command",
                json!({
                    "command": "send",
                    "title": "Hello",
                    "media_base64": "@@@",
                    "media_mime_type": "image/png"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "media_base64 is not valid base64");
    }
}

mod notifications {
    use super::*;

    #[tokio::test]
    async fn full_summary_with_outcomes() {
        let test = test_app_with(
            MockMessagingProvider::failing(["T1"]),
            &json!({ "api": { "key": API_KEY } }).to_string(),
        );

        let (status, body) = call(
            &test.app,
            post("/api/v1/notifications/send", json!({ "title": "Hello", "body": "Test" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_targets"], 2);
        let outcomes = body["outcomes"].as_array().unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0]["index"], 0);
        assert_eq!(outcomes[0]["success"], false);
        assert!(outcomes[0].get("target").is_none());
        assert_eq!(outcomes[1]["success"], true);
    }
}

mod auth {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_is_rejected() {
        let test = test_app();

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/command")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "command": "send" }).to_string()))
            .unwrap();
        let (status, _) = call(&test.app, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(test.provider.attempts(), 0);
    }

    #[tokio::test]
    async fn no_key_configured_allows_requests() {
        let test = test_app_with(MockMessagingProvider::new(), "{}");

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/command")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "command": "send", "title": "Hi", "body": "there" }).to_string(),
            ))
            .unwrap();
        let (status, _) = call(&test.app, request).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn health_is_public() {
        let test = test_app();

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = call(&test.app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["default_targets"], 2);
        assert_eq!(body["provider"], "mock");
    }
}

mod observability {
    use super::*;

    #[tokio::test]
    async fn stats_reflect_dispatches() {
        let test = test_app();

        call(
            &test.app,
            post(
                "/api/v1/command",
                json!({ "command": "send", "title": "Hello", "body": "Test" }),
            ),
        )
        .await;

        let request = Request::builder().uri("/stats").body(Body::empty()).unwrap();
        let (status, body) = call(&test.app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["notifications"]["total_requests"], 1);
        assert_eq!(body["notifications"]["total_sent"], 2);
    }

    #[tokio::test]
    async fn metrics_endpoint() {
        let test = test_app();

        call(
            &test.app,
            post(
                "/api/v1/command",
                json!({ "command": "send", "title": "Hello", "body": "Test" }),
            ),
        )
        .await;

        let response = test
            .app
            .clone()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("push_sends_total"));
    }
}
