//! Integration tests for the workflow trigger endpoint.
//!
//! The router is driven in-process with `oneshot`; the CI API is a wiremock server.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use castpage::config::TriggerConfig;
use castpage::trigger::{router, WorkflowDispatcher, TRIGGER_PATH};

const DISPATCH_PATH: &str = "/repos/AIConvoCast/AIConvoCast/actions/workflows/ai_podcast_pipeline.yml/dispatches";

fn app(api_base: &str) -> Router {
    let config = TriggerConfig {
        api_base: api_base.to_string(),
        ..TriggerConfig::default()
    };
    router(Arc::new(WorkflowDispatcher::new(
        reqwest::Client::new(),
        &config,
        Some(SecretString::from("ghp_integration")),
    )))
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_get_rejected_without_upstream_call() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&upstream)
        .await;

    let (status, body) = call(
        app(&upstream.uri()),
        Request::get(TRIGGER_PATH).body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({ "message": "Method not allowed" }));
}

#[tokio::test]
async fn test_post_dispatches_workflow() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DISPATCH_PATH))
        .and(header("Authorization", "Bearer ghp_integration"))
        .and(header("Accept", "application/vnd.github+json"))
        .and(body_json(json!({ "ref": "main" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&upstream)
        .await;

    let (status, body) = call(
        app(&upstream.uri()),
        Request::post(TRIGGER_PATH).body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Workflow triggered successfully!" }));
}

#[tokio::test]
async fn test_upstream_failure_reports_body() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DISPATCH_PATH))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string(r#"{"message":"Bad credentials","status":"401"}"#),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let (status, body) = call(
        app(&upstream.uri()),
        Request::post(TRIGGER_PATH).body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({
            "message": "Failed to trigger workflow",
            "error": r#"{"message":"Bad credentials","status":"401"}"#,
        })
    );
}
