use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::dispatch::WorkflowDispatcher;

pub const TRIGGER_PATH: &str = "/api/trigger";

/// JSON body for every trigger response
#[derive(Debug, Serialize)]
struct TriggerResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl TriggerResponse {
    fn message(message: &'static str) -> Self {
        Self {
            message,
            error: None,
        }
    }
}

pub fn router(dispatcher: Arc<WorkflowDispatcher>) -> Router {
    Router::new()
        // Every method is routed here so non-POST gets the JSON 405 body
        .route(TRIGGER_PATH, any(trigger))
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

async fn trigger(State(dispatcher): State<Arc<WorkflowDispatcher>>, method: Method) -> Response {
    if method != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(TriggerResponse::message("Method not allowed")),
        )
            .into_response();
    }

    match dispatcher.dispatch().await {
        Ok(()) => (
            StatusCode::OK,
            Json(TriggerResponse::message("Workflow triggered successfully!")),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to trigger workflow");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TriggerResponse {
                    message: "Failed to trigger workflow",
                    error: Some(e.detail()),
                }),
            )
                .into_response()
        }
    }
}

/// Binds `addr` and serves the trigger endpoint until Ctrl-C.
pub async fn serve(addr: &str, dispatcher: Arc<WorkflowDispatcher>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, path = TRIGGER_PATH, "Trigger endpoint listening");

    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down trigger endpoint");
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TriggerConfig;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn offline_router() -> Router {
        let config = TriggerConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            ..TriggerConfig::default()
        };
        router(Arc::new(WorkflowDispatcher::new(
            reqwest::Client::new(),
            &config,
            None,
        )))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_get_is_405() {
        let response = offline_router()
            .oneshot(Request::get(TRIGGER_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "message": "Method not allowed" })
        );
    }

    #[tokio::test]
    async fn test_put_is_405() {
        let response = offline_router()
            .oneshot(
                Request::builder()
                    .method(Method::PUT)
                    .uri(TRIGGER_PATH)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_missing_token_is_500() {
        let response = offline_router()
            .oneshot(Request::post(TRIGGER_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["message"], "Failed to trigger workflow");
        assert_eq!(json["error"], "GH_TOKEN is not set");
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let response = offline_router()
            .oneshot(Request::post("/api/other").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
