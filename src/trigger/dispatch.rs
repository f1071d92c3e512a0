use reqwest::header::{ACCEPT, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::TriggerConfig;

const DISPATCH_TIMEOUT: Duration = Duration::from_secs(20);
const GITHUB_JSON: &str = "application/vnd.github+json";
const CLIENT_AGENT: &str = concat!("castpage/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("GH_TOKEN is not set")]
    MissingToken,
    #[error("Dispatch request timed out after 20s")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-2xx from the CI API; `body` is the upstream response text.
    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },
}

impl DispatchError {
    /// Text reported to the endpoint caller. Upstream failures pass their body through verbatim.
    pub fn detail(&self) -> String {
        match self {
            DispatchError::Upstream { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct DispatchRequest<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
}

/// Starts a CI workflow run through the `workflow_dispatch` API.
pub struct WorkflowDispatcher {
    client: reqwest::Client,
    endpoint: String,
    git_ref: String,
    token: Option<SecretString>,
}

impl WorkflowDispatcher {
    pub fn new(client: reqwest::Client, config: &TriggerConfig, token: Option<SecretString>) -> Self {
        let endpoint = format!(
            "{}/repos/{}/actions/workflows/{}/dispatches",
            config.api_base.trim_end_matches('/'),
            config.repo,
            config.workflow
        );
        Self {
            client,
            endpoint,
            git_ref: config.git_ref.clone(),
            token,
        }
    }

    /// Token from `GH_TOKEN`, falling back to the config file.
    pub fn from_env(client: reqwest::Client, config: &TriggerConfig) -> Self {
        let token = std::env::var("GH_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| config.token.clone())
            .map(SecretString::from);
        if token.is_none() {
            tracing::warn!("No dispatch token configured; trigger requests will fail");
        }
        Self::new(client, config, token)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends one dispatch request. Not retried.
    pub async fn dispatch(&self) -> Result<(), DispatchError> {
        let token = self.token.as_ref().ok_or(DispatchError::MissingToken)?;

        let request = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, GITHUB_JSON)
            .header(USER_AGENT, CLIENT_AGENT)
            .header("Authorization", format!("Bearer {}", token.expose_secret()))
            .json(&DispatchRequest {
                git_ref: &self.git_ref,
            });

        let response = tokio::time::timeout(DISPATCH_TIMEOUT, request.send())
            .await
            .map_err(|_| DispatchError::Timeout)??;

        let status = response.status();
        if status.is_success() {
            tracing::info!(endpoint = %self.endpoint, git_ref = %self.git_ref, "Workflow dispatched");
            return Ok(());
        }

        let reason = status.canonical_reason().unwrap_or("Unknown status");
        let body = match response.text().await {
            Ok(body) if !body.trim().is_empty() => body,
            Ok(_) => reason.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read dispatch error body");
                reason.to_string()
            }
        };
        tracing::warn!(status = status.as_u16(), "Workflow dispatch rejected");
        Err(DispatchError::Upstream {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_base: &str) -> TriggerConfig {
        TriggerConfig {
            api_base: api_base.to_string(),
            repo: "acme/show".to_string(),
            workflow: "publish.yml".to_string(),
            ..TriggerConfig::default()
        }
    }

    #[test]
    fn test_endpoint_format() {
        let dispatcher = WorkflowDispatcher::new(
            reqwest::Client::new(),
            &config("https://api.example.com/"),
            None,
        );
        assert_eq!(
            dispatcher.endpoint(),
            "https://api.example.com/repos/acme/show/actions/workflows/publish.yml/dispatches"
        );
    }

    #[tokio::test]
    async fn test_dispatch_sends_ref_and_auth() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/show/actions/workflows/publish.yml/dispatches"))
            .and(header("Authorization", "Bearer ghp_test"))
            .and(header("Accept", GITHUB_JSON))
            .and(body_json(serde_json::json!({ "ref": "main" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dispatcher = WorkflowDispatcher::new(
            reqwest::Client::new(),
            &config(&mock_server.uri()),
            Some(SecretString::from("ghp_test")),
        );
        dispatcher.dispatch().await.unwrap();
    }

    #[tokio::test]
    async fn test_upstream_error_body_passed_through() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("Unexpected inputs provided"))
            .mount(&mock_server)
            .await;

        let dispatcher = WorkflowDispatcher::new(
            reqwest::Client::new(),
            &config(&mock_server.uri()),
            Some(SecretString::from("ghp_test")),
        );
        let err = dispatcher.dispatch().await.unwrap_err();
        assert!(matches!(err, DispatchError::Upstream { status: 422, .. }));
        assert_eq!(err.detail(), "Unexpected inputs provided");
    }

    #[tokio::test]
    async fn test_empty_upstream_body_reports_status_text() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let dispatcher = WorkflowDispatcher::new(
            reqwest::Client::new(),
            &config(&mock_server.uri()),
            Some(SecretString::from("ghp_test")),
        );
        let err = dispatcher.dispatch().await.unwrap_err();
        assert!(matches!(err, DispatchError::Upstream { status: 503, .. }));
        assert_eq!(err.detail(), "Service Unavailable");
    }

    #[tokio::test]
    async fn test_missing_token_makes_no_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&mock_server)
            .await;

        let dispatcher =
            WorkflowDispatcher::new(reqwest::Client::new(), &config(&mock_server.uri()), None);
        let err = dispatcher.dispatch().await.unwrap_err();
        assert!(matches!(err, DispatchError::MissingToken));
    }
}
