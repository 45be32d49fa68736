//! HTTP client for the agent endpoint.

use crate::agent::request::AgentRequest;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("agent request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("agent api error: {status} {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("agent reply is not valid JSON: {0}")]
    Body(#[from] serde_json::Error),
}

impl AgentError {
    /// True when the request timed out before a response arrived.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AgentError::Request(e) if e.is_timeout())
    }
}

/// Client for the agent endpoint (one POST per inbound message).
#[derive(Clone)]
pub struct AgentClient {
    url: String,
    app_name: String,
    client: reqwest::Client,
}

impl AgentClient {
    pub fn new(
        url: impl Into<String>,
        app_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            app_name: app_name.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `appName` to put on every request.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// POST the request and return the reply as untyped JSON. Non-2xx and unparsable bodies are errors.
    pub async fn send(&self, request: &AgentRequest) -> Result<serde_json::Value, AgentError> {
        let res = self.client.post(&self.url).json(request).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(AgentError::Status { status, body });
        }
        let bytes = res.bytes().await?;
        let reply = serde_json::from_slice(&bytes)?;
        Ok(reply)
    }
}
