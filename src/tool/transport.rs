use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::tool::{JsonMap, ToolRegistry};

/// Raw response of a remote tool call, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP-style status code
    pub status: u16,
    /// Response body as received
    pub body: String,
}

/// Errors raised before a tool response could be received.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// The boundary that carries a `{tool, args}` request to wherever tools run.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Sends `args` as keyword parameters to the named tool.
    async fn call(&self, tool: &str, args: JsonMap) -> Result<TransportResponse, TransportError>;
}

/// Calls tools on a remote tool server: `POST {base}/tools/{name}` with `{"args": ...}`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport for the tool server at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn tool_url(&self, tool: &str) -> String {
        format!("{}/tools/{}", self.base_url, tool)
    }

    /// Fetches the planner-facing catalog from `GET {base}/tools`.
    pub async fn fetch_catalog(&self) -> Result<String, TransportError> {
        let url = format!("{}/tools", self.base_url);
        let inventory: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        inventory
            .get("catalog")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| TransportError::InvalidResponse(format!("{} has no catalog", url)))
    }
}

#[async_trait]
impl ToolTransport for HttpTransport {
    async fn call(&self, tool: &str, args: JsonMap) -> Result<TransportResponse, TransportError> {
        let url = self.tool_url(tool);
        debug!(%url, "Calling remote tool");

        let response = self
            .client
            .post(&url)
            .json(&json!({ "args": args }))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

/// Calls tools in-process, answering exactly as the tool server would.
#[derive(Debug, Clone)]
pub struct LocalTransport {
    registry: Arc<ToolRegistry>,
}

impl LocalTransport {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ToolTransport for LocalTransport {
    async fn call(&self, tool: &str, args: JsonMap) -> Result<TransportResponse, TransportError> {
        let envelope = self.registry.dispatch(tool, args).await;
        Ok(TransportResponse {
            status: 200,
            body: serde_json::to_string(&envelope)?,
        })
    }
}
