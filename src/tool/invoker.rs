use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::tool::{JsonMap, ToolTransport, TransportResponse};

/// The normalized outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    /// The tool ran and produced a result mapping
    Success(JsonMap),
    /// The call failed at the transport or inside the tool
    Failure(String),
}

impl ToolResult {
    /// Returns whether the invocation succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success(_))
    }

    /// Returns the result mapping of a successful invocation.
    pub fn payload(&self) -> Option<&JsonMap> {
        match self {
            ToolResult::Success(payload) => Some(payload),
            ToolResult::Failure(_) => None,
        }
    }

    /// Returns the failure reason of a failed invocation.
    pub fn message(&self) -> Option<&str> {
        match self {
            ToolResult::Success(_) => None,
            ToolResult::Failure(message) => Some(message),
        }
    }

    /// Classifies a raw transport response.
    ///
    /// A 200 whose body is a mapping with `status == "error"` is a failure
    /// carrying the body's `message`.
    pub fn from_response(response: TransportResponse) -> Self {
        if response.status != 200 {
            return ToolResult::Failure(response.body);
        }

        match serde_json::from_str::<Value>(&response.body) {
            Ok(Value::Object(payload)) => {
                if payload.get("status").and_then(Value::as_str) == Some("error") {
                    let message = payload
                        .get("message")
                        .map(|m| match m {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .unwrap_or_else(|| "Unknown error".to_string());
                    ToolResult::Failure(message)
                } else {
                    ToolResult::Success(payload)
                }
            }
            Ok(other) => ToolResult::Failure(format!("Unexpected tool payload: {}", other)),
            Err(_) => ToolResult::Failure(response.body),
        }
    }
}

/// Sends tool calls through a transport and normalizes their outcome.
///
/// Never retries; a failure is reported back to the planner instead.
#[derive(Clone)]
pub struct ToolInvoker {
    transport: Arc<dyn ToolTransport>,
}

impl ToolInvoker {
    /// Creates a new invoker over the given transport.
    pub fn new(transport: Arc<dyn ToolTransport>) -> Self {
        Self { transport }
    }

    /// Invokes `tool` with keyword `args`.
    pub async fn invoke(&self, tool: &str, args: JsonMap) -> ToolResult {
        let result = match self.transport.call(tool, args).await {
            Ok(response) => ToolResult::from_response(response),
            Err(error) => ToolResult::Failure(error.to_string()),
        };

        match &result {
            ToolResult::Success(payload) => {
                info!(tool = %tool, keys = payload.len(), "Tool executed");
            }
            ToolResult::Failure(message) => {
                warn!(tool = %tool, %message, "Tool failed");
            }
        }
        result
    }
}

impl std::fmt::Debug for ToolInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolInvoker").finish_non_exhaustive()
    }
}
