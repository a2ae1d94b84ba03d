use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

use crate::tool::{JsonMap, ToolDefinition, ToolRegistry};

/// Body of `POST /tools/{name}`.
#[derive(Debug, Default, Deserialize)]
pub struct CallToolRequest {
    #[serde(default)]
    pub args: JsonMap,
}

/// Body of `GET /tools`.
#[derive(Debug, Serialize)]
pub struct ToolInventoryResponse {
    pub tools: Vec<ToolDefinition>,
    pub catalog: String,
}

pub async fn call_tool(
    State(registry): State<Arc<ToolRegistry>>,
    Path(name): Path<String>,
    Json(request): Json<CallToolRequest>,
) -> Json<Value> {
    info!(tool = %name, "Serving tool call");
    Json(registry.dispatch(&name, request.args).await)
}

pub async fn list_tools(State(registry): State<Arc<ToolRegistry>>) -> Json<ToolInventoryResponse> {
    debug!(tool_count = registry.len(), "Serving /tools request");
    Json(ToolInventoryResponse {
        tools: registry.to_tool_definitions(),
        catalog: registry.describe(),
    })
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
