use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::tool::{DynTool, JsonMap, ToolDefinition};

/// A registry for managing tools available to the agent.
///
/// Filled once at startup and shared read-only afterwards.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, DynTool>,
}

impl ToolRegistry {
    /// Creates a new empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool with the registry.
    pub fn register(&mut self, tool: DynTool) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Registers a tool, returning the registry for chaining.
    pub fn with(mut self, tool: DynTool) -> Self {
        self.register(tool);
        self
    }

    /// Resolves a tool by name.
    pub fn get(&self, name: &str) -> Option<&DynTool> {
        self.tools.get(name)
    }

    /// Returns the registered tool names in catalog order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Returns the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Converts all tools to their definitions.
    pub fn to_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.to_definition()).collect()
    }

    /// Renders the human-readable catalog used in the planner's instruction.
    ///
    /// One bullet per tool: `- name(param: type, optional?: type): description`.
    pub fn describe(&self) -> String {
        self.tools
            .values()
            .map(|tool| {
                format!(
                    "- {}({}): {}",
                    tool.name(),
                    render_parameters(&tool.parameters_schema()),
                    tool.description()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Runs a tool and wraps the outcome in the wire envelope.
    ///
    /// Success yields the tool's own mapping; unknown tools and tool errors
    /// yield `{"status": "error", "message": ...}`.
    pub async fn dispatch(&self, name: &str, args: JsonMap) -> Value {
        let Some(tool) = self.get(name).cloned() else {
            warn!(tool = %name, "Unknown tool requested");
            return error_envelope(format!("Unknown tool: {}", name));
        };

        debug!(tool = %name, args = args.len(), "Dispatching tool");
        match tool.execute(args).await {
            Ok(result) => Value::Object(result),
            Err(error) => {
                warn!(tool = %name, %error, "Tool returned an error");
                error_envelope(error.to_string())
            }
        }
    }
}

fn error_envelope(message: String) -> Value {
    json!({ "status": "error", "message": message })
}

fn render_parameters(schema: &Value) -> String {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return String::new();
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, prop)| {
            let marker = if required.contains(&name.as_str()) { "" } else { "?" };
            format!("{}{}: {}", name, marker, render_type(prop))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_type(prop: &Value) -> String {
    match prop.get("type") {
        Some(Value::String(ty)) => ty.clone(),
        Some(Value::Array(types)) => {
            let types: Vec<&str> = types
                .iter()
                .filter_map(Value::as_str)
                .filter(|t| *t != "null")
                .collect();
            if types.is_empty() {
                "any".to_string()
            } else {
                types.join(" | ")
            }
        }
        _ => "any".to_string(),
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
