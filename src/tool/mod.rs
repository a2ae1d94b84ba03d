pub mod invoker;
pub mod registry;
pub mod transport;

pub use invoker::{ToolInvoker, ToolResult};
pub use registry::ToolRegistry;
pub use tool_trait::{DynTool, Tool};
pub use tool_types::{JsonMap, ToolDefinition, ToolError, parameters_schema, parse_args};
pub use transport::{HttpTransport, LocalTransport, ToolTransport, TransportError, TransportResponse};

mod tool_types {
    use schemars::JsonSchema;
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    /// Keyword arguments and result payloads are JSON objects.
    pub type JsonMap = serde_json::Map<String, Value>;

    /// Definition of a tool that can be called by the agent.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ToolDefinition {
        /// The name of the tool
        pub name: String,
        /// A one-line description of what the tool does
        pub description: String,
        /// JSON Schema for the tool's input parameters
        pub parameters: Value,
    }

    /// Errors that can occur when executing a tool.
    #[derive(Debug, thiserror::Error)]
    pub enum ToolError {
        #[error("Invalid arguments: {0}")]
        InvalidArguments(String),
        #[error("Execution failed: {0}")]
        ExecutionFailed(String),
        #[error("Not found: {0}")]
        NotFound(String),
    }

    /// Deserializes keyword arguments into a typed argument struct.
    pub fn parse_args<T: DeserializeOwned>(args: JsonMap) -> Result<T, ToolError> {
        serde_json::from_value(Value::Object(args))
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))
    }

    /// Derives the JSON Schema of a typed argument struct.
    pub fn parameters_schema<T: JsonSchema>() -> Value {
        serde_json::to_value(schemars::schema_for!(T)).unwrap_or(Value::Null)
    }
}

mod tool_trait {
    use super::tool_types::{JsonMap, ToolDefinition, ToolError};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;

    /// Trait representing a tool that can be called by the agent.
    #[async_trait]
    pub trait Tool: Send + Sync {
        /// Returns the name of the tool.
        fn name(&self) -> &str;
        /// Returns a one-line description of what the tool does.
        fn description(&self) -> &str;
        /// Returns the JSON Schema for the tool's input parameters.
        fn parameters_schema(&self) -> Value;

        /// Executes the tool with the given keyword arguments.
        async fn execute(&self, args: JsonMap) -> Result<JsonMap, ToolError>;

        /// Converts the tool to its definition.
        fn to_definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: self.parameters_schema(),
            }
        }
    }

    /// A type alias for a dynamic tool reference.
    pub type DynTool = Arc<dyn Tool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct ExportArgs {
        month: String,
        #[serde(default)]
        content: Option<String>,
    }

    #[test]
    fn parse_args_reports_missing_fields() {
        let err = parse_args::<ExportArgs>(JsonMap::new()).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert!(err.to_string().contains("month"));
    }

    #[test]
    fn parse_args_keeps_native_types() {
        let mut args = JsonMap::new();
        args.insert("month".into(), "2025-09".into());
        let parsed: ExportArgs = parse_args(args).unwrap();
        assert_eq!(parsed.month, "2025-09");
        assert!(parsed.content.is_none());
    }

    #[test]
    fn schema_lists_properties_and_required() {
        let schema = parameters_schema::<ExportArgs>();
        assert!(schema["properties"]["month"].is_object());
        assert!(schema["properties"]["content"].is_object());
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required, &vec![serde_json::json!("month")]);
    }
}
