use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::success;
use crate::tool::{JsonMap, Tool, ToolError};

/// Reads the markdown template that shapes generated reports.
#[derive(Debug)]
pub struct GetFeedbackTemplateTool {
    path: PathBuf,
}

impl GetFeedbackTemplateTool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Tool for GetFeedbackTemplateTool {
    fn name(&self) -> &str {
        "get_feedback_template"
    }

    fn description(&self) -> &str {
        "Returns the markdown template for feedback reports (empty when none is set)."
    }

    fn parameters_schema(&self) -> Value {
        super::no_parameters()
    }

    async fn execute(&self, _args: JsonMap) -> Result<JsonMap, ToolError> {
        let template = match tokio::fs::read_to_string(&self.path).await {
            Ok(template) => template,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(ToolError::ExecutionFailed(format!(
                    "reading {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };
        Ok(success([("template", template.into())]))
    }
}
