use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;

use super::success;
use crate::tool::{JsonMap, Tool, ToolError};

/// Returns the local calendar date.
#[derive(Debug, Default)]
pub struct GetTodayTool;

#[async_trait]
impl Tool for GetTodayTool {
    fn name(&self) -> &str {
        "get_today"
    }

    fn description(&self) -> &str {
        "Returns today's date as YYYY-MM-DD."
    }

    fn parameters_schema(&self) -> Value {
        super::no_parameters()
    }

    async fn execute(&self, _args: JsonMap) -> Result<JsonMap, ToolError> {
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        Ok(success([("today", today.into())]))
    }
}
