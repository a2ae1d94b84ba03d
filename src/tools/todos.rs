use async_trait::async_trait;
use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::debug;

use super::success;
use crate::tool::{JsonMap, Tool, ToolError, parameters_schema, parse_args};

static MONTH: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").ok());

fn is_month(value: &str) -> bool {
    MONTH.as_ref().is_some_and(|re| re.is_match(value))
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListTodosArgs {
    /// Only return items dated in this month (YYYY-MM)
    #[serde(default)]
    month: Option<String>,
}

/// Lists the to-do items stored in the todo file, newest first.
#[derive(Debug)]
pub struct ListTodosTool {
    path: PathBuf,
}

impl ListTodosTool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<Vec<Value>, ToolError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ToolError::NotFound(format!("todo file {}: {}", self.path.display(), e))
        })?;
        let data: Value = serde_json::from_str(&raw).map_err(|e| {
            ToolError::ExecutionFailed(format!("todo file {} is not valid JSON: {}", self.path.display(), e))
        })?;
        flatten(data)
    }
}

/// Accepts a flat list of items or the weekly layout `[{week, tasks: [...]}]`.
fn flatten(data: Value) -> Result<Vec<Value>, ToolError> {
    let Value::Array(items) = data else {
        return Err(ToolError::ExecutionFailed(
            "todo file must contain a JSON array".to_string(),
        ));
    };

    let weekly = items
        .first()
        .and_then(Value::as_object)
        .is_some_and(|first| first.contains_key("week"));
    if !weekly {
        return Ok(items);
    }

    Ok(items
        .into_iter()
        .filter_map(|week| match week {
            Value::Object(mut week) => match week.remove("tasks") {
                Some(Value::Array(tasks)) => Some(tasks),
                _ => None,
            },
            _ => None,
        })
        .flatten()
        .collect())
}

fn date_of(item: &Value) -> &str {
    item.get("date").and_then(Value::as_str).unwrap_or("0000-00-00")
}

#[async_trait]
impl Tool for ListTodosTool {
    fn name(&self) -> &str {
        "list_todos"
    }

    fn description(&self) -> &str {
        "Lists to-do items (date, task, status) newest first, optionally for one month."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<ListTodosArgs>()
    }

    async fn execute(&self, args: JsonMap) -> Result<JsonMap, ToolError> {
        let args: ListTodosArgs = parse_args(args)?;
        if let Some(month) = &args.month {
            if !is_month(month) {
                return Err(ToolError::InvalidArguments(format!(
                    "month must look like YYYY-MM, got {:?}",
                    month
                )));
            }
        }

        let mut todos = self.load().await?;
        todos.sort_by(|a, b| date_of(b).cmp(date_of(a)));

        if let Some(month) = &args.month {
            todos.retain(|item| date_of(item).starts_with(month.as_str()));
            if todos.is_empty() {
                return Err(ToolError::NotFound(format!("no to-do items dated in {}", month)));
            }
        }

        debug!(count = todos.len(), month = ?args.month, "Loaded to-do items");
        Ok(success([("todos", Value::Array(todos))]))
    }
}
