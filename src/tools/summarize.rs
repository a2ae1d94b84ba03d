use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use super::success;
use crate::llm::{GenerationSettings, LLMClient, generate_text};
use crate::tool::{JsonMap, Tool, ToolError, parameters_schema, parse_args};

/// Returned when the model answers a summary request with nothing.
pub const EMPTY_SUMMARY: &str = "[summary failed: empty response]";
/// Returned when the model answers a report request with nothing.
pub const EMPTY_REPORT: &str = "[generation failed: empty response]";

/// Plain-text generation shared by the writing tools.
///
/// Without a client every request fails, so the tool server can run with
/// only the file-backed tools configured.
#[derive(Clone)]
pub struct TextGenerator {
    client: Option<Arc<dyn LLMClient>>,
    settings: GenerationSettings,
}

impl TextGenerator {
    pub fn new(client: Option<Arc<dyn LLMClient>>, settings: GenerationSettings) -> Self {
        Self { client, settings }
    }

    async fn generate(&self, prompt: String) -> Result<String, ToolError> {
        let client = self.client.as_deref().ok_or_else(|| {
            ToolError::ExecutionFailed("no language model is configured".to_string())
        })?;
        generate_text(client, &self.settings, prompt).await.map_err(|e| {
            warn!(error = %e, "Text generation failed");
            ToolError::ExecutionFailed(format!("text generation failed: {}", e))
        })
    }
}

impl std::fmt::Debug for TextGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextGenerator")
            .field("configured", &self.client.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

fn require(field: &str, value: &str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        return Err(ToolError::InvalidArguments(format!("{} must not be empty", field)));
    }
    Ok(())
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SummarizeArgs {
    /// The text to condense
    text_to_summarize: String,
}

/// Summarizes a piece of text.
#[derive(Debug)]
pub struct SummarizeTextTool {
    generator: TextGenerator,
}

impl SummarizeTextTool {
    pub fn new(generator: TextGenerator) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Tool for SummarizeTextTool {
    fn name(&self) -> &str {
        "summarize_text"
    }

    fn description(&self) -> &str {
        "Summarizes the given text."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<SummarizeArgs>()
    }

    async fn execute(&self, args: JsonMap) -> Result<JsonMap, ToolError> {
        let args: SummarizeArgs = parse_args(args)?;
        require("text_to_summarize", &args.text_to_summarize)?;

        let prompt = format!(
            "Summarize the following text concisely.\n\n--- text ---\n{}\n--- end of text ---\n\nSummary:",
            args.text_to_summarize
        );
        let mut summary = self.generator.generate(prompt).await?;
        if summary.is_empty() {
            summary = EMPTY_SUMMARY.to_string();
        }
        Ok(success([("summary", summary.into())]))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct FeedbackArgs {
    /// Report month (YYYY-MM)
    month: String,
    /// The month's to-do items
    todos: Value,
    /// Summary of the KPI document
    kpi_summary: String,
    /// Markdown template to follow
    #[serde(default)]
    template: Option<String>,
}

/// Drafts the monthly feedback report.
#[derive(Debug)]
pub struct GenerateFeedbackTool {
    generator: TextGenerator,
}

impl GenerateFeedbackTool {
    pub fn new(generator: TextGenerator) -> Self {
        Self { generator }
    }
}

fn feedback_prompt(args: &FeedbackArgs) -> String {
    let todos = match &args.todos {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    };

    let mut prompt = format!(
        r#"You are a professional report writer. Write the monthly feedback report for {month} in markdown.
Write in natural sentences rather than bare lists.

**1. To-do items for the month:**
```json
{todos}
```

**2. KPI summary:**
```text
{kpi}
```

The report must contain these four sections:
## Highlights
## Key Activities
## Areas for Improvement
## Next Month's Plan
"#,
        month = args.month,
        todos = todos,
        kpi = args.kpi_summary,
    );

    if let Some(template) = args.template.as_deref().filter(|t| !t.trim().is_empty()) {
        prompt.push_str("\nFollow the structure of this template:\n```markdown\n");
        prompt.push_str(template);
        prompt.push_str("\n```\n");
    }
    prompt
}

#[async_trait]
impl Tool for GenerateFeedbackTool {
    fn name(&self) -> &str {
        "generate_feedback"
    }

    fn description(&self) -> &str {
        "Drafts a markdown monthly feedback report from the month's to-dos and a KPI summary."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<FeedbackArgs>()
    }

    async fn execute(&self, args: JsonMap) -> Result<JsonMap, ToolError> {
        let args: FeedbackArgs = parse_args(args)?;
        require("month", &args.month)?;
        require("kpi_summary", &args.kpi_summary)?;
        if args.todos.is_null() {
            return Err(ToolError::InvalidArguments("todos must not be empty".to_string()));
        }

        let mut content = self.generator.generate(feedback_prompt(&args)).await?;
        if content.is_empty() {
            content = EMPTY_REPORT.to_string();
        }
        Ok(success([
            ("month", args.month.into()),
            ("content", content.into()),
        ]))
    }
}
