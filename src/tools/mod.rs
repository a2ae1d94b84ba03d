//! The built-in tools the planner can call.
//!
//! Every tool reads its locations from [`StorageConfig`] and reports success
//! with a `"status": "success"` entry next to its data keys.

pub mod date;
pub mod export;
pub mod pdf;
pub mod summarize;
pub mod template;
pub mod todos;

pub use date::GetTodayTool;
pub use export::{ExportReportTool, ExportToNotionTool, markdown_to_blocks};
pub use pdf::{GetPdfFilenameTool, ListPdfFilesTool, ParsePdfTool};
pub use summarize::{GenerateFeedbackTool, SummarizeTextTool, TextGenerator};
pub use template::GetFeedbackTemplateTool;
pub use todos::ListTodosTool;

use schemars::JsonSchema;
use serde_json::Value;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::LLMClient;
use crate::tool::{JsonMap, ToolError, ToolRegistry, parameters_schema};

#[allow(dead_code)]
#[derive(JsonSchema)]
struct NoArgs {}

fn no_parameters() -> Value {
    parameters_schema::<NoArgs>()
}

fn success<const N: usize>(entries: [(&str, Value); N]) -> JsonMap {
    let mut map = JsonMap::new();
    map.insert("status".into(), "success".into());
    for (key, value) in entries {
        map.insert(key.to_string(), value);
    }
    map
}

/// Builds the registry with every built-in tool.
///
/// `llm` backs `summarize_text` and `generate_feedback`; without it those two
/// tools report an error when called.
pub fn default_registry(
    config: &AppConfig,
    llm: Option<Arc<dyn LLMClient>>,
) -> Result<ToolRegistry, ToolError> {
    let storage = &config.storage;
    let generator = TextGenerator::new(llm, config.provider.generation());
    let notion = ExportToNotionTool::new(config.notion.clone(), config.tool_timeout)?;

    Ok(ToolRegistry::new()
        .with(Arc::new(GetTodayTool))
        .with(Arc::new(ListTodosTool::new(storage.todo_file())))
        .with(Arc::new(ListPdfFilesTool::new(storage.pdf_dir())))
        .with(Arc::new(GetPdfFilenameTool::new(storage.designated_pdf())))
        .with(Arc::new(ParsePdfTool::new(storage)))
        .with(Arc::new(GetFeedbackTemplateTool::new(storage.feedback_template())))
        .with(Arc::new(SummarizeTextTool::new(generator.clone())))
        .with(Arc::new(GenerateFeedbackTool::new(generator)))
        .with(Arc::new(ExportReportTool::new(storage.reports_dir())))
        .with(Arc::new(notion)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use serde_json::json;

    fn config(root: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::from_lookup(|_| None).unwrap();
        config.storage = StorageConfig::new(root);
        config
    }

    #[test]
    fn registers_every_tool() {
        let dir = tempfile::tempdir().unwrap();
        let registry = default_registry(&config(dir.path()), None).unwrap();
        assert_eq!(
            registry.names(),
            vec![
                "export_report",
                "export_to_notion",
                "generate_feedback",
                "get_feedback_template",
                "get_pdf_filename",
                "get_today",
                "list_pdf_files",
                "list_todos",
                "parse_pdf",
                "summarize_text",
            ]
        );
    }

    #[test]
    fn catalog_shows_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = default_registry(&config(dir.path()), None).unwrap().describe();
        assert!(catalog.contains("- get_today(): "));
        assert!(catalog.contains("- list_todos(month?: string): "));
        assert!(catalog.contains("- export_report(month: string, content: string): "));
        assert!(catalog.contains("- summarize_text(text_to_summarize: string): "));
    }

    #[tokio::test]
    async fn dispatch_reports_tool_errors_as_envelopes() {
        let dir = tempfile::tempdir().unwrap();
        let registry = default_registry(&config(dir.path()), None).unwrap();

        let envelope = registry.dispatch("list_todos", JsonMap::new()).await;
        assert_eq!(envelope["status"], "error");

        let envelope = registry.dispatch("get_feedback_template", JsonMap::new()).await;
        assert_eq!(envelope, json!({ "status": "success", "template": "" }));
    }
}
