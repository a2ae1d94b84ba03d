use crate::tool::JsonMap;

/// Appended to tool output that was cut short.
pub const TRUNCATION_MARKER: &str = "…(truncated)";

const SYSTEM_PROMPT_CORE: &str = r#"You are an AI agent that helps the user by calling tools. On every turn, either call exactly one tool or return a final answer.

Available tools:
{DESCRIPTIONS}

[Example scenario: monthly report exported to Notion]
1) get_today -> 2) list_todos -> 3) get_pdf_filename -> 4) parse_pdf -> 5) summarize_text -> 6) generate_feedback -> 7) export_to_notion
Always advance one step at a time.

[Response rules]
- Always respond with JSON only.
- For a monthly report, call list_todos for the month of the date returned by get_today.
- The JSON object has exactly one of these top-level keys:
  - tool_code: {"tool": string, "args": object}
  - final_answer: string
- Once a task is finished with final_answer, treat the next user message as a new, unrelated request unless it asks about the previous result.
- When showing todos to the user, list each item as a bullet (-) with its date, task, and status.
- When a tool call fails, propose the single next tool that resolves the cause.
- Never invent tools that are not listed above."#;

/// Builds the system instruction for one run.
pub fn system_prompt(catalog: &str, command: &str) -> String {
    let core = SYSTEM_PROMPT_CORE.replace("{DESCRIPTIONS}", catalog);
    format!("{}\nUser command: {}\n", core, command)
}

/// Cuts `text` to at most `limit` characters, appending [`TRUNCATION_MARKER`]
/// when anything was dropped.
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Feedback for a successful tool call.
pub fn success_feedback(tool: &str, payload: &JsonMap, limit: usize) -> String {
    let json = serde_json::to_string_pretty(payload).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Tool {} executed successfully.\nResult JSON:\n{}",
        tool,
        truncate(&json, limit)
    )
}

/// Feedback for a failed tool call.
pub fn failure_feedback(tool: &str, message: &str) -> String {
    format!(
        "Tool {} failed.\nReason: {}\nHint: Provide the missing arguments or call a preparatory tool first.",
        tool, message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_prompt_embeds_catalog_and_command() {
        let prompt = system_prompt("- get_today(): Returns today's date.", "make a report");
        assert!(prompt.contains("- get_today(): Returns today's date."));
        assert!(!prompt.contains("{DESCRIPTIONS}"));
        assert!(prompt.ends_with("User command: make a report\n"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abc", 3), "abc");
        assert_eq!(truncate("월간보고서", 2), format!("월간{}", TRUNCATION_MARKER));
    }

    #[test]
    fn large_results_are_bounded() {
        let mut payload = JsonMap::new();
        payload.insert("text".into(), json!("x".repeat(10_000)));

        let feedback = success_feedback("parse_pdf", &payload, 2000);
        assert!(feedback.ends_with(TRUNCATION_MARKER));
        let header = "Tool parse_pdf executed successfully.\nResult JSON:\n";
        assert!(feedback.chars().count() <= header.len() + 2000 + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn small_results_are_pretty_printed_whole() {
        let mut payload = JsonMap::new();
        payload.insert("today".into(), json!("2025-09-10"));
        let feedback = success_feedback("get_today", &payload, 2000);
        assert_eq!(
            feedback,
            "Tool get_today executed successfully.\nResult JSON:\n{\n  \"today\": \"2025-09-10\"\n}"
        );
    }

    #[test]
    fn failure_feedback_carries_reason_and_hint() {
        let feedback = failure_feedback("export_report", "boom");
        assert!(feedback.contains("export_report"));
        assert!(feedback.contains("Reason: boom"));
        assert!(feedback.contains("Hint:"));
    }
}
