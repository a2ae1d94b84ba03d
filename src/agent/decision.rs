use serde_json::{Value, json};

use crate::tool::JsonMap;

/// Shown when the planner's output is not a JSON object at all.
pub const DECODE_FAILURE_MESSAGE: &str =
    "Sorry, the planner's response was not in the expected format.";

/// Shown when the planner's JSON carries neither a tool call nor a final answer.
pub const UNDECIDED_MESSAGE: &str =
    "The agent could not decide on a next step. Ending the run.";

/// What the planner asked for on one step.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerDecision {
    /// Run one tool with keyword arguments
    ToolCall { tool: String, args: JsonMap },
    /// The request is resolved
    FinalAnswer { text: String },
    /// Anything else; always terminal
    Undecided { message: String },
}

impl PlannerDecision {
    /// Parses raw planner text. Never fails: unrecognized input is `Undecided`.
    ///
    /// Accepts `{"tool_code": {"tool": .., "args": {..}}}`, the legacy
    /// `{"tool_code": "name"}`, and `{"final_answer": ".."}`. When both keys
    /// are present the tool call wins.
    pub fn parse(raw: &str) -> Self {
        let Some(Value::Object(map)) = extract_json(raw) else {
            return PlannerDecision::Undecided {
                message: DECODE_FAILURE_MESSAGE.to_string(),
            };
        };

        if let Some(tool_code) = map.get("tool_code") {
            return parse_tool_code(tool_code).unwrap_or_else(undecided);
        }

        match map.get("final_answer") {
            Some(Value::String(text)) => PlannerDecision::FinalAnswer { text: text.clone() },
            _ => undecided(),
        }
    }
}

fn undecided() -> PlannerDecision {
    PlannerDecision::Undecided {
        message: UNDECIDED_MESSAGE.to_string(),
    }
}

fn parse_tool_code(value: &Value) -> Option<PlannerDecision> {
    match value {
        Value::String(tool) if !tool.is_empty() => Some(PlannerDecision::ToolCall {
            tool: tool.clone(),
            args: JsonMap::new(),
        }),
        Value::Object(call) => {
            let tool = call.get("tool").and_then(Value::as_str).filter(|t| !t.is_empty())?;
            let args = match call.get("args") {
                None | Some(Value::Null) => JsonMap::new(),
                Some(Value::Object(args)) => args.clone(),
                Some(_) => return None,
            };
            Some(PlannerDecision::ToolCall {
                tool: tool.to_string(),
                args,
            })
        }
        _ => None,
    }
}

/// The normalized form of a tool call as recorded in the conversation.
pub fn tool_call_record(tool: &str, args: &JsonMap) -> String {
    json!({ "tool_code": { "tool": tool, "args": args } }).to_string()
}

/// Finds one JSON value in planner output: the whole text, a fenced block,
/// or the outermost `{...}` span.
fn extract_json(content: &str) -> Option<Value> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if trimmed.starts_with("```") {
        let stripped = trimmed.trim_start_matches("```json");
        let stripped = stripped.trim_start_matches("```JSON");
        let stripped = stripped.trim_start_matches("```");
        if let Some(end) = stripped.rfind("```") {
            if let Ok(value) = serde_json::from_str::<Value>(stripped[..end].trim()) {
                return Some(value);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Some(value);
            }
        }
    }

    None
}
