//! Run-scoped memory of values taken from tool results.
//!
//! Every key of a successful result is stored verbatim, then a fixed set of
//! derived fields is computed from it (see [`derive_fields`]). Before a tool
//! runs, the fields it expects are copied into its arguments unless the
//! planner already supplied them.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::tool::JsonMap;

/// Which context fields each tool expects as pre-filled arguments.
#[derive(Debug, Clone)]
pub struct ContextRequirements {
    table: HashMap<String, Vec<String>>,
}

impl ContextRequirements {
    /// Creates an empty table.
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Sets the fields `tool` expects, replacing any previous entry.
    pub fn with(mut self, tool: impl Into<String>, fields: &[&str]) -> Self {
        self.table
            .insert(tool.into(), fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Returns the ordered field names `tool` expects.
    pub fn fields_for(&self, tool: &str) -> &[String] {
        self.table.get(tool).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for ContextRequirements {
    fn default() -> Self {
        Self::empty()
            .with("list_todos", &["month"])
            .with("summarize_text", &["text_to_summarize"])
            .with("generate_feedback", &["month", "todos", "kpi_summary", "template"])
            .with("export_to_notion", &["month", "content"])
            .with("export_report", &["month", "content"])
    }
}

/// Computes the derived fields of a tool result.
///
/// - `today` (string, at least 7 chars) gives `month` = its `YYYY-MM` prefix
/// - `text` (string) gives `text_to_summarize`
/// - `summary` (string) gives `kpi_summary`
/// - `content` (string) gives `content`
pub fn derive_fields(result: &JsonMap) -> JsonMap {
    let mut derived = JsonMap::new();

    if let Some(today) = result.get("today").and_then(Value::as_str) {
        if today.chars().count() >= 7 {
            let month: String = today.chars().take(7).collect();
            derived.insert("month".to_string(), Value::String(month));
        }
    }

    let renames = [
        ("text", "text_to_summarize"),
        ("summary", "kpi_summary"),
        ("content", "content"),
    ];
    for (source, target) in renames {
        if let Some(value) = result.get(source).and_then(Value::as_str) {
            derived.insert(target.to_string(), Value::String(value.to_string()));
        }
    }

    derived
}

/// Accumulated key-value memory for one agent run.
#[derive(Debug, Clone, Serialize)]
pub struct ContextStore {
    values: JsonMap,
    #[serde(skip)]
    requirements: Arc<ContextRequirements>,
}

impl ContextStore {
    /// Creates an empty store using the given requirements table.
    pub fn new(requirements: Arc<ContextRequirements>) -> Self {
        Self {
            values: JsonMap::new(),
            requirements,
        }
    }

    /// Stores every top-level key of a successful result, then its derived fields.
    pub fn merge(&mut self, result: &JsonMap) {
        for (key, value) in result {
            self.values.insert(key.clone(), value.clone());
        }
        for (key, value) in derive_fields(result) {
            self.values.insert(key, value);
        }
    }

    /// Looks up a stored value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns every stored value.
    pub fn values(&self) -> &JsonMap {
        &self.values
    }

    /// Fills the fields `tool` expects from the store. Explicit arguments win.
    pub fn inject(&self, tool: &str, mut args: JsonMap) -> JsonMap {
        for field in self.requirements.fields_for(tool) {
            if args.contains_key(field) {
                continue;
            }
            if let Some(value) = self.values.get(field) {
                debug!(tool = %tool, field = %field, "Injecting argument from context");
                args.insert(field.clone(), value.clone());
            }
        }
        args
    }
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new(Arc::new(ContextRequirements::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> JsonMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn derives_month_from_today() {
        let derived = derive_fields(&map(json!({ "today": "2025-09-14" })));
        assert_eq!(derived.get("month"), Some(&json!("2025-09")));
    }

    #[test]
    fn short_or_non_string_today_derives_nothing() {
        assert!(derive_fields(&map(json!({ "today": "2025" }))).is_empty());
        assert!(derive_fields(&map(json!({ "today": 20250914 }))).is_empty());
    }

    #[test]
    fn derivation_rules_apply_independently() {
        let derived = derive_fields(&map(json!({
            "text": "pdf body",
            "summary": "kpi",
            "content": "# report",
            "todos": [1, 2],
        })));
        assert_eq!(derived.len(), 3);
        assert_eq!(derived["text_to_summarize"], "pdf body");
        assert_eq!(derived["kpi_summary"], "kpi");
        assert_eq!(derived["content"], "# report");
    }

    #[test]
    fn merge_twice_keeps_month() {
        let mut store = ContextStore::default();
        store.merge(&map(json!({ "today": "2025-09-14" })));
        store.merge(&map(json!({ "today": "2025-09-14" })));
        assert_eq!(store.get("month"), Some(&json!("2025-09")));

        store.merge(&map(json!({ "status": "success", "files": [] })));
        assert_eq!(store.get("month"), Some(&json!("2025-09")));
    }

    #[test]
    fn merge_sets_text_to_summarize_exactly() {
        let mut store = ContextStore::default();
        store.merge(&map(json!({ "text": "abc" })));
        assert_eq!(store.get("text_to_summarize"), Some(&json!("abc")));
        assert_eq!(store.get("text"), Some(&json!("abc")));
    }

    #[test]
    fn merge_keeps_native_types() {
        let mut store = ContextStore::default();
        store.merge(&map(json!({ "todos": [{ "task": "a" }], "count": 3 })));
        assert!(store.get("todos").unwrap().is_array());
        assert_eq!(store.get("count"), Some(&json!(3)));
    }

    #[test]
    fn later_results_overwrite_earlier_ones() {
        let mut store = ContextStore::default();
        store.merge(&map(json!({ "summary": "first" })));
        store.merge(&map(json!({ "summary": "second" })));
        assert_eq!(store.get("kpi_summary"), Some(&json!("second")));
    }

    #[test]
    fn inject_never_overwrites_explicit_args() {
        let mut store = ContextStore::default();
        store.merge(&map(json!({ "today": "2025-09-14", "content": "stored" })));

        let args = store.inject(
            "export_report",
            map(json!({ "month": "2025-01", "content": "x" })),
        );
        assert_eq!(args["month"], "2025-01");
        assert_eq!(args["content"], "x");
    }

    #[test]
    fn inject_fills_only_required_and_present_fields() {
        let mut store = ContextStore::default();
        store.merge(&map(json!({ "today": "2025-09-14", "text": "body" })));

        let args = store.inject("generate_feedback", JsonMap::new());
        assert_eq!(args.len(), 1);
        assert_eq!(args["month"], "2025-09");

        let args = store.inject("get_today", JsonMap::new());
        assert!(args.is_empty());
    }

    #[test]
    fn custom_requirements_table() {
        let requirements = ContextRequirements::empty().with("echo", &["text"]);
        let mut store = ContextStore::new(Arc::new(requirements));
        store.merge(&map(json!({ "text": "hi", "today": "2025-09-01" })));

        assert_eq!(store.inject("echo", JsonMap::new())["text"], "hi");
        assert!(store.inject("list_todos", JsonMap::new()).is_empty());
    }
}
