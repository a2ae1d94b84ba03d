use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::success;
use crate::config::NotionConfig;
use crate::tool::{JsonMap, Tool, ToolError, parameters_schema, parse_args};

#[derive(Debug, Deserialize, JsonSchema)]
struct ExportArgs {
    /// Report month (YYYY-MM)
    month: String,
    /// Markdown report body
    content: String,
}

impl ExportArgs {
    fn validate(&self) -> Result<(), ToolError> {
        if self.month.trim().is_empty() || self.content.trim().is_empty() {
            return Err(ToolError::InvalidArguments(
                "month and content are both required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Saves a report as `<month>.md` in the reports folder, never overwriting.
#[derive(Debug)]
pub struct ExportReportTool {
    dir: PathBuf,
}

impl ExportReportTool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn candidate(&self, month: &str, version: u32) -> PathBuf {
        match version {
            0 => self.dir.join(format!("{}.md", month)),
            n => self.dir.join(format!("{} ({}).md", month, n)),
        }
    }
}

#[async_trait]
impl Tool for ExportReportTool {
    fn name(&self) -> &str {
        "export_report"
    }

    fn description(&self) -> &str {
        "Saves the report as a monthly markdown file; existing files get a new numbered version instead of being overwritten."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<ExportArgs>()
    }

    async fn execute(&self, args: JsonMap) -> Result<JsonMap, ToolError> {
        let args: ExportArgs = parse_args(args)?;
        args.validate()?;
        if args.month.contains(['/', '\\']) || args.month.contains("..") {
            return Err(ToolError::InvalidArguments(format!(
                "month is not a valid file name: {}",
                args.month
            )));
        }

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            ToolError::ExecutionFailed(format!("creating {}: {}", self.dir.display(), e))
        })?;

        let mut version = 0;
        let (path, mut file) = loop {
            let path = self.candidate(&args.month, version);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => version += 1,
                Err(e) => {
                    return Err(ToolError::ExecutionFailed(format!(
                        "creating {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        };

        let written = async {
            file.write_all(args.content.as_bytes()).await?;
            file.flush().await
        };
        written.await.map_err(|e| {
            ToolError::ExecutionFailed(format!("writing {}: {}", path.display(), e))
        })?;

        info!(path = %path.display(), "Report saved");
        Ok(success([("path", path.display().to_string().into())]))
    }
}

/// Notion rejects rich text longer than this in one block.
pub const NOTION_BLOCK_CHAR_LIMIT: usize = 2000;
/// Notion accepts at most this many children per request.
const NOTION_CHILDREN_PER_REQUEST: usize = 100;
const NOTION_API_URL: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";

/// One block whose text is split into rich-text segments Notion accepts.
fn text_block(kind: &str, content: &str) -> Value {
    let chars: Vec<char> = content.chars().collect();
    let rich_text: Vec<Value> = chars
        .chunks(NOTION_BLOCK_CHAR_LIMIT)
        .map(|chunk| {
            let text: String = chunk.iter().collect();
            json!({ "type": "text", "text": { "content": text } })
        })
        .collect();
    json!({
        "object": "block",
        "type": kind,
        kind: { "rich_text": rich_text }
    })
}

/// Converts markdown into Notion blocks: `#`/`##`/`###` headings, `- ` bullets,
/// and paragraphs. Blank lines are dropped. Long paragraphs become several
/// blocks; long headings and bullets keep one block with several text segments.
pub fn markdown_to_blocks(markdown: &str) -> Vec<Value> {
    let mut blocks = Vec::new();

    for line in markdown.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(rest) = line.strip_prefix("### ") {
            blocks.push(text_block("heading_3", rest));
        } else if let Some(rest) = line.strip_prefix("## ") {
            blocks.push(text_block("heading_2", rest));
        } else if let Some(rest) = line.strip_prefix("# ") {
            blocks.push(text_block("heading_1", rest));
        } else if let Some(rest) = line.strip_prefix("- ") {
            blocks.push(text_block("bulleted_list_item", rest));
        } else {
            let chars: Vec<char> = line.chars().collect();
            for chunk in chars.chunks(NOTION_BLOCK_CHAR_LIMIT) {
                blocks.push(text_block("paragraph", &chunk.iter().collect::<String>()));
            }
        }
    }

    blocks
}

/// Publishes a report as a child page of the configured Notion page.
#[derive(Debug)]
pub struct ExportToNotionTool {
    http: reqwest::Client,
    config: NotionConfig,
}

impl ExportToNotionTool {
    /// Creates the tool; every Notion request is bounded by `timeout`.
    pub fn new(config: NotionConfig, timeout: Duration) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ToolError::ExecutionFailed(format!("building Notion client: {}", e)))?;
        Ok(Self { http, config })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(NOTION_API_URL)
            .trim_end_matches('/')
    }

    async fn send(&self, request: reqwest::RequestBuilder, key: &str) -> Result<Value, ToolError> {
        let response = request
            .bearer_auth(key)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("Notion request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no details");
            return Err(ToolError::ExecutionFailed(format!(
                "Notion returned {}: {}",
                status, message
            )));
        }
        response.json().await.map_err(|e| {
            ToolError::ExecutionFailed(format!("Notion returned an unreadable body: {}", e))
        })
    }
}

fn required_str<'a>(page: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    page.get(key).and_then(Value::as_str).ok_or_else(|| {
        ToolError::ExecutionFailed(format!("Notion response has no page {}: {}", key, page))
    })
}

#[async_trait]
impl Tool for ExportToNotionTool {
    fn name(&self) -> &str {
        "export_to_notion"
    }

    fn description(&self) -> &str {
        "Publishes the report as a new Notion page."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<ExportArgs>()
    }

    async fn execute(&self, args: JsonMap) -> Result<JsonMap, ToolError> {
        let args: ExportArgs = parse_args(args)?;
        args.validate()?;
        let (Some(key), Some(parent)) = (&self.config.api_key, &self.config.page_id) else {
            return Err(ToolError::ExecutionFailed(
                "NOTION_API_KEY and NOTION_PAGE_ID must be set".to_string(),
            ));
        };

        let blocks = markdown_to_blocks(&args.content);
        let mut batches = blocks.chunks(NOTION_CHILDREN_PER_REQUEST);
        let first = batches.next().unwrap_or_default();

        let title = format!("{} monthly feedback report", args.month);
        let body = json!({
            "parent": { "page_id": parent },
            "properties": { "title": { "title": [{ "text": { "content": title } }] } },
            "children": first,
        });
        let page = self
            .send(self.http.post(format!("{}/v1/pages", self.base_url())).json(&body), key)
            .await?;

        let page_id = required_str(&page, "id")?;
        let url = required_str(&page, "url")?;
        for batch in batches {
            debug!(page = %page_id, blocks = batch.len(), "Appending Notion blocks");
            let url = format!("{}/v1/blocks/{}/children", self.base_url(), page_id);
            self.send(self.http.patch(url).json(&json!({ "children": batch })), key)
                .await?;
        }

        info!(%url, "Notion page created");
        Ok(success([("url", url.into())]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, routing::{patch, post}};
    use std::sync::{Arc, Mutex};

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}", addr)
    }

    fn notion_at(base_url: String, timeout: Duration) -> ExportToNotionTool {
        ExportToNotionTool::new(
            NotionConfig {
                api_key: Some("secret".into()),
                page_id: Some("parent".into()),
                base_url: Some(base_url),
            },
            timeout,
        )
        .unwrap()
    }

    fn report(month: &str, content: &str) -> JsonMap {
        json!({ "month": month, "content": content })
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn export_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ExportReportTool::new(dir.path().join("reports"));

        let mut paths = Vec::new();
        for body in ["first", "second", "third"] {
            let result = tool.execute(report("2025-09", body)).await.unwrap();
            paths.push(PathBuf::from(result["path"].as_str().unwrap()));
        }

        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["2025-09.md", "2025-09 (1).md", "2025-09 (2).md"]);
        assert_eq!(std::fs::read_to_string(&paths[0]).unwrap(), "first");
        assert_eq!(std::fs::read_to_string(&paths[2]).unwrap(), "third");
    }

    #[tokio::test]
    async fn export_validates_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ExportReportTool::new(dir.path());
        assert!(matches!(
            tool.execute(report("2025-09", "")).await,
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            tool.execute(report("../escape", "x")).await,
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            tool.execute(JsonMap::new()).await,
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[test]
    fn markdown_becomes_blocks() {
        let blocks = markdown_to_blocks("# Title\n\n## Section\n### Sub\n- item\nplain text\n");
        let kinds: Vec<_> = blocks.iter().map(|b| b["type"].as_str().unwrap()).collect();
        assert_eq!(
            kinds,
            vec!["heading_1", "heading_2", "heading_3", "bulleted_list_item", "paragraph"]
        );
        assert_eq!(blocks[0]["heading_1"]["rich_text"][0]["text"]["content"], "Title");
        assert_eq!(blocks[3]["bulleted_list_item"]["rich_text"][0]["text"]["content"], "item");
    }

    #[test]
    fn long_paragraphs_are_chunked() {
        let line = "가".repeat(NOTION_BLOCK_CHAR_LIMIT * 2 + 5);
        let blocks = markdown_to_blocks(&line);
        assert_eq!(blocks.len(), 3);
        let last = blocks[2]["paragraph"]["rich_text"][0]["text"]["content"]
            .as_str()
            .unwrap();
        assert_eq!(last.chars().count(), 5);
    }

    #[test]
    fn long_headings_and_bullets_are_split_into_segments() {
        let text = "x".repeat(NOTION_BLOCK_CHAR_LIMIT + 10);
        let blocks = markdown_to_blocks(&format!("## {}\n- {}", text, text));
        assert_eq!(blocks.len(), 2);

        for (block, kind) in blocks.iter().zip(["heading_2", "bulleted_list_item"]) {
            let segments = block[kind]["rich_text"].as_array().unwrap();
            let lengths: Vec<usize> = segments
                .iter()
                .map(|s| s["text"]["content"].as_str().unwrap().chars().count())
                .collect();
            assert_eq!(lengths, vec![NOTION_BLOCK_CHAR_LIMIT, 10]);
        }
    }

    #[tokio::test]
    async fn notion_requires_credentials() {
        let tool = ExportToNotionTool::new(NotionConfig::default(), TIMEOUT).unwrap();
        let err = tool.execute(report("2025-09", "# hi")).await.unwrap_err();
        assert!(err.to_string().contains("NOTION_API_KEY"));
    }

    #[tokio::test]
    async fn notion_creates_page_and_appends_overflow() {
        let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
        let create = seen.clone();
        let append = seen.clone();
        let app = Router::new()
            .route(
                "/v1/pages",
                post(move |Json(body): Json<Value>| async move {
                    create.lock().unwrap().push(body);
                    Json(json!({ "id": "page-1", "url": "https://notion.so/page-1" }))
                }),
            )
            .route(
                "/v1/blocks/page-1/children",
                patch(move |Json(body): Json<Value>| async move {
                    append.lock().unwrap().push(body);
                    Json(json!({ "object": "list" }))
                }),
            );
        let tool = notion_at(spawn(app).await, TIMEOUT);
        let content = (0..150).map(|i| format!("- item {}", i)).collect::<Vec<_>>().join("\n");
        let result = tool.execute(report("2025-09", &content)).await.unwrap();
        assert_eq!(result["url"], "https://notion.so/page-1");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0]["parent"]["page_id"], "parent");
        assert_eq!(
            seen[0]["properties"]["title"]["title"][0]["text"]["content"],
            "2025-09 monthly feedback report"
        );
        assert_eq!(seen[0]["children"].as_array().unwrap().len(), 100);
        assert_eq!(seen[1]["children"].as_array().unwrap().len(), 50);
    }

    #[tokio::test]
    async fn unreadable_page_response_is_an_error() {
        let app = Router::new().route("/v1/pages", post(|| async { "ok" }));
        let tool = notion_at(spawn(app).await, TIMEOUT);

        let err = tool.execute(report("2025-09", "# hi")).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(_)));
    }

    #[tokio::test]
    async fn page_without_url_is_an_error() {
        let app = Router::new().route(
            "/v1/pages",
            post(|| async { Json(json!({ "id": "page-1" })) }),
        );
        let tool = notion_at(spawn(app).await, TIMEOUT);

        let err = tool.execute(report("2025-09", "# hi")).await.unwrap_err();
        assert!(err.to_string().contains("url"));
    }

    #[tokio::test]
    async fn slow_notion_times_out() {
        let app = Router::new().route(
            "/v1/pages",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Json(json!({ "id": "page-1", "url": "https://notion.so/page-1" }))
            }),
        );
        let tool = notion_at(spawn(app).await, Duration::from_millis(200));

        let err = tool.execute(report("2025-09", "# hi")).await.unwrap_err();
        assert!(err.to_string().contains("Notion request failed"));
    }
}
