use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::success;
use crate::config::{DESIGNATED_PDF_NAME, StorageConfig};
use crate::tool::{JsonMap, Tool, ToolError, parameters_schema, parse_args};

/// Passed as `filename` to read the designated KPI document.
pub const DESIGNATED: &str = "@designated";

/// Returned in place of text when a PDF has no extractable text layer.
pub const NO_TEXT_PLACEHOLDER: &str = "[extraction failed: the file contains no text]";

/// Names of the `.pdf` files in `dir`, sorted.
async fn pdf_names(dir: &Path) -> Result<Vec<String>, ToolError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ToolError::NotFound(format!("PDF folder {}: {}", dir.display(), e)))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ToolError::ExecutionFailed(format!("reading {}: {}", dir.display(), e)))?
    {
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(".pdf") {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Lists the PDF files in the PDF folder.
#[derive(Debug)]
pub struct ListPdfFilesTool {
    dir: PathBuf,
}

impl ListPdfFilesTool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Tool for ListPdfFilesTool {
    fn name(&self) -> &str {
        "list_pdf_files"
    }

    fn description(&self) -> &str {
        "Lists the PDF files available in the PDF folder."
    }

    fn parameters_schema(&self) -> Value {
        super::no_parameters()
    }

    async fn execute(&self, _args: JsonMap) -> Result<JsonMap, ToolError> {
        let files = pdf_names(&self.dir).await?;
        Ok(success([("files", files.into())]))
    }
}

/// Reports the designated KPI document, if one has been chosen.
#[derive(Debug)]
pub struct GetPdfFilenameTool {
    designated: PathBuf,
}

impl GetPdfFilenameTool {
    pub fn new(designated: impl Into<PathBuf>) -> Self {
        Self {
            designated: designated.into(),
        }
    }
}

#[async_trait]
impl Tool for GetPdfFilenameTool {
    fn name(&self) -> &str {
        "get_pdf_filename"
    }

    fn description(&self) -> &str {
        "Returns the file name of the designated KPI PDF; pass \"@designated\" to parse_pdf to read it."
    }

    fn parameters_schema(&self) -> Value {
        super::no_parameters()
    }

    async fn execute(&self, _args: JsonMap) -> Result<JsonMap, ToolError> {
        if !tokio::fs::try_exists(&self.designated).await.unwrap_or(false) {
            return Err(ToolError::NotFound(format!(
                "no designated KPI file ({}) has been chosen",
                DESIGNATED_PDF_NAME
            )));
        }
        Ok(success([("filename", DESIGNATED_PDF_NAME.into())]))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ParsePdfArgs {
    /// A file name in the PDF folder, or "@designated" for the KPI document
    #[serde(default)]
    filename: Option<String>,
}

/// Extracts the text of one PDF.
#[derive(Debug)]
pub struct ParsePdfTool {
    dir: PathBuf,
    designated: PathBuf,
}

impl ParsePdfTool {
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            dir: storage.pdf_dir(),
            designated: storage.designated_pdf(),
        }
    }

    async fn resolve(&self, filename: Option<&str>) -> Result<PathBuf, ToolError> {
        match filename {
            Some(DESIGNATED) => {
                if !tokio::fs::try_exists(&self.designated).await.unwrap_or(false) {
                    return Err(ToolError::NotFound(format!(
                        "no designated KPI file ({}) has been chosen",
                        DESIGNATED_PDF_NAME
                    )));
                }
                Ok(self.designated.clone())
            }
            Some(name) => {
                if name.contains(['/', '\\']) {
                    return Err(ToolError::InvalidArguments(
                        "filename must be a bare file name without path separators".to_string(),
                    ));
                }
                let path = self.dir.join(name);
                if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    return Err(ToolError::NotFound(format!("PDF file {}", path.display())));
                }
                Ok(path)
            }
            None => {
                let names = pdf_names(&self.dir).await?;
                match names.as_slice() {
                    [only] => {
                        debug!(file = %only, "Using the only PDF in the folder");
                        Ok(self.dir.join(only))
                    }
                    [] => Err(ToolError::NotFound(format!(
                        "no PDF files in {}",
                        self.dir.display()
                    ))),
                    several => Err(ToolError::InvalidArguments(format!(
                        "several PDF files found, pass filename to choose one: {}",
                        several.join(", ")
                    ))),
                }
            }
        }
    }
}

#[async_trait]
impl Tool for ParsePdfTool {
    fn name(&self) -> &str {
        "parse_pdf"
    }

    fn description(&self) -> &str {
        "Extracts the text of a PDF; use \"@designated\" for the designated KPI file."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema::<ParsePdfArgs>()
    }

    async fn execute(&self, args: JsonMap) -> Result<JsonMap, ToolError> {
        let args: ParsePdfArgs = parse_args(args)?;
        let path = self.resolve(args.filename.as_deref()).await?;

        info!(file = %path.display(), "Extracting PDF text");
        let source = path.clone();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&source))
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("PDF extraction aborted: {}", e)))?
            .map_err(|e| {
                ToolError::ExecutionFailed(format!("could not read {}: {}", path.display(), e))
            })?;

        let text = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        let text = if text.is_empty() {
            NO_TEXT_PLACEHOLDER.to_string()
        } else {
            text
        };
        Ok(success([("text", text.into())]))
    }
}
