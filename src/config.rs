//! Process-wide configuration, built once at startup and passed down.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::agent::AgentConfig;
use crate::llm::{GenerationSettings, LLMClient, LLMClientBuilder, LLMError};
use std::sync::Arc;

/// Errors raised while assembling configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing API key: set {0}")]
    MissingApiKey(&'static str),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("unknown provider: {0} (expected gemini or openai)")]
    UnknownProvider(String),
    #[error("failed to load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
    #[error("failed to create LLM client: {0}")]
    Client(#[from] LLMError),
}

/// Which LLM backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    OpenAI,
}

impl ProviderKind {
    fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::OpenAI => "gpt-4o-mini",
        }
    }

    fn api_key_var(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::OpenAI => "OPENAI_API_KEY",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "openai" => Ok(ProviderKind::OpenAI),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// LLM connection settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn generation(&self) -> GenerationSettings {
        GenerationSettings {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
        }
    }

    /// Builds the client for the configured provider.
    pub fn build_client(&self) -> Result<Arc<dyn LLMClient>, ConfigError> {
        let api_key = self
            .api_key
            .clone()
            .ok_or(ConfigError::MissingApiKey(self.kind.api_key_var()))?;
        let builder = LLMClientBuilder::new()
            .with_api_key(api_key)
            .with_base_url_opt(self.base_url.clone())
            .with_timeout(self.timeout);
        let client = match self.kind {
            ProviderKind::Gemini => builder.build_gemini()?,
            ProviderKind::OpenAI => builder.build_openai()?,
        };
        Ok(client)
    }
}

/// File locations used by the tools.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
}

impl StorageConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn todo_file(&self) -> PathBuf {
        self.root.join("todos").join("todo_list.json")
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.root.join("pdf")
    }

    pub fn guide_dir(&self) -> PathBuf {
        self.root.join("guide")
    }

    pub fn designated_pdf(&self) -> PathBuf {
        self.guide_dir().join(DESIGNATED_PDF_NAME)
    }

    pub fn feedback_template(&self) -> PathBuf {
        self.guide_dir().join("feedback_template.md")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new("storage")
    }
}

/// File name of the designated KPI document inside the guide directory.
pub const DESIGNATED_PDF_NAME: &str = "selected_KPI.pdf";

/// Notion export credentials.
#[derive(Debug, Clone, Default)]
pub struct NotionConfig {
    pub api_key: Option<String>,
    pub page_id: Option<String>,
    pub base_url: Option<String>,
}

/// Everything the binary needs, resolved once.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub agent: AgentConfig,
    pub tool_server_url: Option<String>,
    /// Upper bound on one remote tool call or Notion request
    pub tool_timeout: Duration,
    pub storage: StorageConfig,
    pub notion: NotionConfig,
}

impl AppConfig {
    /// Loads `.env` (or `env_file`) into the process environment, then reads it.
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(env_file, &[])
    }

    /// Like [`AppConfig::load`], with `overrides` taking precedence over the
    /// environment. Keys are the environment variable names.
    pub fn load_with(
        env_file: Option<&Path>,
        overrides: &[(&str, String)],
    ) -> Result<Self, ConfigError> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|source| ConfigError::EnvFile {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            None => {
                if let Ok(path) = dotenvy::dotenv() {
                    debug!(path = %path.display(), "Loaded environment file");
                }
            }
        }
        Self::from_lookup(|key| {
            overrides
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.clone())
                .or_else(|| std::env::var(key).ok())
        })
    }

    /// Builds the configuration from a variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let kind = match var("LLM_PROVIDER") {
            Some(value) => value.parse()?,
            None => ProviderKind::Gemini,
        };

        let defaults = AgentConfig::default();
        let provider = ProviderConfig {
            kind,
            model: var("LLM_MODEL").unwrap_or_else(|| kind.default_model().to_string()),
            api_key: var(kind.api_key_var()),
            base_url: var("LLM_BASE_URL"),
            temperature: parse_var(&var, "LLM_TEMPERATURE", 0.2)?,
            max_tokens: parse_var(&var, "LLM_MAX_TOKENS", 8192)?,
            timeout: Duration::from_secs(parse_var(&var, "LLM_TIMEOUT_SECS", 60)?),
        };

        let agent = AgentConfig {
            generation: provider.generation(),
            max_steps: parse_var(&var, "AGENT_MAX_STEPS", defaults.max_steps)?,
            feedback_limit: parse_var(&var, "AGENT_FEEDBACK_LIMIT", defaults.feedback_limit)?,
            stall_threshold: parse_var(&var, "AGENT_STALL_THRESHOLD", defaults.stall_threshold)?,
        };

        let config = Self {
            provider,
            agent,
            tool_server_url: var("TOOL_SERVER_URL"),
            tool_timeout: Duration::from_secs(parse_var(&var, "TOOL_TIMEOUT_SECS", 120)?),
            storage: var("REPORT_AGENT_STORAGE")
                .map(StorageConfig::new)
                .unwrap_or_default(),
            notion: NotionConfig {
                api_key: var("NOTION_API_KEY"),
                page_id: var("NOTION_PAGE_ID"),
                base_url: None,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_steps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AGENT_MAX_STEPS",
                value: "0".to_string(),
            });
        }
        if self.agent.stall_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AGENT_STALL_THRESHOLD",
                value: "0".to_string(),
            });
        }
        if self.tool_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "TOOL_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}
