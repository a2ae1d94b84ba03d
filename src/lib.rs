//! # Report Agent
//!
//! An LLM-planned agent that turns one natural-language command into a
//! sequence of tool calls: look up the date, read to-dos and KPI documents,
//! draft a monthly feedback report, and export it.
//!
//! ## Features
//!
//! - **Agent Loop**: One tool per step, with context injection, stall
//!   detection, a step ceiling, and cancellation
//! - **Tool System**: Typed tools with schema-derived catalogs, callable
//!   in-process or through an HTTP tool server
//! - **LLM Providers**: Gemini and OpenAI-compatible chat completions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use report_agent::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load(None)?;
//!     let llm = config.provider.build_client()?;
//!
//!     let registry = Arc::new(default_registry(&config, Some(llm.clone()))?);
//!     let agent = Agent::with_registry(llm, registry, config.agent.clone());
//!
//!     let outcome = agent.run("Write this month's feedback report").await;
//!     println!("{:?}: {}", outcome.state, outcome.message);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod server;
pub mod session;
pub mod tool;
pub mod tools;

// Re-exports for convenient usage
pub use agent::{Agent, AgentConfig, AgentEvent, AgentOutcome, AgentState, ContextStore, PlannerDecision};
pub use config::{AppConfig, ConfigError};
pub use error::AppError;
pub use llm::{LLMClient, LLMClientBuilder, LLMError, LLMInput, LLMOutput};
pub use session::{ConversationHistory, Message, MessageRole};
pub use tool::{DynTool, Tool, ToolDefinition, ToolError, ToolInvoker, ToolRegistry, ToolResult};
pub use tools::default_registry;

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::agent::{Agent, AgentConfig, AgentEvent, AgentOutcome, AgentState};
    pub use crate::config::AppConfig;
    pub use crate::llm::{LLMClient, LLMClientBuilder};
    pub use crate::tool::{DynTool, Tool, ToolError, ToolRegistry, ToolResult};
    pub use crate::tools::default_registry;
}
