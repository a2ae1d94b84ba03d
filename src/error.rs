//! Error types for the report-agent binary and servers.

use thiserror::Error;

/// Unified error type for the application surfaces.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be assembled
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// LLM-related error
    #[error("LLM error: {0}")]
    LLM(#[from] crate::llm::LLMError),

    /// Built-in tools could not be set up
    #[error("Tool error: {0}")]
    Tool(#[from] crate::tool::ToolError),

    /// Remote tool server could not be reached
    #[error("Transport error: {0}")]
    Transport(#[from] crate::tool::TransportError),

    /// Tool server failed to start or stopped abnormally
    #[error("Server error: {0}")]
    Server(#[from] crate::server::ServerError),
}

/// Result alias for [`AppError`].
pub type Result<T, E = AppError> = std::result::Result<T, E>;
