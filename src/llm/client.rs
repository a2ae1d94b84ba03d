use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::gemini::GeminiClient;
use super::openai::OpenAIClient;
use crate::session::Message;

/// Input for an LLM request.
#[derive(Debug, Clone)]
pub struct LLMInput {
    /// The model to use
    pub model: String,
    /// The conversation to send, system turns included
    pub messages: Vec<Message>,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Optional temperature (0.0 to 1.0)
    pub temperature: Option<f32>,
    /// Ask the provider for a bare JSON response
    pub json_mode: bool,
}

/// Output from an LLM response.
#[derive(Debug, Clone)]
pub struct LLMOutput {
    /// The raw text of the response
    pub text: String,
    /// The reason the response finished
    pub finish_reason: FinishReason,
    /// Token usage statistics
    pub usage: Usage,
}

/// The reason the LLM finished generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop point reached
    Stop,
    /// Maximum tokens reached
    MaxTokens,
    /// Blocked by the provider's safety filters
    Safety,
    /// Stopped for any other reason
    Other,
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Number of input tokens
    pub input_tokens: u32,
    /// Number of output tokens
    pub output_tokens: u32,
}

/// Errors that can occur when communicating with an LLM.
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    /// An API error occurred
    #[error("API error: {0}")]
    ApiError(String),
    /// A network error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    /// The response from the LLM was invalid
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),
    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),
}

/// Trait for LLM clients.
///
/// The agent loop uses it as its planner; the summarization and report tools
/// use it for plain text generation.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Sends a request and returns the complete response.
    async fn complete(&self, input: LLMInput) -> Result<LLMOutput, LLMError>;
}

/// Generation parameters shared by every request a component makes.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl GenerationSettings {
    /// Builds a request carrying `messages` with these settings.
    pub fn input(&self, messages: Vec<Message>, json_mode: bool) -> LLMInput {
        LLMInput {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            json_mode,
        }
    }
}

/// Sends a single free-text prompt and returns the trimmed response text.
pub async fn generate_text(
    client: &dyn LLMClient,
    settings: &GenerationSettings,
    prompt: impl Into<String>,
) -> Result<String, LLMError> {
    let input = settings.input(vec![Message::new_user(prompt)], false);
    let output = client.complete(input).await?;
    Ok(output.text.trim().to_string())
}

/// A builder for creating LLM clients.
#[derive(Debug, Default)]
pub struct LLMClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl LLMClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets an optional base URL.
    pub fn with_base_url_opt(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Creates an OpenAI-compatible client.
    pub fn build_openai(self) -> Result<Arc<dyn LLMClient>, LLMError> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or(LLMError::AuthError("OpenAI API key not provided".to_string()))?;
        Ok(Arc::new(OpenAIClient::new(
            api_key,
            self.base_url,
            self.timeout,
        )?))
    }

    /// Creates a Gemini client.
    pub fn build_gemini(self) -> Result<Arc<dyn LLMClient>, LLMError> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .ok_or(LLMError::AuthError("Gemini API key not provided".to_string()))?;
        Ok(Arc::new(GeminiClient::new(
            api_key,
            self.base_url,
            self.timeout,
        )?))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mockall::mock;

    mock! {
        pub Llm {}

        #[async_trait]
        impl LLMClient for Llm {
            async fn complete(&self, input: LLMInput) -> Result<LLMOutput, LLMError>;
        }
    }

    fn settings() -> GenerationSettings {
        GenerationSettings {
            model: "test-model".to_string(),
            max_tokens: 256,
            temperature: Some(0.2),
        }
    }

    #[tokio::test]
    async fn generate_text_trims_and_sends_plain_prompt() {
        let mut llm = MockLlm::new();
        llm.expect_complete()
            .withf(|input| {
                !input.json_mode
                    && input.model == "test-model"
                    && input.messages.len() == 1
                    && input.messages[0].text == "summarize this"
            })
            .times(1)
            .returning(|_| {
                Ok(LLMOutput {
                    text: "  short summary \n".to_string(),
                    finish_reason: FinishReason::Stop,
                    usage: Usage::default(),
                })
            });

        let text = generate_text(&llm, &settings(), "summarize this").await.unwrap();
        assert_eq!(text, "short summary");
    }

    #[tokio::test]
    async fn generate_text_propagates_errors() {
        let mut llm = MockLlm::new();
        llm.expect_complete()
            .returning(|_| Err(LLMError::ApiError("quota".to_string())));

        let err = generate_text(&llm, &settings(), "x").await.unwrap_err();
        assert!(err.to_string().contains("quota"));
    }
}
