use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{FinishReason, LLMClient, LLMError, LLMInput, LLMOutput, Usage};
use crate::session::{Message, MessageRole};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI API response for chat completions.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: UsageInfo,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UsageInfo {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

/// An LLM client for OpenAI's API and compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    base_url: String,
}

impl OpenAIClient {
    /// Creates a new OpenAI client.
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, LLMError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| LLMError::AuthError(e.to_string()))?,
        );
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let mut client_builder = reqwest::Client::builder().default_headers(headers);

        if let Some(timeout) = timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder.build()?;

        Ok(Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    /// Creates a request builder for chat completions.
    fn chat_completions_request(&self, input: &LLMInput) -> RequestBuilder {
        let body = ChatRequest {
            model: input.model.clone(),
            messages: Self::build_messages(&input.messages),
            response_format: input
                .json_mode
                .then(|| serde_json::json!({ "type": "json_object" })),
            max_tokens: Some(input.max_tokens),
            temperature: input.temperature,
            stream: false,
        };

        debug!(model = %input.model, "Sending request to OpenAI");

        self.client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body)
    }

    /// Builds messages for the API request.
    ///
    /// Tool feedback goes back as a user turn: the planner speaks JSON, not
    /// the provider's native tool-call protocol.
    fn build_messages(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    MessageRole::System => "system",
                    MessageRole::User | MessageRole::Tool => "user",
                    MessageRole::Assistant => "assistant",
                };
                serde_json::json!({
                    "role": role,
                    "content": msg.text,
                })
            })
            .collect()
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn complete(&self, input: LLMInput) -> Result<LLMOutput, LLMError> {
        let request = self.chat_completions_request(&input);

        let response = request.send().await?;
        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| LLMError::InvalidResponse(e.to_string()))?;

        debug!(%status, "LLM response: {}", response_text);

        match status.as_u16() {
            200..=299 => {}
            401 | 403 => return Err(LLMError::AuthError(response_text)),
            429 => return Err(LLMError::RateLimitError(response_text)),
            _ => return Err(LLMError::ApiError(format!("{}: {}", status, response_text))),
        }

        let response: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| LLMError::InvalidResponse(format!("{}: {}", e, response_text)))?;

        let Some(choice) = response.choices.into_iter().next() else {
            return Err(LLMError::InvalidResponse(format!(
                "No choices in response. Response: {}",
                response_text
            )));
        };

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::MaxTokens,
            Some("content_filter") => FinishReason::Safety,
            _ => FinishReason::Other,
        };

        Ok(LLMOutput {
            text: choice.message.content.unwrap_or_default(),
            finish_reason,
            usage: Usage {
                input_tokens: response.usage.prompt_tokens,
                output_tokens: response.usage.completion_tokens,
            },
        })
    }
}
