//! Google Gemini client.
//!
//! Talks to the `generateContent` endpoint directly. System turns become the
//! request's `systemInstruction`; planner output is sent with the `model`
//! role and everything else as `user`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{FinishReason, LLMClient, LLMError, LLMInput, LLMOutput, Usage};
use crate::session::{Message, MessageRole};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// An LLM client for the Google Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl GeminiClient {
    /// Creates a new Gemini client.
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, LLMError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_key,
            api_base: base_url.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        })
    }

    fn api_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    fn build_request(input: &LLMInput) -> GeminiRequest {
        let system_text: Vec<&str> = input
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.text.as_str())
            .collect();

        let system_instruction = (!system_text.is_empty()).then(|| GeminiSystemInstruction {
            parts: vec![GeminiPart {
                text: Some(system_text.join("\n\n")),
            }],
        });

        GeminiRequest {
            contents: Self::build_contents(&input.messages),
            system_instruction,
            generation_config: GeminiGenerationConfig {
                response_mime_type: input.json_mode.then(|| "application/json".to_string()),
                temperature: input.temperature,
                top_p: input.json_mode.then_some(0.9),
                max_output_tokens: input.max_tokens,
            },
        }
    }

    /// Converts non-system turns, folding consecutive turns of the same role
    /// into one content entry.
    fn build_contents(messages: &[Message]) -> Vec<GeminiContent> {
        let mut contents: Vec<GeminiContent> = Vec::new();

        for msg in messages {
            let role = match msg.role {
                MessageRole::System => continue,
                MessageRole::Assistant => "model",
                MessageRole::User | MessageRole::Tool => "user",
            };
            let part = GeminiPart {
                text: Some(msg.text.clone()),
            };

            match contents.last_mut() {
                Some(last) if last.role == role => last.parts.push(part),
                _ => contents.push(GeminiContent {
                    role: role.to_string(),
                    parts: vec![part],
                }),
            }
        }

        contents
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn complete(&self, input: LLMInput) -> Result<LLMOutput, LLMError> {
        let request = Self::build_request(&input);
        debug!(model = %input.model, contents = request.contents.len(), "Sending request to Gemini");

        let response = self
            .client
            .post(self.api_url(&input.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| LLMError::InvalidResponse(e.to_string()))?;

        debug!(%status, "Gemini response: {}", response_text);

        match status.as_u16() {
            200..=299 => {}
            401 | 403 => return Err(LLMError::AuthError(response_text)),
            429 => return Err(LLMError::RateLimitError(response_text)),
            _ => return Err(LLMError::ApiError(format!("{}: {}", status, response_text))),
        }

        let response: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| LLMError::InvalidResponse(format!("{}: {}", e, response_text)))?;

        let candidate = response
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| LLMError::InvalidResponse("No candidates in Gemini response".to_string()))?;

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let finish_reason = match candidate.finish_reason.as_deref() {
            Some("STOP") => FinishReason::Stop,
            Some("MAX_TOKENS") => FinishReason::MaxTokens,
            Some("SAFETY") | Some("RECITATION") => FinishReason::Safety,
            _ => FinishReason::Other,
        };

        let usage = response
            .usage_metadata
            .map(|u| Usage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        Ok(LLMOutput {
            text,
            finish_reason,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(messages: Vec<Message>, json_mode: bool) -> LLMInput {
        LLMInput {
            model: "gemini-2.0-flash".to_string(),
            messages,
            max_tokens: 8192,
            temperature: Some(0.2),
            json_mode,
        }
    }

    #[test]
    fn system_turns_become_system_instruction() {
        let request = GeminiClient::build_request(&input(
            vec![Message::new_system("catalog"), Message::new_user("hello")],
            true,
        ));

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "catalog");
        assert_eq!(json["contents"].as_array().unwrap().len(), 1);
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[test]
    fn consecutive_user_turns_are_folded() {
        let contents = GeminiClient::build_contents(&[
            Message::new_user("command"),
            Message::new_assistant("{\"tool_code\":\"get_today\"}"),
            Message::new_tool_feedback("ok"),
            Message::new_user("follow-up"),
        ]);

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1].role, "model");
        assert_eq!(contents[2].role, "user");
        assert_eq!(contents[2].parts.len(), 2);
    }

    #[test]
    fn plain_requests_omit_json_mime_type() {
        let request = GeminiClient::build_request(&input(vec![Message::new_user("hi")], false));
        let json = serde_json::to_value(&request).unwrap();
        assert!(json["systemInstruction"].is_null());
        assert!(json["generationConfig"].get("responseMimeType").is_none());
    }
}
