pub mod client;
pub mod gemini;
pub mod openai;

pub use client::{
    FinishReason, GenerationSettings, LLMClient, LLMClientBuilder, LLMError, LLMInput, LLMOutput,
    Usage, generate_text,
};
pub use gemini::GeminiClient;
pub use openai::OpenAIClient;
