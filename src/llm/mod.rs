//! Language-model access.
//!
//! Agents talk to the model only through [`LanguageModel`]: one prompt in, one
//! completion out. [`OpenAiClient`] implements it over a chat-completions API.

pub mod openai;

pub use openai::{OpenAiClient, OpenAiConfig};

use crate::error::LlmResult;
use async_trait::async_trait;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a single user prompt.
    async fn complete(&self, prompt: &str) -> LlmResult<String>;
}
