//! LLM client abstraction and wire types.
//!
//! Agents talk to the model through the [`LlmClient`] trait so the runtime
//! can be exercised in tests without a network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod openrouter;

pub use openrouter::OpenRouterClient;

/// Message role in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Token usage reported by the provider.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// Response from a chat completion call.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Assistant text, if the model produced any.
    pub content: Option<String>,
    /// Usage report, if the provider returned one.
    pub usage: Option<TokenUsage>,
}

/// Client interface for chat completions.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run a single chat completion against `model`.
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> anyhow::Result<ChatResponse>;
}
