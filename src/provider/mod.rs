//! LLM gateway abstraction.
//!
//! A [`Provider`] turns an ordered list of role-tagged messages into one
//! generated reply for a given model id. The dispatcher only ever talks to
//! the trait; credential and transport details stay in the implementation.

mod gigachat;

pub use gigachat::GigaChatProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Unified chat request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model id (a registry id).
    pub model: String,
    /// Ordered conversation messages.
    pub messages: Vec<ChatMessage>,
}

/// Token usage reported by the backend.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: i64,
    #[serde(default)]
    pub completion_tokens: i64,
    #[serde(default)]
    pub total_tokens: i64,
}

/// One generated reply.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Model that produced the reply.
    pub model: String,
    /// Reply text.
    pub content: String,
    pub usage: TokenUsage,
    /// Response latency in milliseconds.
    pub latency_ms: u64,
}

/// Generation failure carrying the upstream cause.
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{provider}:{model}] {message}")]
pub struct ProviderError {
    pub provider: String,
    pub model: String,
    pub message: String,
    pub status_code: Option<u16>,
}

/// Unified interface for LLM backends.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Send a chat completion request.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;
}
