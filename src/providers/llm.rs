//! Language-model provider trait for answer generation

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Role of a chat message sent to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// One message of a chat exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Lazy, single-pass stream of answer fragments. The stream ends after the
/// final fragment; a transport failure surfaces as an `Err` item and
/// terminates it. Dropping the stream releases the underlying connection.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// Trait for language-model completion
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate the full completion for a chat exchange, blocking until the
    /// whole text is available
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Generate a completion as a fragment stream
    async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<FragmentStream>;

    /// Identifier of the underlying model
    fn model_id(&self) -> &str;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;
}
