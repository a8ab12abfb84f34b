//! Chat request types

use serde::{Deserialize, Serialize};

/// Role of a prior conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// A question from the user
    User,
    /// A previous answer from the assistant
    Assistant,
}

/// One turn of conversation history, supplied by the caller on each request.
/// The service keeps no conversation state of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

/// Chat request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The question to answer
    pub query: String,

    /// Number of chunks to retrieve; falls back to the configured default
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Minimum similarity for retrieved chunks; falls back to the configured
    /// default
    #[serde(default)]
    pub similarity_threshold: Option<f32>,

    /// Prior conversation turns, oldest first
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

impl ChatRequest {
    /// Create a request with defaults for everything but the query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: None,
            similarity_threshold: None,
            history: Vec::new(),
        }
    }
}
