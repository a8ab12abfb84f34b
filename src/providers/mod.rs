//! Provider traits and implementations for embeddings and generation

pub mod embedding;
pub mod llm;
pub mod ollama;

pub use embedding::EmbeddingProvider;
pub use llm::{ChatMessage, FragmentStream, LlmProvider, MessageRole};
pub use ollama::{OllamaEmbedder, OllamaGenerator};
