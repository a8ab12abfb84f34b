//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;

use crate::error::Result;

/// Trait for generating text embeddings
///
/// One fixed, versioned model configuration must be used for the lifetime of
/// an index: chunks embedded at ingestion time and queries embedded at
/// search time are only comparable when they come from the same model. The
/// provider cannot detect a mismatch itself; the index manifest enforces the
/// pairing at startup.
///
/// Embeddings are deterministic: the same text yields the same vector
/// (within floating-point reproducibility) across calls.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Embedding dimensionality (e.g. 384 for all-minilm)
    fn dimensions(&self) -> usize;

    /// Identifier of the underlying model configuration
    fn model_id(&self) -> &str;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;
}
