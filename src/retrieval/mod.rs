//! Query-time retrieval and context assembly
//!
//! A query is embedded with the same provider configuration used at
//! ingestion time (the index manifest enforces the pairing), matched against
//! the index, and the surviving chunks are concatenated best-first into a
//! bounded context string for generation.

use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::index::{RecordMetadata, VectorIndex};
use crate::providers::EmbeddingProvider;

/// Separator placed between chunks in the assembled context
pub const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

/// A retrieved chunk with its similarity score
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub text: String,
    pub score: f32,
    pub metadata: RecordMetadata,
}

/// Context assembled for generation
///
/// `Empty` is a designed outcome, not an error: it signals that no indexed
/// chunk was relevant enough, so generation should answer accordingly
/// instead of working from a blank context.
#[derive(Debug, Clone)]
pub enum ContextBundle {
    Relevant {
        /// Chunk texts joined best-first with [`CHUNK_SEPARATOR`]
        context: String,
        /// The chunks that made it into the context, best first
        chunks: Vec<ScoredChunk>,
    },
    Empty,
}

impl ContextBundle {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Chunks included in the context, best first; empty for `Empty`
    pub fn chunks(&self) -> &[ScoredChunk] {
        match self {
            Self::Relevant { chunks, .. } => chunks,
            Self::Empty => &[],
        }
    }
}

/// Retrieves and assembles context for queries
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    max_context_chars: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<VectorIndex>,
        max_context_chars: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            max_context_chars,
        }
    }

    /// Retrieve up to `top_k` chunks for a query and assemble them into a
    /// bounded context. Chunks scoring below `similarity_threshold` are
    /// dropped when a threshold is given.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        similarity_threshold: Option<f32>,
    ) -> Result<ContextBundle> {
        if query.trim().is_empty() {
            return Err(Error::InvalidArgument("query must not be empty".into()));
        }
        if top_k == 0 {
            return Err(Error::InvalidArgument("top_k must be positive".into()));
        }
        if self.index.count() == 0 {
            return Ok(ContextBundle::Empty);
        }

        let query_embedding = self.embedder.embed(query).await?;
        let hits = self.index.query(&query_embedding, top_k)?;

        let mut chunks: Vec<ScoredChunk> = hits
            .into_iter()
            .map(|hit| ScoredChunk {
                text: hit.text,
                score: hit.score,
                metadata: hit.metadata,
            })
            .collect();

        if let Some(threshold) = similarity_threshold {
            chunks.retain(|chunk| chunk.score >= threshold);
        }
        if chunks.is_empty() {
            return Ok(ContextBundle::Empty);
        }

        Ok(self.assemble(chunks))
    }

    /// Concatenate chunks best-first until the context budget is spent;
    /// lowest-ranked chunks are the first to be dropped.
    fn assemble(&self, ranked: Vec<ScoredChunk>) -> ContextBundle {
        let mut context = String::new();
        let mut used_chars = 0usize;
        let mut kept = Vec::new();

        for chunk in ranked {
            let mut section = format!("[Document {}]\n{}", kept.len() + 1, chunk.text);
            let separator_chars = if kept.is_empty() {
                0
            } else {
                CHUNK_SEPARATOR.chars().count()
            };
            let section_chars = section.chars().count();

            if used_chars + separator_chars + section_chars > self.max_context_chars {
                if kept.is_empty() {
                    // Even the best chunk is over budget on its own; keep a
                    // truncated head rather than returning nothing.
                    section = truncate_chars(&section, self.max_context_chars);
                    context.push_str(&section);
                    kept.push(chunk);
                }
                break;
            }

            if !kept.is_empty() {
                context.push_str(CHUNK_SEPARATOR);
            }
            context.push_str(&section);
            used_chars += separator_chars + section_chars;
            kept.push(chunk);
        }

        ContextBundle::Relevant {
            context,
            chunks: kept,
        }
    }
}

/// Truncate to at most `max_chars`, never splitting a grapheme cluster
fn truncate_chars(text: &str, max_chars: usize) -> String {
    let mut out = String::new();
    let mut count = 0usize;
    for grapheme in text.graphemes(true) {
        let grapheme_chars = grapheme.chars().count();
        if count + grapheme_chars > max_chars {
            break;
        }
        out.push_str(grapheme);
        count += grapheme_chars;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::NewRecord;
    use async_trait::async_trait;
    use tempfile::tempdir;
    use uuid::Uuid;

    const DIMS: usize = 4;

    /// Maps fixed query strings to fixed vectors so scores are exact.
    struct RoutedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for RoutedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(match text {
                "toward-a" => vec![1.0, 0.0, 0.0, 0.0],
                _ => vec![0.0, 0.0, 0.0, 1.0],
            })
        }

        fn dimensions(&self) -> usize {
            DIMS
        }

        fn model_id(&self) -> &str {
            "routed"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn stored(embedding: Vec<f32>, text: &str, chunk_index: u32) -> NewRecord {
        NewRecord {
            embedding,
            text: text.to_string(),
            metadata: RecordMetadata {
                document_id: Uuid::new_v4(),
                source: "source.txt".to_string(),
                chunk_index,
            },
        }
    }

    fn retriever_at(dir: &std::path::Path, max_context_chars: usize) -> (Retriever, Arc<VectorIndex>) {
        let index = Arc::new(VectorIndex::open(dir, "routed", DIMS).unwrap());
        let retriever = Retriever::new(Arc::new(RoutedEmbedder), Arc::clone(&index), max_context_chars);
        (retriever, index)
    }

    #[tokio::test]
    async fn empty_index_yields_the_empty_sentinel() {
        let dir = tempdir().unwrap();
        let (retriever, _index) = retriever_at(dir.path(), 1000);

        let bundle = retriever.retrieve("toward-a", 3, None).await.unwrap();
        assert!(bundle.is_empty());
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let dir = tempdir().unwrap();
        let (retriever, _index) = retriever_at(dir.path(), 1000);

        assert!(matches!(
            retriever.retrieve("   ", 3, None).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            retriever.retrieve("toward-a", 0, None).await,
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn chunks_come_back_best_first_with_separators() {
        let dir = tempdir().unwrap();
        let (retriever, index) = retriever_at(dir.path(), 10_000);
        index
            .insert(vec![
                stored(vec![0.5, 0.5, 0.0, 0.0], "partial match", 1),
                stored(vec![1.0, 0.0, 0.0, 0.0], "exact match", 0),
            ])
            .unwrap();

        let bundle = retriever.retrieve("toward-a", 5, None).await.unwrap();
        let ContextBundle::Relevant { context, chunks } = bundle else {
            panic!("expected relevant context");
        };

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "exact match");
        assert!(chunks[0].score > chunks[1].score);
        assert!(context.starts_with("[Document 1]\nexact match"));
        assert!(context.contains(CHUNK_SEPARATOR));
        assert!(context.contains("[Document 2]\npartial match"));
    }

    #[tokio::test]
    async fn threshold_drops_weak_matches() {
        let dir = tempdir().unwrap();
        let (retriever, index) = retriever_at(dir.path(), 10_000);
        index
            .insert(vec![
                stored(vec![1.0, 0.0, 0.0, 0.0], "exact match", 0),
                stored(vec![0.5, 0.5, 0.0, 0.0], "partial match", 1),
            ])
            .unwrap();

        let bundle = retriever.retrieve("toward-a", 5, Some(0.9)).await.unwrap();
        assert_eq!(bundle.chunks().len(), 1);
        assert_eq!(bundle.chunks()[0].text, "exact match");
    }

    #[tokio::test]
    async fn impossible_threshold_yields_the_empty_sentinel() {
        let dir = tempdir().unwrap();
        let (retriever, index) = retriever_at(dir.path(), 10_000);
        index
            .insert(vec![stored(vec![1.0, 0.0, 0.0, 0.0], "exact match", 0)])
            .unwrap();

        let bundle = retriever.retrieve("toward-a", 5, Some(1.1)).await.unwrap();
        assert!(bundle.is_empty());
    }

    #[tokio::test]
    async fn context_budget_drops_lowest_ranked_chunks_first() {
        let dir = tempdir().unwrap();
        // Enough budget for the first section but not a second one.
        let (retriever, index) = retriever_at(dir.path(), 40);
        index
            .insert(vec![
                stored(vec![1.0, 0.0, 0.0, 0.0], "twenty-five characters!!!", 0),
                stored(vec![0.9, 0.1, 0.0, 0.0], "this one should be dropped", 1),
            ])
            .unwrap();

        let bundle = retriever.retrieve("toward-a", 5, None).await.unwrap();
        let ContextBundle::Relevant { context, chunks } = bundle else {
            panic!("expected relevant context");
        };

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "twenty-five characters!!!");
        assert!(!context.contains("dropped"));
    }

    #[tokio::test]
    async fn oversized_best_chunk_is_truncated_not_dropped() {
        let dir = tempdir().unwrap();
        let (retriever, index) = retriever_at(dir.path(), 30);
        index
            .insert(vec![stored(
                vec![1.0, 0.0, 0.0, 0.0],
                &"long ".repeat(50),
                0,
            )])
            .unwrap();

        let bundle = retriever.retrieve("toward-a", 1, None).await.unwrap();
        let ContextBundle::Relevant { context, chunks } = bundle else {
            panic!("expected relevant context");
        };

        assert_eq!(chunks.len(), 1);
        assert_eq!(context.chars().count(), 30);
    }
}
