//! Shared application state

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::Generator;
use crate::index::VectorIndex;
use crate::ingestion::IngestPipeline;
use crate::providers::{EmbeddingProvider, LlmProvider, OllamaEmbedder, OllamaGenerator};
use crate::retrieval::Retriever;
use crate::types::Document;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    index: Arc<VectorIndex>,
    pipeline: IngestPipeline,
    retriever: Retriever,
    generator: Generator,
    /// Registry of successfully ingested documents, informational only
    documents: DashMap<Uuid, Document>,
}

impl AppState {
    /// Wire up the index, providers, and pipelines from configuration
    pub fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("initializing application state");

        let index = Arc::new(VectorIndex::open(
            &config.index.storage_dir,
            &config.embedding.model,
            config.embedding.dimensions,
        )?);

        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(OllamaEmbedder::new(&config.embedding)?);
        let llm: Arc<dyn LlmProvider> = Arc::new(OllamaGenerator::new(&config.llm)?);

        let pipeline = IngestPipeline::new(&config, Arc::clone(&embedder), Arc::clone(&index))?;
        let retriever = Retriever::new(
            Arc::clone(&embedder),
            Arc::clone(&index),
            config.retrieval.max_context_chars,
        );
        let generator = Generator::new(llm);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                index,
                pipeline,
                retriever,
                generator,
                documents: DashMap::new(),
            }),
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.inner.index
    }

    pub fn pipeline(&self) -> &IngestPipeline {
        &self.inner.pipeline
    }

    pub fn retriever(&self) -> &Retriever {
        &self.inner.retriever
    }

    pub fn generator(&self) -> &Generator {
        &self.inner.generator
    }

    /// Record a successfully ingested document
    pub fn add_document(&self, document: Document) {
        self.inner.documents.insert(document.id, document);
    }

    /// All known documents, unordered
    pub fn list_documents(&self) -> Vec<Document> {
        self.inner
            .documents
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Clear the index and the document registry. Irreversible.
    pub fn reset(&self) -> Result<()> {
        self.inner.index.reset()?;
        self.inner.documents.clear();
        Ok(())
    }
}
