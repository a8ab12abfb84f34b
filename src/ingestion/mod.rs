//! Document ingestion: extract, chunk, embed, and index uploaded files
//!
//! Each document moves through extraction, chunking, embedding, and index
//! insertion independently. A failure at any stage fails that document only
//! and is reported back with the stage that failed; sibling documents in the
//! same batch are unaffected.

pub mod chunker;
pub mod extractor;

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::RagConfig;
use crate::index::{NewRecord, RecordMetadata, VectorIndex};
use crate::providers::EmbeddingProvider;
use crate::types::{Document, FileFormat};

pub use chunker::{Chunk, TextChunker};
pub use extractor::{ExtractedText, ExtractorRegistry, TextExtractor};

/// A file received from the upload boundary
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Pipeline stage at which a document failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Extract,
    Chunk,
    Embed,
    Index,
}

/// A per-document ingestion failure
#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    pub filename: String,
    /// Stage that failed; absent when the whole document timed out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<IngestStage>,
    pub reason: String,
}

impl IngestFailure {
    fn at(stage: IngestStage, filename: &str, error: &crate::error::Error) -> Self {
        Self {
            filename: filename.to_string(),
            stage: Some(stage),
            reason: error.to_string(),
        }
    }
}

/// Outcome of an upload batch. Partial success is the normal shape: indexed
/// documents and per-file failures are reported side by side.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub documents: Vec<Document>,
    pub failures: Vec<IngestFailure>,
    pub chunks_created: u32,
}

/// Ingestion pipeline: extraction registry, chunker, embedder, and index
pub struct IngestPipeline {
    registry: ExtractorRegistry,
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    file_timeout: Duration,
    parallel_files: usize,
}

impl IngestPipeline {
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<VectorIndex>,
    ) -> crate::error::Result<Self> {
        let chunker = TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
        let parallel_files = config
            .ingestion
            .parallel_files
            .unwrap_or_else(|| num_cpus::get().min(4))
            .max(1);

        Ok(Self {
            registry: ExtractorRegistry::with_defaults(),
            chunker,
            embedder,
            index,
            file_timeout: Duration::from_secs(config.ingestion.file_timeout_secs),
            parallel_files,
        })
    }

    /// Ingest a batch of files. Documents are processed independently with
    /// bounded concurrency; one bad file never aborts its siblings.
    ///
    /// Re-uploading a file appends new chunks; nothing is deduplicated or
    /// replaced unless the index is reset first.
    pub async fn ingest_batch(&self, files: Vec<UploadedFile>) -> IngestReport {
        let outcomes = stream::iter(files.into_iter().map(|file| self.ingest_with_timeout(file)))
            .buffer_unordered(self.parallel_files)
            .collect::<Vec<_>>()
            .await;

        let mut report = IngestReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(document) => {
                    report.chunks_created += document.total_chunks;
                    report.documents.push(document);
                }
                Err(failure) => {
                    tracing::warn!(
                        file = %failure.filename,
                        reason = %failure.reason,
                        "ingestion failed"
                    );
                    report.failures.push(failure);
                }
            }
        }

        tracing::info!(
            succeeded = report.documents.len(),
            failed = report.failures.len(),
            chunks = report.chunks_created,
            "batch ingested"
        );
        report
    }

    async fn ingest_with_timeout(
        &self,
        file: UploadedFile,
    ) -> std::result::Result<Document, IngestFailure> {
        let filename = file.filename.clone();
        match tokio::time::timeout(self.file_timeout, self.ingest_one(file)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(IngestFailure {
                filename,
                stage: None,
                reason: format!("timed out after {}s", self.file_timeout.as_secs()),
            }),
        }
    }

    async fn ingest_one(
        &self,
        file: UploadedFile,
    ) -> std::result::Result<Document, IngestFailure> {
        let extracted = self
            .registry
            .extract(&file.filename, &file.data)
            .map_err(|e| IngestFailure::at(IngestStage::Extract, &file.filename, &e))?;

        let chunks = self.chunker.split(&extracted.text);

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| IngestFailure::at(IngestStage::Embed, &file.filename, &e))?;

        if embeddings.len() != chunks.len() {
            return Err(IngestFailure {
                filename: file.filename.clone(),
                stage: Some(IngestStage::Embed),
                reason: format!(
                    "provider returned {} embeddings for {} chunks",
                    embeddings.len(),
                    chunks.len()
                ),
            });
        }

        let mut document = Document::new(
            &file.filename,
            FileFormat::from_filename(&file.filename),
            hash_bytes(&file.data),
            file.data.len() as u64,
        );
        document.total_pages = extracted.pages;

        let records: Vec<NewRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| NewRecord {
                embedding,
                text: chunk.text.clone(),
                metadata: RecordMetadata {
                    document_id: document.id,
                    source: document.filename.clone(),
                    chunk_index: chunk.index,
                },
            })
            .collect();

        self.index
            .insert(records)
            .map_err(|e| IngestFailure::at(IngestStage::Index, &file.filename, &e))?;

        document.total_chunks = chunks.len() as u32;
        tracing::info!(
            file = %document.filename,
            chunks = document.total_chunks,
            "document indexed"
        );
        Ok(document)
    }
}

/// SHA-256 of the uploaded bytes
fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
