//! Response types for the HTTP API

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ingestion::IngestFailure;
use crate::retrieval::ScoredChunk;
use crate::types::document::{Document, FileFormat};

/// A retrieved chunk cited in a chat response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    /// Similarity score of the chunk against the query
    pub score: f32,
    /// Short preview of the chunk text
    pub preview: String,
    /// Source document filename
    pub source: String,
    /// Position of the chunk within its document
    pub chunk_index: u32,
}

impl SourceRef {
    /// Build a source reference from a retrieved chunk
    pub fn from_chunk(chunk: &ScoredChunk) -> Self {
        Self {
            score: chunk.score,
            preview: preview_text(&chunk.text, 200),
            source: chunk.metadata.source.clone(),
            chunk_index: chunk.metadata.chunk_index,
        }
    }
}

fn preview_text(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let mut preview: String = trimmed.chars().take(max_chars).collect();
    if trimmed.chars().count() > max_chars {
        preview.push_str("...");
    }
    preview
}

/// Chat response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The generated answer
    pub response: String,
    /// Chunks the answer was grounded in, best match first
    pub sources: Vec<SourceRef>,
}

/// Summary of an ingested document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub filename: String,
    pub format: FileFormat,
    pub total_chunks: u32,
    pub file_size: u64,
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Document> for DocumentSummary {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id,
            filename: document.filename.clone(),
            format: document.format.clone(),
            total_chunks: document.total_chunks,
            file_size: document.file_size,
            ingested_at: document.ingested_at,
        }
    }
}

/// Upload batch response. Partial success is a normal outcome: failed files
/// are listed with reasons, successful ones are indexed regardless.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    /// Whether at least one document was indexed
    pub success: bool,
    /// Documents that were indexed
    pub documents: Vec<DocumentSummary>,
    /// Per-file failures with reasons
    pub failures: Vec<IngestFailure>,
    /// Chunks created across the batch
    pub total_chunks_created: u32,
    /// Records in the index after the batch
    pub index_count: usize,
    /// Batch wall-clock time
    pub processing_time_ms: u64,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Derived from the index record count; no separately tracked flag
    pub initialized: bool,
    pub document_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let text = "é".repeat(300);
        let preview = preview_text(&text, 200);
        assert_eq!(preview.chars().count(), 203); // 200 chars + "..."
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn preview_keeps_short_text_intact() {
        assert_eq!(preview_text("  short  ", 200), "short");
    }
}
