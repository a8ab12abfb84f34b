//! docqa: retrieval-augmented question answering over uploaded documents
//!
//! Documents are split into overlapping chunks, embedded, and stored in a
//! durable cosine-similarity index. At query time the most relevant chunks
//! are assembled into a bounded context and a language model answers from
//! that context, either streamed or as a single response.

pub mod config;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use generation::{Generator, StreamEvent};
pub use index::VectorIndex;
pub use ingestion::{IngestPipeline, IngestReport, UploadedFile};
pub use retrieval::{ContextBundle, Retriever};
pub use types::{ChatRequest, ChatResponse, ConversationTurn, Document, FileFormat};
