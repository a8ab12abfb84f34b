//! Wire and domain types

pub mod document;
pub mod query;
pub mod response;

pub use document::{Document, FileFormat};
pub use query::{ChatRequest, ConversationTurn, TurnRole};
pub use response::{ChatResponse, DocumentSummary, HealthResponse, IngestResponse, SourceRef};
