//! Error types for the document Q&A service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Per-document extraction failure; never aborts sibling documents in a batch
    #[error("failed to extract '{filename}': {message}")]
    Extraction { filename: String, message: String },

    /// The embedding model cannot be loaded or reached
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The index storage is unreachable or corrupted
    #[error("vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// The persisted index was built with a different embedding configuration
    #[error("index was built with model '{indexed_model}' ({indexed_dimensions} dims) but '{configured_model}' ({configured_dimensions} dims) is configured")]
    IndexModelMismatch {
        indexed_model: String,
        indexed_dimensions: usize,
        configured_model: String,
        configured_dimensions: usize,
    },

    /// Caller error: bad top_k, empty query, invalid parameters
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The language-model endpoint failed, rejected authentication, or ran out of quota
    #[error("generation endpoint unavailable: {0}")]
    GenerationUnavailable(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an extraction error for a specific file
    pub fn extraction(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            filename: filename.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::Config(_) => (StatusCode::BAD_REQUEST, "config_error"),
            Error::Extraction { .. } => (StatusCode::BAD_REQUEST, "extraction_error"),
            Error::EmbeddingUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "embedding_unavailable")
            }
            Error::IndexUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "index_unavailable")
            }
            Error::IndexModelMismatch { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "index_model_mismatch")
            }
            Error::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            Error::GenerationUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "generation_unavailable")
            }
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
