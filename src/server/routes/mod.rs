//! API routes

pub mod chat;
pub mod documents;
pub mod upload;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::server::state::AppState;
use crate::types::HealthResponse;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(upload::upload_documents).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/chat", post(chat::chat))
        .route("/chat/stream", post(chat::chat_stream))
        .route("/documents", get(documents::list_documents))
        .route("/reset", post(documents::reset_index))
        .route("/health", get(health))
        .route("/info", get(info))
}

/// GET /api/health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let count = state.index().count();
    Json(HealthResponse {
        status: "healthy",
        initialized: count > 0,
        document_count: count,
    })
}

/// GET /api/info
async fn info() -> Json<Value> {
    Json(json!({
        "name": "docqa",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document Q&A with semantic retrieval and streamed answers",
        "endpoints": {
            "POST /api/upload": "Upload and index documents",
            "POST /api/chat": "Ask a question about the indexed documents",
            "POST /api/chat/stream": "Ask a question, streamed as server-sent events",
            "GET /api/documents": "List indexed documents",
            "POST /api/reset": "Clear the index and document registry",
            "GET /api/health": "Service health and index size"
        }
    }))
}
