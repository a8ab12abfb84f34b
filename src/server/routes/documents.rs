//! Document registry endpoints

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::DocumentSummary;

/// GET /api/documents - list ingested documents, oldest first
pub async fn list_documents(State(state): State<AppState>) -> Json<Vec<DocumentSummary>> {
    let mut documents = state.list_documents();
    documents.sort_by_key(|document| document.ingested_at);
    Json(documents.iter().map(DocumentSummary::from).collect())
}

/// POST /api/reset - clear the index and the document registry
pub async fn reset_index(State(state): State<AppState>) -> Result<Json<Value>> {
    state.reset()?;
    tracing::info!("index reset by request");
    Ok(Json(json!({
        "status": "reset",
        "document_count": 0
    })))
}
