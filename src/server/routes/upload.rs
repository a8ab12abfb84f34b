//! Document upload endpoint

use std::time::Instant;

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::error::{Error, Result};
use crate::ingestion::UploadedFile;
use crate::server::state::AppState;
use crate::types::{DocumentSummary, IngestResponse};

/// POST /api/upload - ingest a batch of documents
///
/// Responds with per-file outcomes: a corrupt or unsupported file is listed
/// under `failures` while the rest of the batch is indexed normally.
pub async fn upload_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    let start = Instant::now();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidArgument(format!("failed to read multipart field: {e}")))?
    {
        let Some(filename) = field.file_name().map(|name| name.to_string()) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidArgument(format!("failed to read '{filename}': {e}")))?;

        tracing::info!(file = %filename, bytes = data.len(), "received upload");
        files.push(UploadedFile {
            filename,
            data: data.to_vec(),
        });
    }

    if files.is_empty() {
        return Err(Error::InvalidArgument("no files provided".into()));
    }

    let report = state.pipeline().ingest_batch(files).await;

    let documents: Vec<DocumentSummary> = report.documents.iter().map(DocumentSummary::from).collect();
    for document in report.documents {
        state.add_document(document);
    }

    Ok(Json(IngestResponse {
        success: !documents.is_empty(),
        documents,
        failures: report.failures,
        total_chunks_created: report.chunks_created,
        index_count: state.index().count(),
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
