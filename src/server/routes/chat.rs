//! Chat endpoints, non-streaming and streaming

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use futures::StreamExt;

use crate::error::{Error, Result};
use crate::generation::StreamEvent;
use crate::server::state::AppState;
use crate::types::{ChatRequest, ChatResponse, SourceRef};

/// POST /api/chat - answer a question from the indexed documents
///
/// An empty index is not an error: retrieval comes back empty and the
/// answer states that there is not enough information.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let (query, top_k, threshold) = unpack(&state, &request)?;
    tracing::info!(%query, top_k, "chat request");

    let bundle = state.retriever().retrieve(query, top_k, threshold).await?;
    let response = state
        .generator()
        .answer(query, &bundle, &request.history)
        .await?;

    let sources = bundle.chunks().iter().map(SourceRef::from_chunk).collect();
    Ok(Json(ChatResponse { response, sources }))
}

/// POST /api/chat/stream - streamed answer as server-sent events
///
/// One `data:` event per fragment, terminated by `data: [DONE]`. A failure
/// mid-stream is delivered as a final `data: Error: ...` event; fragments
/// already sent stay with the client.
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let (query, top_k, threshold) = unpack(&state, &request)?;
    tracing::info!(%query, top_k, "streaming chat request");

    let bundle = state.retriever().retrieve(query, top_k, threshold).await?;
    let answer = state
        .generator()
        .answer_stream(query, &bundle, &request.history)
        .await?;

    let events = answer.map(|item| {
        let event = match item {
            Ok(StreamEvent::Fragment(text)) => Event::default().data(text),
            Ok(StreamEvent::Done) => Event::default().data("[DONE]"),
            Err(e) => Event::default().data(format!("Error: {e}")),
        };
        Ok(event)
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn unpack<'a>(
    state: &AppState,
    request: &'a ChatRequest,
) -> Result<(&'a str, usize, Option<f32>)> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(Error::InvalidArgument("query must not be empty".into()));
    }
    let config = state.config();
    let top_k = request.top_k.unwrap_or(config.retrieval.top_k);
    let threshold = request
        .similarity_threshold
        .or(config.retrieval.similarity_threshold);
    Ok((query, top_k, threshold))
}
