//! Ollama-backed providers for embeddings and generation
//!
//! Both providers talk to an Ollama-compatible HTTP API with bounded
//! retries and a configured timeout. Retries are never unbounded; after the
//! last attempt the error is surfaced to the caller.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::{ChatMessage, FragmentStream, LlmProvider};

fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_max_idle_per_host(5)
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))
}

/// Retry a request with exponential backoff
async fn retry_request<F, Fut, T>(max_retries: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..=max_retries {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_error = Some(e);
                if attempt < max_retries {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    tracing::warn!(
                        "request failed (attempt {}/{}), retrying in {:?}",
                        attempt + 1,
                        max_retries + 1,
                        delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::Internal("retry loop without attempts".into())))
}

/// Ollama embedding provider
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
    max_retries: u32,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            max_retries: config.max_retries,
        })
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(transport_error(&e)))?;

        if !response.status().is_success() {
            return Err(Error::EmbeddingUnavailable(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(format!("malformed embedding response: {e}")))?;

        if parsed.embedding.len() != self.dimensions {
            return Err(Error::EmbeddingUnavailable(format!(
                "model '{}' returned {} dimensions, configured for {}",
                self.model,
                parsed.embedding.len(),
                self.dimensions
            )));
        }

        Ok(parsed.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        retry_request(self.max_retries, || self.embed_once(text)).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

/// Ollama generation provider
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatApiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatApiResponse {
    message: Option<ApiMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: String,
}

impl OllamaGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }

    fn request<'a>(&'a self, messages: &'a [ChatMessage], stream: bool) -> ChatApiRequest<'a> {
        ChatApiRequest {
            model: &self.model,
            messages,
            stream,
            options: ChatOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        }
    }

    async fn complete_once(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&self.request(messages, false))
            .send()
            .await
            .map_err(|e| Error::GenerationUnavailable(transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(generation_error(status, &body));
        }

        let parsed: ChatApiResponse = response.json().await.map_err(|e| {
            Error::GenerationUnavailable(format!("malformed generation response: {e}"))
        })?;

        Ok(parsed.message.map(|m| m.content).unwrap_or_default())
    }
}

#[async_trait]
impl LlmProvider for OllamaGenerator {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        retry_request(self.max_retries, || self.complete_once(messages)).await
    }

    async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<FragmentStream> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&self.request(messages, true))
            .send()
            .await
            .map_err(|e| Error::GenerationUnavailable(transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(generation_error(status, &body));
        }

        // The response body is newline-delimited JSON. Fragments can split
        // across network reads, so lines are reassembled through a buffer.
        struct StreamState {
            response: reqwest::Response,
            buffer: String,
        }

        let stream = stream::try_unfold(
            StreamState {
                response,
                buffer: String::new(),
            },
            |mut state| async move {
                loop {
                    if let Some(line_end) = state.buffer.find('\n') {
                        let line: String = state.buffer.drain(..=line_end).collect();
                        match parse_stream_line(line.trim())? {
                            StreamLine::Fragment(text) => return Ok(Some((text, state))),
                            StreamLine::Done => return Ok(None),
                            StreamLine::Skip => continue,
                        }
                    }

                    match state.response.chunk().await.map_err(|e| {
                        Error::GenerationUnavailable(format!("stream interrupted: {e}"))
                    })? {
                        Some(bytes) => {
                            state.buffer.push_str(&String::from_utf8_lossy(&bytes));
                        }
                        None => {
                            let rest = std::mem::take(&mut state.buffer);
                            match parse_stream_line(rest.trim())? {
                                StreamLine::Fragment(text) => return Ok(Some((text, state))),
                                StreamLine::Done | StreamLine::Skip => return Ok(None),
                            }
                        }
                    }
                }
            },
        );

        Ok(stream.boxed())
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

enum StreamLine {
    Fragment(String),
    Done,
    Skip,
}

fn parse_stream_line(line: &str) -> Result<StreamLine> {
    if line.is_empty() {
        return Ok(StreamLine::Skip);
    }
    let chunk: ChatApiResponse = serde_json::from_str(line)
        .map_err(|e| Error::GenerationUnavailable(format!("malformed stream payload: {e}")))?;
    if chunk.done {
        return Ok(StreamLine::Done);
    }
    let content = chunk.message.map(|m| m.content).unwrap_or_default();
    if content.is_empty() {
        return Ok(StreamLine::Skip);
    }
    Ok(StreamLine::Fragment(content))
}

fn generation_error(status: StatusCode, body: &str) -> Error {
    let message = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            format!("authentication rejected by model endpoint (HTTP {status})")
        }
        StatusCode::TOO_MANY_REQUESTS => {
            format!("model endpoint quota exceeded (HTTP {status})")
        }
        _ => format!("HTTP {status}: {body}"),
    };
    Error::GenerationUnavailable(message)
}

fn transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        err.to_string()
    }
}
