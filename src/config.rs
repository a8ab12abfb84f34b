//! Configuration for the document Q&A service
//!
//! Every value has a documented default and an independent environment
//! override, so the service can be configured entirely from the environment
//! at startup via [`RagConfig::from_env`].

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embedding: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Generation model configuration
    pub llm: LlmConfig,
    /// Vector index configuration
    pub index: IndexConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Ingestion configuration
    pub ingestion: IngestionConfig,
}

impl RagConfig {
    /// Build the configuration from the environment. Unset variables keep
    /// their documented defaults; unparsable values are a config error.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        override_str(&mut config.server.host, "DOCQA_HOST")?;
        override_parsed(&mut config.server.port, "DOCQA_PORT")?;
        override_parsed(&mut config.server.enable_cors, "DOCQA_ENABLE_CORS")?;
        override_parsed(&mut config.server.max_upload_size, "DOCQA_MAX_UPLOAD_SIZE")?;

        override_str(&mut config.embedding.base_url, "DOCQA_EMBED_URL")?;
        override_str(&mut config.embedding.model, "DOCQA_EMBED_MODEL")?;
        override_parsed(&mut config.embedding.dimensions, "DOCQA_EMBED_DIMENSIONS")?;
        override_parsed(&mut config.embedding.timeout_secs, "DOCQA_EMBED_TIMEOUT_SECS")?;
        override_parsed(&mut config.embedding.max_retries, "DOCQA_EMBED_RETRIES")?;

        override_parsed(&mut config.chunking.chunk_size, "DOCQA_CHUNK_SIZE")?;
        override_parsed(&mut config.chunking.chunk_overlap, "DOCQA_CHUNK_OVERLAP")?;

        override_str(&mut config.llm.base_url, "DOCQA_LLM_URL")?;
        override_str(&mut config.llm.model, "DOCQA_LLM_MODEL")?;
        override_parsed(&mut config.llm.temperature, "DOCQA_TEMPERATURE")?;
        override_parsed(&mut config.llm.max_tokens, "DOCQA_MAX_TOKENS")?;
        override_parsed(&mut config.llm.timeout_secs, "DOCQA_LLM_TIMEOUT_SECS")?;
        override_parsed(&mut config.llm.max_retries, "DOCQA_LLM_RETRIES")?;

        if let Some(dir) = read_env("DOCQA_STORAGE_DIR")? {
            config.index.storage_dir = PathBuf::from(dir);
        }

        override_parsed(&mut config.retrieval.top_k, "DOCQA_TOP_K")?;
        if let Some(threshold) = parse_env::<f32>("DOCQA_SIMILARITY_THRESHOLD")? {
            config.retrieval.similarity_threshold = Some(threshold);
        }
        override_parsed(&mut config.retrieval.max_context_chars, "DOCQA_MAX_CONTEXT_CHARS")?;

        override_parsed(&mut config.ingestion.file_timeout_secs, "DOCQA_FILE_TIMEOUT_SECS")?;
        if let Some(parallel) = parse_env::<usize>("DOCQA_PARALLEL_FILES")? {
            config.ingestion.parallel_files = Some(parallel);
        }

        Ok(config)
    }
}

fn read_env(name: &str) -> Result<Option<String>> {
    match env::var(name) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::Config(format!("{name}: {e}"))),
    }
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match read_env(name)? {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("{name}={raw}: {e}"))),
        None => Ok(None),
    }
}

fn override_str(target: &mut String, name: &str) -> Result<()> {
    if let Some(value) = read_env(name)? {
        *target = value;
    }
    Ok(())
}

fn override_parsed<T: FromStr>(target: &mut T, name: &str) -> Result<()>
where
    T::Err: std::fmt::Display,
{
    if let Some(value) = parse_env(name)? {
        *target = value;
    }
    Ok(())
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen host. Default `0.0.0.0` (`DOCQA_HOST`)
    pub host: String,
    /// Listen port. Default `8000` (`DOCQA_PORT`)
    pub port: u16,
    /// Enable permissive CORS. Default `true` (`DOCQA_ENABLE_CORS`)
    pub enable_cors: bool,
    /// Maximum upload body size in bytes. Default 100MB (`DOCQA_MAX_UPLOAD_SIZE`)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024,
        }
    }
}

/// Embedding configuration
///
/// The same model configuration must be used to embed stored chunks and
/// incoming queries; the index manifest enforces the pairing at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding endpoint base URL. Default `http://localhost:11434` (`DOCQA_EMBED_URL`)
    pub base_url: String,
    /// Embedding model identifier. Default `all-minilm` (`DOCQA_EMBED_MODEL`)
    pub model: String,
    /// Embedding dimensionality. Default `384` (`DOCQA_EMBED_DIMENSIONS`)
    pub dimensions: usize,
    /// Request timeout in seconds. Default `30` (`DOCQA_EMBED_TIMEOUT_SECS`)
    pub timeout_secs: u64,
    /// Retries for failed requests. Default `2` (`DOCQA_EMBED_RETRIES`)
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters. Default `1000` (`DOCQA_CHUNK_SIZE`)
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters. Default `200` (`DOCQA_CHUNK_OVERLAP`)
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Generation model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Generation endpoint base URL. Default `http://localhost:11434` (`DOCQA_LLM_URL`)
    pub base_url: String,
    /// Generation model identifier. Default `llama3.2:3b` (`DOCQA_LLM_MODEL`)
    pub model: String,
    /// Sampling temperature. Default `0.1` (`DOCQA_TEMPERATURE`)
    pub temperature: f32,
    /// Maximum tokens generated per answer. Default `1024` (`DOCQA_MAX_TOKENS`)
    pub max_tokens: u32,
    /// Request timeout in seconds; also bounds how long a stream may run.
    /// Default `120` (`DOCQA_LLM_TIMEOUT_SECS`)
    pub timeout_secs: u64,
    /// Retries for failed non-streaming requests. Default `2` (`DOCQA_LLM_RETRIES`)
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            temperature: 0.1,
            max_tokens: 1024,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding the persisted index. Default: platform-local data
    /// directory + `docqa` (`DOCQA_STORAGE_DIR`)
    pub storage_dir: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        let storage_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docqa");
        Self { storage_dir }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default number of chunks retrieved per query. Default `5` (`DOCQA_TOP_K`)
    pub top_k: usize,
    /// Minimum similarity for a retrieved chunk to be used; `None` disables
    /// the filter. Default: disabled (`DOCQA_SIMILARITY_THRESHOLD`)
    pub similarity_threshold: Option<f32>,
    /// Maximum assembled context length in characters. Default `12000`
    /// (`DOCQA_MAX_CONTEXT_CHARS`)
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: None,
            max_context_chars: 12_000,
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Per-file processing timeout in seconds. Default `300` (`DOCQA_FILE_TIMEOUT_SECS`)
    pub file_timeout_secs: u64,
    /// Concurrent files per upload batch; `None` auto-detects from the CPU
    /// count, capped at 4 (`DOCQA_PARALLEL_FILES`)
    pub parallel_files: Option<usize>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            file_timeout_secs: 300,
            parallel_files: None,
        }
    }
}
