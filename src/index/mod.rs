//! Durable vector index with cosine-similarity search
//!
//! Records live in memory behind a read-write lock and are persisted to an
//! append-only JSON-lines log under the configured storage directory. A
//! manifest binds the index to the embedding model that built it; opening
//! with a different model configuration fails fast instead of silently
//! returning degraded similarity scores.

use std::cmp::Ordering;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

const MANIFEST_FILE: &str = "manifest.json";
const RECORDS_FILE: &str = "records.jsonl";

/// Manifest binding an index directory to its embedding configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub embedding_model: String,
    pub dimensions: usize,
}

/// Metadata carried with every indexed record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Document the chunk came from
    pub document_id: Uuid,
    /// Source document filename
    pub source: String,
    /// Position of the chunk within its document
    pub chunk_index: u32,
}

/// A stored record: embedding, chunk text, and provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedRecord {
    /// Index-scoped identifier, assigned at insertion
    pub id: u64,
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: RecordMetadata,
}

/// A record staged for insertion; the index assigns the id
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: RecordMetadata,
}

/// One search result, ranked by similarity
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: u64,
    pub text: String,
    /// Cosine similarity in [-1, 1]; higher is more similar
    pub score: f32,
    pub metadata: RecordMetadata,
}

/// Durable cosine-similarity vector index
pub struct VectorIndex {
    dimensions: usize,
    state: RwLock<IndexState>,
}

struct IndexState {
    records: Vec<IndexedRecord>,
    next_id: u64,
    log: File,
}

impl VectorIndex {
    /// Open (or create) the index stored under `dir`, bound to the given
    /// embedding model configuration.
    pub fn open(dir: impl AsRef<Path>, embedding_model: &str, dimensions: usize) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .map_err(|e| unavailable(dir, "create storage directory", &e))?;

        let manifest = IndexManifest {
            embedding_model: embedding_model.to_string(),
            dimensions,
        };
        let manifest_path = dir.join(MANIFEST_FILE);
        if manifest_path.exists() {
            let raw = fs::read_to_string(&manifest_path)
                .map_err(|e| unavailable(dir, "read manifest", &e))?;
            let existing: IndexManifest = serde_json::from_str(&raw).map_err(|e| {
                Error::IndexUnavailable(format!(
                    "corrupt manifest at {}: {e}",
                    manifest_path.display()
                ))
            })?;
            if existing != manifest {
                return Err(Error::IndexModelMismatch {
                    indexed_model: existing.embedding_model,
                    indexed_dimensions: existing.dimensions,
                    configured_model: manifest.embedding_model,
                    configured_dimensions: manifest.dimensions,
                });
            }
        } else {
            let raw = serde_json::to_string_pretty(&manifest)
                .map_err(|e| Error::IndexUnavailable(format!("encode manifest: {e}")))?;
            fs::write(&manifest_path, raw).map_err(|e| unavailable(dir, "write manifest", &e))?;
        }

        let log_path = dir.join(RECORDS_FILE);
        let (records, valid_len) = load_records(&log_path)?;
        let next_id = records.last().map(|r| r.id + 1).unwrap_or(0);

        truncate_torn_tail(&log_path, valid_len)?;

        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| unavailable(dir, "open record log", &e))?;

        tracing::info!(
            records = records.len(),
            path = %dir.display(),
            model = embedding_model,
            "vector index opened"
        );

        Ok(Self {
            dimensions,
            state: RwLock::new(IndexState {
                records,
                next_id,
                log,
            }),
        })
    }

    /// Embedding dimensionality this index was built with
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Append records, assigning each a unique index-scoped id. The whole
    /// batch is written and synced under one write lock, so concurrent
    /// readers see either none or all of it.
    pub fn insert(&self, records: Vec<NewRecord>) -> Result<Vec<u64>> {
        for record in &records {
            if record.embedding.len() != self.dimensions {
                return Err(Error::InvalidArgument(format!(
                    "embedding has {} dimensions, index expects {}",
                    record.embedding.len(),
                    self.dimensions
                )));
            }
        }
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = self.state.write();
        let mut ids = Vec::with_capacity(records.len());
        let mut staged = Vec::with_capacity(records.len());
        let mut buffer = String::new();

        for record in records {
            let id = state.next_id + staged.len() as u64;
            let indexed = IndexedRecord {
                id,
                embedding: record.embedding,
                text: record.text,
                metadata: record.metadata,
            };
            buffer.push_str(
                &serde_json::to_string(&indexed)
                    .map_err(|e| Error::IndexUnavailable(format!("encode record: {e}")))?,
            );
            buffer.push('\n');
            ids.push(id);
            staged.push(indexed);
        }

        state
            .log
            .write_all(buffer.as_bytes())
            .map_err(|e| Error::IndexUnavailable(format!("append records: {e}")))?;
        state
            .log
            .sync_data()
            .map_err(|e| Error::IndexUnavailable(format!("sync record log: {e}")))?;

        state.next_id += staged.len() as u64;
        state.records.append(&mut staged);

        Ok(ids)
    }

    /// Return up to `top_k` records ranked by cosine similarity, descending.
    /// Ties resolve by insertion order, earlier first.
    pub fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        if top_k == 0 {
            return Err(Error::InvalidArgument("top_k must be positive".into()));
        }
        if vector.len() != self.dimensions {
            return Err(Error::InvalidArgument(format!(
                "query vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimensions
            )));
        }

        let state = self.state.read();
        let mut scored: Vec<(f32, usize)> = state
            .records
            .iter()
            .enumerate()
            .map(|(pos, record)| (cosine_similarity(vector, &record.embedding), pos))
            .collect();

        // Stable sort keeps insertion order for equal scores.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, pos)| {
                let record = &state.records[pos];
                SearchHit {
                    id: record.id,
                    text: record.text.clone(),
                    score,
                    metadata: record.metadata.clone(),
                }
            })
            .collect())
    }

    /// Number of stored records
    pub fn count(&self) -> usize {
        self.state.read().records.len()
    }

    /// Clear all records irreversibly. The manifest is kept: the index stays
    /// bound to its embedding model across resets.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.state.write();
        state
            .log
            .set_len(0)
            .map_err(|e| Error::IndexUnavailable(format!("truncate record log: {e}")))?;
        state
            .log
            .sync_data()
            .map_err(|e| Error::IndexUnavailable(format!("sync record log: {e}")))?;
        state.records.clear();
        state.next_id = 0;
        tracing::info!("vector index reset");
        Ok(())
    }
}

/// Cosine similarity of two equal-length vectors; 0.0 if either is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Replay the record log. Returns the records and the byte length of the
/// valid prefix; anything past it is a torn trailer from a crash mid-append.
fn load_records(path: &Path) -> Result<(Vec<IndexedRecord>, u64)> {
    if !path.exists() {
        return Ok((Vec::new(), 0));
    }
    let raw = fs::read(path)
        .map_err(|e| Error::IndexUnavailable(format!("read {}: {e}", path.display())))?;

    let mut records = Vec::new();
    let mut valid_len = 0usize;
    let mut pos = 0usize;
    let mut line_no = 0usize;

    while pos < raw.len() {
        line_no += 1;
        let (segment_end, is_last) = match raw[pos..].iter().position(|b| *b == b'\n') {
            Some(newline) => (pos + newline + 1, pos + newline + 1 == raw.len()),
            None => (raw.len(), true),
        };
        let line = &raw[pos..segment_end];
        let trimmed = line
            .strip_suffix(b"\n")
            .unwrap_or(line);

        if trimmed.iter().all(|b| b.is_ascii_whitespace()) {
            valid_len = segment_end;
            pos = segment_end;
            continue;
        }

        match serde_json::from_slice::<IndexedRecord>(trimmed) {
            Ok(record) => {
                records.push(record);
                valid_len = segment_end;
            }
            // A torn trailing line means the process died mid-append;
            // everything before it is intact. The tail is truncated away
            // before the log is reopened for append.
            Err(e) if is_last => {
                tracing::warn!(
                    "dropping torn trailing record in {}: {e}",
                    path.display()
                );
            }
            Err(e) => {
                return Err(Error::IndexUnavailable(format!(
                    "corrupt record log {} (line {line_no}): {e}",
                    path.display()
                )));
            }
        }
        pos = segment_end;
    }

    Ok((records, valid_len as u64))
}

/// Cut a torn trailer off the log so the next append starts on a clean line.
fn truncate_torn_tail(path: &Path, valid_len: u64) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| Error::IndexUnavailable(format!("open {}: {e}", path.display())))?;
    let current_len = file
        .metadata()
        .map_err(|e| Error::IndexUnavailable(format!("stat {}: {e}", path.display())))?
        .len();
    if current_len > valid_len {
        file.set_len(valid_len)
            .map_err(|e| Error::IndexUnavailable(format!("truncate {}: {e}", path.display())))?;
        file.sync_data()
            .map_err(|e| Error::IndexUnavailable(format!("sync {}: {e}", path.display())))?;
    }
    Ok(())
}

fn unavailable(dir: &Path, action: &str, err: &std::io::Error) -> Error {
    Error::IndexUnavailable(format!("{action} at {}: {err}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(embedding: Vec<f32>, text: &str) -> NewRecord {
        NewRecord {
            embedding,
            text: text.to_string(),
            metadata: RecordMetadata {
                document_id: Uuid::new_v4(),
                source: "test.txt".to_string(),
                chunk_index: 0,
            },
        }
    }

    #[test]
    fn exact_match_ranks_first() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::open(dir.path(), "stub", 3).unwrap();
        index
            .insert(vec![
                record(vec![0.0, 1.0, 0.0], "orthogonal"),
                record(vec![1.0, 0.0, 0.0], "exact"),
                record(vec![0.7, 0.7, 0.0], "diagonal"),
            ])
            .unwrap();

        let hits = index.query(&[1.0, 0.0, 0.0], 3).unwrap();
        assert_eq!(hits[0].text, "exact");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert!(hits[0].score >= hits[1].score);
        assert!(hits[1].score >= hits[2].score);
    }

    #[test]
    fn top_k_bounds_results() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::open(dir.path(), "stub", 2).unwrap();
        for i in 0..5 {
            index
                .insert(vec![record(vec![1.0, i as f32], &format!("r{i}"))])
                .unwrap();
        }

        assert_eq!(index.query(&[1.0, 0.0], 3).unwrap().len(), 3);
        assert_eq!(index.query(&[1.0, 0.0], 10).unwrap().len(), 5);
    }

    #[test]
    fn querying_an_empty_index_returns_nothing() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::open(dir.path(), "stub", 2).unwrap();
        assert_eq!(index.count(), 0);
        assert!(index.query(&[1.0, 0.0], 7).unwrap().is_empty());
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::open(dir.path(), "stub", 2).unwrap();
        assert!(matches!(
            index.query(&[1.0, 0.0], 0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::open(dir.path(), "stub", 2).unwrap();
        assert!(matches!(
            index.query(&[1.0, 0.0, 0.0], 1),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            index.insert(vec![record(vec![1.0], "short")]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn ties_resolve_by_insertion_order() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::open(dir.path(), "stub", 2).unwrap();
        index
            .insert(vec![
                record(vec![1.0, 0.0], "first"),
                record(vec![1.0, 0.0], "second"),
            ])
            .unwrap();

        let hits = index.query(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].text, "first");
        assert_eq!(hits[1].text, "second");
        assert!(hits[0].id < hits[1].id);
    }

    #[test]
    fn reset_clears_everything() {
        let dir = tempdir().unwrap();
        let index = VectorIndex::open(dir.path(), "stub", 2).unwrap();
        index
            .insert(vec![record(vec![1.0, 0.0], "a"), record(vec![0.0, 1.0], "b")])
            .unwrap();
        assert_eq!(index.count(), 2);

        index.reset().unwrap();
        assert_eq!(index.count(), 0);
        assert!(index.query(&[1.0, 0.0], 1).unwrap().is_empty());
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let index = VectorIndex::open(dir.path(), "stub", 2).unwrap();
            index
                .insert(vec![
                    record(vec![1.0, 0.0], "a"),
                    record(vec![0.0, 1.0], "b"),
                    record(vec![0.5, 0.5], "c"),
                ])
                .unwrap();
        }

        let index = VectorIndex::open(dir.path(), "stub", 2).unwrap();
        assert_eq!(index.count(), 3);
        assert_eq!(index.query(&[1.0, 0.0], 1).unwrap()[0].text, "a");

        // Ids keep increasing after a reopen.
        let ids = index.insert(vec![record(vec![1.0, 1.0], "d")]).unwrap();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn model_mismatch_fails_fast() {
        let dir = tempdir().unwrap();
        {
            VectorIndex::open(dir.path(), "model-a", 2).unwrap();
        }
        assert!(matches!(
            VectorIndex::open(dir.path(), "model-b", 2),
            Err(Error::IndexModelMismatch { .. })
        ));
        assert!(matches!(
            VectorIndex::open(dir.path(), "model-a", 4),
            Err(Error::IndexModelMismatch { .. })
        ));
    }

    #[test]
    fn torn_trailing_line_is_skipped_on_replay() {
        let dir = tempdir().unwrap();
        {
            let index = VectorIndex::open(dir.path(), "stub", 2).unwrap();
            index
                .insert(vec![record(vec![1.0, 0.0], "a"), record(vec![0.0, 1.0], "b")])
                .unwrap();
        }

        let mut log = OpenOptions::new()
            .append(true)
            .open(dir.path().join(RECORDS_FILE))
            .unwrap();
        log.write_all(b"{\"id\":99,\"embedding\":[0.1,").unwrap();
        drop(log);

        let index = VectorIndex::open(dir.path(), "stub", 2).unwrap();
        assert_eq!(index.count(), 2);

        // The torn tail was cut off, so appends after recovery replay cleanly.
        index.insert(vec![record(vec![0.5, 0.5], "c")]).unwrap();
        drop(index);
        let reopened = VectorIndex::open(dir.path(), "stub", 2).unwrap();
        assert_eq!(reopened.count(), 3);
    }

    #[test]
    fn zero_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }
}
