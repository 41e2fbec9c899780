use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::PipelineError;

/// A stored document chunk. Created during ingestion, immutable afterwards,
/// owned exclusively by the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Deterministic id (`<source>#<chunk_index>`), so re-ingesting the same
    /// document with the same parameters replaces rather than duplicates.
    pub chunk_id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Source document identifier (filename).
    pub source: String,
    /// Collection the chunk belongs to.
    pub collection: String,
    /// Optional metadata (JSON), e.g. start_offset / chunk_index.
    pub metadata: Option<serde_json::Value>,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

/// Abstract interface over the persistent vector index.
///
/// Failures map to `PipelineError::Retrieval`.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace a chunk with its embedding vector.
    async fn upsert(&self, chunk: StoredChunk, embedding: Vec<f32>) -> Result<(), PipelineError>;

    /// Insert or replace multiple chunks in one transaction.
    async fn upsert_batch(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), PipelineError>;

    /// Top-`limit` chunks of `collection` most similar to the query
    /// embedding, best first.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        collection: &str,
    ) -> Result<Vec<ChunkSearchResult>, PipelineError>;

    /// Total chunk count, optionally filtered by collection.
    async fn count(&self, collection: Option<&str>) -> Result<usize, PipelineError>;

    /// Delete all chunks ingested from one source document.
    async fn delete_source(&self, collection: &str, source: &str)
        -> Result<usize, PipelineError>;
}
