//! SQLite-backed vector store.
//!
//! In-process index using SQLite for persistence and brute-force cosine
//! similarity for search. Collections are small (product docs), so a full
//! scan per query is acceptable.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ChunkSearchResult, StoredChunk, VectorStore};
use crate::core::errors::PipelineError;

pub struct SqliteVectorStore {
    pool: SqlitePool,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl SqliteVectorStore {
    pub async fn with_path(db_path: PathBuf) -> Result<Self, PipelineError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(PipelineError::retrieval)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), PipelineError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                chunk_id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL,
                metadata TEXT DEFAULT '{}',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(PipelineError::retrieval)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_collection ON chunks(collection)")
            .execute(&self.pool)
            .await
            .map_err(PipelineError::retrieval)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
        let metadata_str: String = row.get("metadata");
        let metadata = serde_json::from_str::<Value>(&metadata_str).ok();

        StoredChunk {
            chunk_id: row.get("chunk_id"),
            content: row.get("content"),
            source: row.get("source"),
            collection: row.get("collection"),
            metadata,
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, chunk: StoredChunk, embedding: Vec<f32>) -> Result<(), PipelineError> {
        self.upsert_batch(vec![(chunk, embedding)]).await
    }

    async fn upsert_batch(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), PipelineError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(PipelineError::retrieval)?;

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str = chunk
                .metadata
                .as_ref()
                .map(|m| serde_json::to_string(m).unwrap_or_default())
                .unwrap_or_else(|| "{}".to_string());

            sqlx::query(
                "INSERT OR REPLACE INTO chunks (chunk_id, collection, source, content, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.collection)
            .bind(&chunk.source)
            .bind(&chunk.content)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(PipelineError::retrieval)?;
        }

        tx.commit().await.map_err(PipelineError::retrieval)?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        collection: &str,
    ) -> Result<Vec<ChunkSearchResult>, PipelineError> {
        let rows = sqlx::query(
            "SELECT chunk_id, collection, source, content, metadata, embedding
             FROM chunks
             WHERE collection = ?1",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(PipelineError::retrieval)?;

        let mut scored: Vec<ChunkSearchResult> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored_emb = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored_emb);

                Some(ChunkSearchResult {
                    chunk: Self::row_to_chunk(row),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit.max(1));

        Ok(scored)
    }

    async fn count(&self, collection: Option<&str>) -> Result<usize, PipelineError> {
        let count: i64 = if let Some(collection) = collection {
            sqlx::query("SELECT COUNT(*) FROM chunks WHERE collection = ?1")
                .bind(collection)
                .fetch_one(&self.pool)
                .await
                .map_err(PipelineError::retrieval)?
                .get(0)
        } else {
            sqlx::query("SELECT COUNT(*) FROM chunks")
                .fetch_one(&self.pool)
                .await
                .map_err(PipelineError::retrieval)?
                .get(0)
        };

        Ok(count as usize)
    }

    async fn delete_source(
        &self,
        collection: &str,
        source: &str,
    ) -> Result<usize, PipelineError> {
        let result = sqlx::query("DELETE FROM chunks WHERE collection = ?1 AND source = ?2")
            .bind(collection)
            .bind(source)
            .execute(&self.pool)
            .await
            .map_err(PipelineError::retrieval)?;

        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, content: &str) -> StoredChunk {
        StoredChunk {
            chunk_id: id.to_string(),
            content: content.to_string(),
            source: "doc.txt".to_string(),
            collection: "dosu-bot".to_string(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn search_orders_by_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteVectorStore::with_path(dir.path().join("rag.db"))
            .await
            .unwrap();

        store
            .upsert_batch(vec![
                (chunk("a", "far"), vec![0.0, 1.0]),
                (chunk("b", "near"), vec![1.0, 0.1]),
                (chunk("c", "middle"), vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 2, "dosu-bot").await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_id, "b");
        assert_eq!(results[1].chunk.chunk_id, "c");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn upsert_with_same_id_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteVectorStore::with_path(dir.path().join("rag.db"))
            .await
            .unwrap();

        store.upsert(chunk("a", "v1"), vec![1.0, 0.0]).await.unwrap();
        store.upsert(chunk("a", "v2"), vec![1.0, 0.0]).await.unwrap();

        assert_eq!(store.count(Some("dosu-bot")).await.unwrap(), 1);
        let results = store.search(&[1.0, 0.0], 1, "dosu-bot").await.unwrap();
        assert_eq!(results[0].chunk.content, "v2");
    }

    #[tokio::test]
    async fn search_scopes_by_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteVectorStore::with_path(dir.path().join("rag.db"))
            .await
            .unwrap();

        let mut other = chunk("x", "other collection");
        other.collection = "other".to_string();
        store.upsert(other, vec![1.0, 0.0]).await.unwrap();

        let results = store.search(&[1.0, 0.0], 4, "dosu-bot").await.unwrap();
        assert!(results.is_empty());
    }
}
