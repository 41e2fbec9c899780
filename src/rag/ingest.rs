//! Offline document ingestion: split source documents into overlapping
//! chunks, embed them, and upsert into the vector store.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::store::{StoredChunk, VectorStore};
use crate::core::config::RagSettings;
use crate::core::errors::PipelineError;
use crate::llm::LlmProvider;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

/// A text chunk with source information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    pub source: String,
    /// Character offset in the original document
    pub start_offset: usize,
    /// Chunk index within the source
    pub chunk_index: usize,
}

/// Splits text into overlapping character windows, snapping chunk ends to
/// sentence boundaries where one exists near the end of the window.
pub struct DocumentSplitter {
    config: SplitterConfig,
}

impl DocumentSplitter {
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    pub fn split(&self, text: &str, source: &str) -> Vec<TextChunk> {
        let chunk_size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();

        if total_chars == 0 {
            return chunks;
        }

        let step = chunk_size.saturating_sub(overlap).max(1);
        let mut start = 0;
        let mut chunk_index = 0;

        while start < total_chars {
            let end = (start + chunk_size).min(total_chars);
            let chunk_text: String = chars[start..end].iter().collect();

            let final_text = if end < total_chars {
                snap_to_sentence_boundary(&chunk_text)
            } else {
                chunk_text
            };

            let trimmed = final_text.trim();
            if !trimmed.is_empty() {
                chunks.push(TextChunk {
                    text: trimmed.to_string(),
                    source: source.to_string(),
                    start_offset: start,
                    chunk_index,
                });
                chunk_index += 1;
            }

            start += step;
        }

        chunks
    }
}

/// Cuts the chunk at the last sentence ending found in its final 20%,
/// if any. Byte indices are clamped to char boundaries.
fn snap_to_sentence_boundary(text: &str) -> String {
    let sentence_endings = [". ", "! ", "? ", ".\n", "!\n", "?\n", "。", "」 "];

    let mut search_start = (text.len() * 80) / 100;
    while search_start > 0 && !text.is_char_boundary(search_start) {
        search_start -= 1;
    }
    let search_text = &text[search_start..];

    for ending in sentence_endings.iter() {
        if let Some(pos) = search_text.rfind(ending) {
            let cut_pos = search_start + pos + ending.len();
            return text[..cut_pos].to_string();
        }
    }

    text.to_string()
}

/// One-shot ingestion job: read a document, split, embed, upsert.
///
/// Chunk ids are `<source>#<index>`, and each run first drops the rows left
/// by a previous run of the same source, so re-ingesting replaces the index
/// entries instead of growing them even when the document shrank.
pub struct DocumentIngestor {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn VectorStore>,
    splitter: DocumentSplitter,
    collection: String,
    embedding_model: String,
}

impl DocumentIngestor {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStore>,
        rag: &RagSettings,
        embedding_model: String,
    ) -> Self {
        Self {
            provider,
            store,
            splitter: DocumentSplitter::new(SplitterConfig {
                chunk_size: rag.chunk_size,
                chunk_overlap: rag.chunk_overlap,
            }),
            collection: rag.collection.clone(),
            embedding_model,
        }
    }

    /// Ingests a single text file. Returns the number of chunks written.
    pub async fn ingest_file(&self, path: &Path) -> Result<usize, PipelineError> {
        let text = fs::read_to_string(path)
            .map_err(|e| PipelineError::Retrieval(format!("{}: {}", path.display(), e)))?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let chunks = self.splitter.split(&text, &source);

        // A shrunk document produces fewer chunks than before; stale
        // higher-index rows must not survive the re-ingest.
        self.store.delete_source(&self.collection, &source).await?;

        if chunks.is_empty() {
            return Ok(0);
        }

        let inputs: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.provider.embed(&inputs, &self.embedding_model).await?;

        let items: Vec<(StoredChunk, Vec<f32>)> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                (
                    StoredChunk {
                        chunk_id: format!("{}#{}", chunk.source, chunk.chunk_index),
                        content: chunk.text,
                        source: chunk.source,
                        collection: self.collection.clone(),
                        metadata: Some(json!({
                            "start_offset": chunk.start_offset,
                            "chunk_index": chunk.chunk_index,
                        })),
                    },
                    embedding,
                )
            })
            .collect();

        let written = items.len();
        self.store.upsert_batch(items).await?;
        Ok(written)
    }

    /// Ingests every `.txt` file directly under `dir`, in name order.
    /// Returns the total number of chunks written.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<usize, PipelineError> {
        let entries = fs::read_dir(dir)
            .map_err(|e| PipelineError::Retrieval(format!("{}: {}", dir.display(), e)))?;

        let mut files: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().map(|ext| ext == "txt").unwrap_or(false))
            .collect();
        files.sort();

        let mut total = 0;
        for path in files {
            let written = self.ingest_file(&path).await?;
            tracing::info!("ingested {} chunks from {}", written, path.display());
            total += written;
        }
        Ok(total)
    }
}
