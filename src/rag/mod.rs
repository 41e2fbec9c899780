//! Retrieval: vector store abstraction, SQLite-backed implementation, and
//! the offline document ingestion path (split, embed, upsert).

pub mod ingest;
pub mod sqlite;
pub mod store;

pub use ingest::{DocumentIngestor, DocumentSplitter, SplitterConfig, TextChunk};
pub use sqlite::SqliteVectorStore;
pub use store::{ChunkSearchResult, StoredChunk, VectorStore};
