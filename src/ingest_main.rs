//! One-shot ingestion job: split the product documents under `datas/docs`,
//! embed them, and write the chunks into the persistent vector index.

use std::sync::Arc;

use anyhow::Context;

use dosu_backend::core::config::{AppPaths, ConfigService};
use dosu_backend::llm::{LlmProvider, OpenAiProvider};
use dosu_backend::rag::{DocumentIngestor, SqliteVectorStore, VectorStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let paths = Arc::new(AppPaths::new());
    let settings = ConfigService::new(paths.clone())
        .load()
        .context("Failed to load configuration")?;

    let provider: Arc<dyn LlmProvider> =
        Arc::new(OpenAiProvider::new(&settings.llm).context("Failed to build LLM provider")?);
    let store: Arc<dyn VectorStore> = Arc::new(
        SqliteVectorStore::with_path(paths.vector_db_path.clone())
            .await
            .context("Failed to open vector store")?,
    );

    let ingestor = DocumentIngestor::new(
        provider,
        store,
        &settings.rag,
        settings.llm.embedding_model.clone(),
    );

    let docs_dir = paths.datas_dir.join("docs");
    let total = ingestor
        .ingest_dir(&docs_dir)
        .await
        .with_context(|| format!("Ingestion failed for {}", docs_dir.display()))?;

    tracing::info!(
        "ingestion finished: {} chunks in collection '{}'",
        total,
        settings.rag.collection
    );

    Ok(())
}
