//! Handler-level tests for the conversation read endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, State};

use dosu_backend::core::config::{AppPaths, LlmSettings, RagSettings, Settings};
use dosu_backend::core::errors::{ApiError, PipelineError};
use dosu_backend::history::{ConversationTurn, HistoryStore};
use dosu_backend::llm::{ChatRequest, LlmProvider};
use dosu_backend::pipeline::{AnswerPipeline, ChatResponder, IntentClassifier, RagResponder};
use dosu_backend::prompt::PromptStore;
use dosu_backend::rag::{ChunkSearchResult, StoredChunk, VectorStore};
use dosu_backend::server::handlers::conversations;
use dosu_backend::state::AppState;

struct NullProvider;

#[async_trait]
impl LlmProvider for NullProvider {
    fn name(&self) -> &str {
        "null"
    }

    async fn health_check(&self) -> Result<bool, PipelineError> {
        Ok(true)
    }

    async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, PipelineError> {
        Ok("답변".to_string())
    }

    async fn embed(
        &self,
        inputs: &[String],
        _model_id: &str,
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        Ok(inputs.iter().map(|_| vec![1.0]).collect())
    }
}

struct NullStore;

#[async_trait]
impl VectorStore for NullStore {
    async fn upsert(&self, _chunk: StoredChunk, _embedding: Vec<f32>) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn upsert_batch(
        &self,
        _items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn search(
        &self,
        _query_embedding: &[f32],
        _limit: usize,
        _collection: &str,
    ) -> Result<Vec<ChunkSearchResult>, PipelineError> {
        Ok(Vec::new())
    }

    async fn count(&self, _collection: Option<&str>) -> Result<usize, PipelineError> {
        Ok(0)
    }

    async fn delete_source(
        &self,
        _collection: &str,
        _source: &str,
    ) -> Result<usize, PipelineError> {
        Ok(0)
    }
}

struct NullClassifier;

#[async_trait]
impl IntentClassifier for NullClassifier {
    async fn classify(
        &self,
        _question: &str,
        _recent_history: &[ConversationTurn],
    ) -> Result<String, PipelineError> {
        Ok("kakaosync".to_string())
    }
}

fn make_state(dir: &tempfile::TempDir) -> Arc<AppState> {
    let history = HistoryStore::new(dir.path().join("history")).unwrap();
    let provider: Arc<dyn LlmProvider> = Arc::new(NullProvider);
    let vector_store: Arc<dyn VectorStore> = Arc::new(NullStore);
    let prompts = PromptStore::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("datas/prompts"),
    );

    let classifier: Arc<dyn IntentClassifier> = Arc::new(NullClassifier);
    let rag = RagResponder::new(
        provider.clone(),
        vector_store.clone(),
        prompts.clone(),
        LlmSettings::default(),
        RagSettings::default(),
    );
    let chat = ChatResponder::new(provider.clone(), prompts, LlmSettings::default());
    let pipeline = Arc::new(AnswerPipeline::new(
        classifier,
        rag,
        chat,
        history.clone(),
        20,
    ));

    let paths = Arc::new(AppPaths {
        project_root: dir.path().to_path_buf(),
        user_data_dir: dir.path().to_path_buf(),
        log_dir: dir.path().join("logs"),
        history_dir: dir.path().join("history"),
        vector_db_path: dir.path().join("rag.db"),
        secrets_path: dir.path().join("secrets.yaml"),
        datas_dir: dir.path().join("datas"),
    });

    Arc::new(AppState {
        paths,
        settings: Settings::default(),
        history,
        provider,
        vector_store,
        pipeline,
    })
}

#[tokio::test]
async fn malformed_conversation_id_is_a_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let state = make_state(&dir);

    let err = conversations::get_conversation_messages(State(state), Path("bad.id".to_string()))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ApiError::BadRequest(_)));
}

#[tokio::test]
async fn unknown_conversation_id_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let state = make_state(&dir);

    let err = conversations::get_conversation_messages(
        State(state),
        Path("conv-missing".to_string()),
    )
    .await
    .err()
    .unwrap();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn logged_conversation_returns_its_messages() {
    let dir = tempfile::tempdir().unwrap();
    let state = make_state(&dir);

    state
        .history
        .append_exchange("conv-1", "질문", "답변")
        .await
        .unwrap();

    let res =
        conversations::get_conversation_messages(State(state), Path("conv-1".to_string())).await;
    assert!(res.is_ok());
}
