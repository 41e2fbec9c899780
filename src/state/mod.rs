use std::sync::Arc;

use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::history::HistoryStore;
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::pipeline::{
    AnswerPipeline, ChatResponder, IntentClassifier, LlmIntentClassifier, RagResponder,
};
use crate::prompt::PromptStore;
use crate::rag::{SqliteVectorStore, VectorStore};

pub mod error;

use error::InitializationError;

/// Global application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub history: HistoryStore,
    pub provider: Arc<dyn LlmProvider>,
    pub vector_store: Arc<dyn VectorStore>,
    pub pipeline: Arc<AnswerPipeline>,
}

impl AppState {
    /// Initializes paths, configuration, stores, the LLM provider, and the
    /// answer pipeline. Everything downstream receives its configuration
    /// here; nothing reads the environment later.
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let history = HistoryStore::new(paths.history_dir.clone())
            .map_err(|e| InitializationError::History(e.into()))?;

        let provider: Arc<dyn LlmProvider> = Arc::new(
            OpenAiProvider::new(&settings.llm).map_err(|e| InitializationError::Llm(e.into()))?,
        );

        let vector_store: Arc<dyn VectorStore> = Arc::new(
            SqliteVectorStore::with_path(paths.vector_db_path.clone())
                .await
                .map_err(|e| InitializationError::VectorStore(e.into()))?,
        );

        let prompts = PromptStore::new(paths.datas_dir.join("prompts"));

        let classifier: Arc<dyn IntentClassifier> = Arc::new(LlmIntentClassifier::new(
            provider.clone(),
            prompts.clone(),
            settings.llm.clone(),
        ));
        let rag_responder = RagResponder::new(
            provider.clone(),
            vector_store.clone(),
            prompts.clone(),
            settings.llm.clone(),
            settings.rag.clone(),
        );
        let chat_responder = ChatResponder::new(provider.clone(), prompts, settings.llm.clone());

        let pipeline = Arc::new(AnswerPipeline::new(
            classifier,
            rag_responder,
            chat_responder,
            history.clone(),
            settings.chat_history.default_limit,
        ));

        Ok(Arc::new(AppState {
            paths,
            settings,
            history,
            provider,
            vector_store,
            pipeline,
        }))
    }
}
