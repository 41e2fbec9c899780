use std::sync::Arc;

use super::format_history;
use super::intent::Intent;
use crate::core::config::{LlmSettings, RagSettings};
use crate::core::errors::PipelineError;
use crate::history::ConversationTurn;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::prompt::PromptStore;
use crate::rag::{ChunkSearchResult, VectorStore};

const CHAT_TEMPLATE: &str = "template_chat";

/// Topic answering: template bound to the intent, top-k retrieved chunks as
/// context, one completion call. No partial answer on failure.
pub struct RagResponder {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn VectorStore>,
    prompts: PromptStore,
    llm: LlmSettings,
    rag: RagSettings,
}

impl RagResponder {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStore>,
        prompts: PromptStore,
        llm: LlmSettings,
        rag: RagSettings,
    ) -> Self {
        Self {
            provider,
            store,
            prompts,
            llm,
            rag,
        }
    }

    pub async fn answer(
        &self,
        intent: Intent,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<String, PipelineError> {
        let template = self.prompts.load(intent.template_name())?;

        let embeddings = self
            .provider
            .embed(&[question.to_string()], &self.llm.embedding_model)
            .await?;
        let query_embedding = embeddings
            .first()
            .ok_or_else(|| PipelineError::Retrieval("embedding response was empty".to_string()))?;

        let results = self
            .store
            .search(query_embedding, self.rag.top_k, &self.rag.collection)
            .await?;
        let context = build_context(&results, self.rag.max_context_chars);

        let prompt = template.render(&[
            ("question", question),
            ("context", context.as_str()),
            ("chat_history", format_history(history).as_str()),
        ]);

        let request = ChatRequest::new(vec![ChatMessage::user(prompt)]).with_settings(&self.llm);
        self.provider.chat(request, &self.llm.chat_model).await
    }
}

/// Concatenates retrieved chunks in result order. Stops before the chunk
/// that would push the total past `max_chars`; the best-ranked chunk is
/// always included so a single oversized chunk cannot empty the context.
pub(crate) fn build_context(results: &[ChunkSearchResult], max_chars: usize) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let mut total = 0usize;

    for result in results {
        let chars = result.chunk.content.chars().count();
        if !parts.is_empty() && total + chars > max_chars {
            break;
        }
        total += chars;
        parts.push(result.chunk.content.as_str());
    }

    parts.join("\n\n")
}

/// Generic multi-turn fallback used when the label matches no topic.
/// Stateless: the history buffer lives in the history store, not here.
pub struct ChatResponder {
    provider: Arc<dyn LlmProvider>,
    prompts: PromptStore,
    llm: LlmSettings,
}

impl ChatResponder {
    pub fn new(provider: Arc<dyn LlmProvider>, prompts: PromptStore, llm: LlmSettings) -> Self {
        Self {
            provider,
            prompts,
            llm,
        }
    }

    pub async fn respond(
        &self,
        question: &str,
        chat_history: &[ConversationTurn],
    ) -> Result<String, PipelineError> {
        let system = self.prompts.load(CHAT_TEMPLATE)?;

        let mut messages = vec![ChatMessage::system(system.raw())];
        for turn in chat_history {
            messages.push(ChatMessage {
                role: turn.role.clone(),
                content: turn.content.clone(),
            });
        }
        messages.push(ChatMessage::user(question));

        let request = ChatRequest::new(messages).with_settings(&self.llm);
        self.provider.chat(request, &self.llm.chat_model).await
    }
}
