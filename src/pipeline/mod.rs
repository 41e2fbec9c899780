//! Answer pipeline: classify intent, branch to the matching responder, log
//! the exchange.

pub mod intent;
pub mod responder;

use std::sync::Arc;

pub use intent::{Intent, IntentClassifier, LlmIntentClassifier, INTENT_TEMPLATE};
pub use responder::{ChatResponder, RagResponder};

use crate::core::errors::PipelineError;
use crate::history::{ConversationTurn, HistoryStore};

/// Orchestrates one question/answer run. Linear, no retries, no timeouts;
/// the outbound calls are bounded by the LLM client's own timeout.
pub struct AnswerPipeline {
    classifier: Arc<dyn IntentClassifier>,
    rag: RagResponder,
    chat: ChatResponder,
    history: HistoryStore,
    history_limit: usize,
}

impl AnswerPipeline {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        rag: RagResponder,
        chat: ChatResponder,
        history: HistoryStore,
        history_limit: usize,
    ) -> Self {
        Self {
            classifier,
            rag,
            chat,
            history,
            history_limit,
        }
    }

    /// Runs the full pipeline for one submission and returns the answer.
    ///
    /// A classification or generation failure propagates and leaves the
    /// history untouched. A history write failure after a computed answer is
    /// reported but does not discard the answer.
    pub async fn run(
        &self,
        conversation_id: &str,
        question: &str,
    ) -> Result<String, PipelineError> {
        let recent = self.history.load(conversation_id, self.history_limit).await?;

        let label = self.classifier.classify(question, &recent).await?;

        let answer = match Intent::parse(&label) {
            Some(intent) => {
                tracing::debug!("question matched intent '{}'", intent);
                self.rag.answer(intent, question, &recent).await?
            }
            None => {
                tracing::debug!("label {:?} matched no topic, using fallback", label);
                self.chat.respond(question, &recent).await?
            }
        };

        if let Err(err) = self
            .history
            .append_exchange(conversation_id, question, &answer)
            .await
        {
            tracing::warn!(
                "failed to log exchange for conversation {}: {}",
                conversation_id,
                err
            );
        }

        Ok(answer)
    }
}

pub(crate) fn format_history(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{ROLE_ASSISTANT, ROLE_USER};

    #[test]
    fn history_formats_one_turn_per_line() {
        let turns = vec![
            ConversationTurn {
                role: ROLE_USER.to_string(),
                content: "질문".to_string(),
                created_at: "2024-01-01T00:00:00Z".to_string(),
            },
            ConversationTurn {
                role: ROLE_ASSISTANT.to_string(),
                content: "답변".to_string(),
                created_at: "2024-01-01T00:00:01Z".to_string(),
            },
        ];
        assert_eq!(format_history(&turns), "user: 질문\nassistant: 답변");
    }

    #[test]
    fn empty_history_formats_to_empty_string() {
        assert_eq!(format_history(&[]), "");
    }
}
