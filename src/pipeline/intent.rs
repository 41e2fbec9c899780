use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::format_history;
use crate::core::config::LlmSettings;
use crate::core::errors::PipelineError;
use crate::history::ConversationTurn;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::prompt::PromptStore;

pub const INTENT_TEMPLATE: &str = "template_intent";

/// Closed set of support topics. Label matching happens through
/// [`Intent::parse`]; anything it does not recognize takes the fallback
/// conversational branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    KakaoSync,
    KakaoSocial,
    TalkChannel,
}

impl Intent {
    pub const ALL: [Intent; 3] = [Intent::KakaoSync, Intent::KakaoSocial, Intent::TalkChannel];

    pub fn parse(label: &str) -> Option<Intent> {
        match label.trim().to_lowercase().as_str() {
            "kakaosync" => Some(Intent::KakaoSync),
            // "kakkosocial" is a long-lived misspelling of this label; both
            // spellings are routed identically until the canonical one is
            // settled upstream.
            "kakaosocial" | "kakkosocial" => Some(Intent::KakaoSocial),
            "talkchannel" => Some(Intent::TalkChannel),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Intent::KakaoSync => "kakaosync",
            Intent::KakaoSocial => "kakaosocial",
            Intent::TalkChannel => "talkchannel",
        }
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            Intent::KakaoSync => "template_kakaosync",
            Intent::KakaoSocial => "template_kakaosocial",
            Intent::TalkChannel => "template_talkchannel",
        }
    }

    /// The enumerated list rendered verbatim into the classifier prompt.
    pub fn intent_list() -> String {
        Self::ALL
            .iter()
            .map(|intent| intent.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps a free-text question (plus recent history) to a label.
///
/// The returned label is free model text and is NOT guaranteed to be a
/// member of the intent list; the pipeline treats unrecognized text as the
/// fallback case rather than erroring.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        question: &str,
        recent_history: &[ConversationTurn],
    ) -> Result<String, PipelineError>;
}

pub struct LlmIntentClassifier {
    provider: Arc<dyn LlmProvider>,
    prompts: PromptStore,
    llm: LlmSettings,
}

impl LlmIntentClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>, prompts: PromptStore, llm: LlmSettings) -> Self {
        Self {
            provider,
            prompts,
            llm,
        }
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(
        &self,
        question: &str,
        recent_history: &[ConversationTurn],
    ) -> Result<String, PipelineError> {
        let template = self.prompts.load(INTENT_TEMPLATE)?;
        let prompt = template.render(&[
            ("intent_list", Intent::intent_list().as_str()),
            ("chat_history", format_history(recent_history).as_str()),
            ("question", question),
        ]);

        let request = ChatRequest::new(vec![ChatMessage::user(prompt)]).with_settings(&self.llm);
        let label = self.provider.chat(request, &self.llm.chat_model).await?;
        Ok(label.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognizes_topic_labels() {
        assert_eq!(Intent::parse("kakaosync"), Some(Intent::KakaoSync));
        assert_eq!(Intent::parse(" KakaoSync \n"), Some(Intent::KakaoSync));
        assert_eq!(Intent::parse("kakaosocial"), Some(Intent::KakaoSocial));
        assert_eq!(Intent::parse("talkchannel"), Some(Intent::TalkChannel));
    }

    #[test]
    fn parse_accepts_historical_misspelling() {
        assert_eq!(Intent::parse("kakkosocial"), Some(Intent::KakaoSocial));
    }

    #[test]
    fn parse_rejects_anything_else() {
        assert_eq!(Intent::parse("none"), None);
        assert_eq!(Intent::parse("unknown_xyz"), None);
        assert_eq!(Intent::parse(""), None);
    }

    #[test]
    fn intent_list_enumerates_all_topics() {
        assert_eq!(Intent::intent_list(), "kakaosync, kakaosocial, talkchannel");
    }
}
