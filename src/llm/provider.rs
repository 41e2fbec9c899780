use async_trait::async_trait;

use super::types::ChatRequest;
use crate::core::errors::PipelineError;

/// Outbound LLM collaborator. One implementation talks to an
/// OpenAI-compatible HTTP API; tests substitute stubs at this seam.
///
/// No retries happen behind this trait; transport failures surface as
/// `PipelineError::Generation` and the caller decides what to do.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// check if the provider is reachable
    async fn health_check(&self) -> Result<bool, PipelineError>;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, PipelineError>;

    /// generate embeddings, one vector per input, in input order
    async fn embed(&self, inputs: &[String], model_id: &str)
        -> Result<Vec<Vec<f32>>, PipelineError>;
}
