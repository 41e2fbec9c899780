use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitQuestionRequest {
    pub conversation_id: Option<String>,
    pub question: String,
    pub target_language: Option<String>,
}

/// One submission → one pipeline run → one answer projection. A propagated
/// pipeline failure surfaces as an HTTP error and no message is produced.
pub async fn submit_question(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question = payload.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("question cannot be empty".to_string()));
    }

    let conversation_id = payload
        .conversation_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let answer = state.pipeline.run(&conversation_id, question).await?;

    Ok(Json(json!({
        "conversation_id": conversation_id,
        "message": {
            "original_text": question,
            "answer_text": answer,
            "created_at": chrono::Utc::now().to_rfc3339(),
            "target_language": payload.target_language,
        }
    })))
}
