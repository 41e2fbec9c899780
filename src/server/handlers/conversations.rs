use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::history::HistoryStore;
use crate::state::AppState;

pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let conversations = state.history.list_conversations().await?;
    Ok(Json(json!({ "conversations": conversations })))
}

pub async fn get_conversation_messages(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !HistoryStore::is_valid_id(&conversation_id) {
        return Err(ApiError::BadRequest(format!(
            "invalid conversation id: {:?}",
            conversation_id
        )));
    }
    if !state.history.has_conversation(&conversation_id).await? {
        return Err(ApiError::NotFound(format!(
            "no conversation with id {:?}",
            conversation_id
        )));
    }

    let messages = state.history.load(&conversation_id, 0).await?;
    Ok(Json(json!({ "messages": messages })))
}
