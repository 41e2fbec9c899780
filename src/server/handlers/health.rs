use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
    }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let total_messages = state.history.total_message_count().await.unwrap_or(0);
    let indexed_chunks = state
        .vector_store
        .count(Some(&state.settings.rag.collection))
        .await
        .unwrap_or(0);
    let provider_reachable = state.provider.health_check().await.unwrap_or(false);

    Ok(Json(json!({
        "initialized": true,
        "total_messages": total_messages,
        "indexed_chunks": indexed_chunks,
        "provider": state.provider.name(),
        "provider_reachable": provider_reachable,
    })))
}
