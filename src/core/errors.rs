use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failure kinds surfaced by the answer pipeline.
///
/// All four propagate to the caller uncaught: the pipeline performs no retry
/// and no substitute answer generation. Only an *unrecognized but successfully
/// returned* intent label takes the fallback branch; a failed classification
/// is a `Generation` error.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("retrieval failed: {0}")]
    Retrieval(String),
    #[error("template load failed: {0}")]
    Template(String),
    #[error("history io failed: {0}")]
    History(String),
}

impl PipelineError {
    pub fn generation<E: std::fmt::Display>(err: E) -> Self {
        PipelineError::Generation(err.to_string())
    }

    pub fn retrieval<E: std::fmt::Display>(err: E) -> Self {
        PipelineError::Retrieval(err.to_string())
    }

    pub fn history<E: std::fmt::Display>(err: E) -> Self {
        PipelineError::History(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Generation(msg) | PipelineError::Retrieval(msg) => {
                ApiError::Upstream(msg)
            }
            PipelineError::Template(msg) | PipelineError::History(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
