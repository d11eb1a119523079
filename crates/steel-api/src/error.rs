use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource id absent, or soft-deleted and the caller is not admin.
    #[error("not found")]
    NotFound,

    /// Actor lacks the required access level.
    #[error("access denied")]
    AccessDenied,

    /// Payload rejected before any store mutation was attempted.
    #[error("{0}")]
    Validation(String),

    /// A stored blob or id failed to parse.
    #[error("corrupt stored data: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // NotFound and AccessDenied share one wire shape so a denied
            // caller cannot probe for resource existence.
            ApiError::NotFound | ApiError::AccessDenied => {
                (StatusCode::NOT_FOUND, "not found".to_string())
            }
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Corrupt(msg) => {
                error!("data integrity error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "stored data unreadable".to_string(),
                )
            }
            ApiError::Internal(err) => {
                error!("internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
