use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("dates list is empty")]
    EmptyBatch,

    #[error("startDate is after endDate")]
    InvalidRange,

    #[error("no data for {0}")]
    NotFound(String),

    #[error("sync queue is full")]
    QueueFull,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            AppError::InvalidDate(_) | AppError::EmptyBatch | AppError::InvalidRange => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            // "no data" stays distinguishable from a server error: structured
            // body, non-5xx status.
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::QueueFull => (
                StatusCode::SERVICE_UNAVAILABLE,
                "sync queue is full, retry later".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            AppError::Cache(e) => {
                tracing::error!("cache error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}
