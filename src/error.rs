use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    // Auth errors
    #[error("Invalid token")]
    InvalidToken,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,

    // Album errors
    #[error("Album not found")]
    AlbumNotFound,
    #[error("Slug already taken")]
    SlugConflict,

    // Sticker errors
    #[error("Sticker not found")]
    StickerNotFound,

    // Pack errors
    #[error("Pack not found")]
    PackNotFound,

    #[error("Object not found")]
    ObjectNotFound,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
    #[error("Bad request: {0}")]
    BadRequest(String),

    // Media errors
    #[error("Unsupported image: {0}")]
    Decode(String),
    #[error("QR encoding failed: {0}")]
    Qr(String),

    // Upstream errors
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Storage error: {0}")]
    Storage(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Redis errors
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    // JWT errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    // Internal errors
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        AppError::InvalidField {
            field,
            message: message.into(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // 400 Bad Request
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Decode(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InvalidField { field, message } => {
                let body = Json(json!({
                    "error": message,
                    "field": field,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            // 401 Unauthorized
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Jwt(_) => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),

            // 403 Forbidden
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),

            // 404 Not Found
            AppError::AlbumNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::StickerNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::PackNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::ObjectNotFound => (StatusCode::NOT_FOUND, self.to_string()),

            // 409 Conflict
            AppError::SlugConflict => (StatusCode::CONFLICT, self.to_string()),

            // 500 Internal Server Error
            AppError::Qr(e) => {
                tracing::error!("QR error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Upstream(e) => {
                tracing::error!("Upstream error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Realtime error".to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
