use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Per-field validation messages, keyed by the request field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {message}")]
    Validation { message: String, fields: FieldErrors },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>, fields: FieldErrors) -> Self {
        AppError::Validation {
            message: message.into(),
            fields,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Malformed bodies, route parameters and query strings are all plain 400s.
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
        let status = self.status();
        let body = match self {
            AppError::NotFound(msg) => json!({
                "error": { "code": "NOT_FOUND", "message": msg }
            }),
            AppError::BadRequest(msg) => json!({
                "error": { "code": "BAD_REQUEST", "message": msg }
            }),
            AppError::Validation { message, fields } => json!({
                "error": { "code": "VALIDATION_ERROR", "message": message, "fields": fields }
            }),
            AppError::Unauthorized(msg) => json!({
                "error": { "code": "UNAUTHORIZED", "message": msg }
            }),
            AppError::Conflict(msg) => json!({
                "error": { "code": "CONFLICT", "message": msg }
            }),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                json!({
                    "error": { "code": "DATABASE_ERROR", "message": "A database error occurred" }
                })
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                json!({
                    "error": {
                        "code": "INTERNAL_ERROR",
                        "message": "An internal server error occurred"
                    }
                })
            }
        };

        (status, Json(body)).into_response()
    }
}
