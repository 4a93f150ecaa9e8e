// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Media storage failures.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// The upload itself is unusable (empty, missing, bad reference).
    #[error("Invalid media: {0}")]
    Invalid(String),

    #[error("Media not found: {0}")]
    NotFound(String),

    /// Storage-side I/O failure.
    #[error("Media storage failure: {0}")]
    Io(String),
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Forbidden: {0}")]
    Authorization(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rule violation: {0}")]
    BusinessLogic(String),

    #[error("Invalid or expired token: {0}")]
    Token(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error(transparent)]
    File(#[from] FileError),

    /// A multi-step delete stopped part way. `completed` units of work were
    /// applied before the failure and are not rolled back.
    #[error("Cascade incomplete after {completed} of {total} steps: {message}")]
    CascadeIncomplete {
        completed: usize,
        total: usize,
        message: String,
    },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// Prefix the message with `context`, keeping the error kind.
    pub fn with_context(self, context: &str) -> Self {
        match self {
            AppError::Validation { message, details } => AppError::Validation {
                message: format!("{}: {}", context, message),
                details,
            },
            AppError::Authentication(msg) => AppError::Authentication(format!("{}: {}", context, msg)),
            AppError::Authorization(msg) => AppError::Authorization(format!("{}: {}", context, msg)),
            AppError::NotFound(msg) => AppError::NotFound(format!("{}: {}", context, msg)),
            AppError::BusinessLogic(msg) => AppError::BusinessLogic(format!("{}: {}", context, msg)),
            AppError::Token(msg) => AppError::Token(format!("{}: {}", context, msg)),
            AppError::Database(msg) => AppError::Database(format!("{}: {}", context, msg)),
            AppError::File(FileError::Invalid(msg)) => {
                AppError::File(FileError::Invalid(format!("{}: {}", context, msg)))
            }
            AppError::File(FileError::NotFound(msg)) => {
                AppError::File(FileError::NotFound(format!("{}: {}", context, msg)))
            }
            AppError::File(FileError::Io(msg)) => {
                AppError::File(FileError::Io(format!("{}: {}", context, msg)))
            }
            AppError::CascadeIncomplete {
                completed,
                total,
                message,
            } => AppError::CascadeIncomplete {
                completed,
                total,
                message: format!("{}: {}", context, message),
            },
            AppError::Internal(err) => AppError::Internal(err.context(context.to_string())),
        }
    }

    /// HTTP status class for this error kind.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::BusinessLogic(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) | AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::File(FileError::Invalid(_)) => StatusCode::BAD_REQUEST,
            AppError::File(FileError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::File(FileError::Io(_))
            | AppError::Database(_)
            | AppError::CascadeIncomplete { .. }
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        fields.sort();

        AppError::Validation {
            message: format!("Invalid fields: {}", fields.join(", ")),
            details: serde_json::to_value(&errors).ok(),
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message, details) = match self {
            AppError::Validation { message, details } => ("validation_error", message, details),
            AppError::Authentication(msg) => ("authentication_error", msg, None),
            AppError::Authorization(msg) => ("authorization_error", msg, None),
            AppError::NotFound(msg) => ("not_found", msg, None),
            AppError::BusinessLogic(msg) => ("business_logic_error", msg, None),
            AppError::Token(msg) => ("token_error", msg, None),
            AppError::File(FileError::Invalid(msg)) => ("file_error", msg, None),
            AppError::File(FileError::NotFound(msg)) => ("not_found", msg, None),
            AppError::File(FileError::Io(msg)) => {
                tracing::error!(error = %msg, "Media storage error");
                ("file_error", "Media storage failure".to_string(), None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("database_error", "Storage failure".to_string(), None)
            }
            AppError::CascadeIncomplete {
                completed,
                total,
                message,
            } => {
                tracing::error!(completed, total, error = %message, "Cascade delete incomplete");
                (
                    "cascade_incomplete",
                    format!("Delete stopped after {} of {} steps", completed, total),
                    Some(serde_json::json!({ "completed": completed, "total": total })),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                ("internal_error", "Internal server error".to_string(), None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
