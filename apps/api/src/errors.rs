use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::export::pipeline::FAILURE_MESSAGE;
use crate::export::ExportError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("An export is already in progress for this session")]
    ExportInProgress,

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Mail transport is not configured")]
    MailUnavailable,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::ExportInProgress => (
                StatusCode::CONFLICT,
                "EXPORT_IN_PROGRESS",
                "A PDF is already being generated".to_string(),
            ),
            AppError::Export(e @ ExportError::MissingTemplate) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "TEMPLATE_NOT_FOUND",
                e.user_message().to_string(),
            ),
            AppError::Export(e) => {
                tracing::error!("Export error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXPORT_FAILED",
                    FAILURE_MESSAGE.to_string(),
                )
            }
            AppError::Mail(msg) => {
                tracing::error!("Mail error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "MAIL_ERROR",
                    "Failed to send message. Please try again.".to_string(),
                )
            }
            AppError::MailUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "MAIL_UNAVAILABLE",
                "Contact form is currently unavailable".to_string(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
