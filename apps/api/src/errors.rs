use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::export::ExportError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Export(ExportError::CaptureUnavailable) => (
                StatusCode::CONFLICT,
                "CAPTURE_UNAVAILABLE",
                "The resume preview is not available for export. Please try again.".to_string(),
            ),
            AppError::Export(ExportError::Rasterization(msg)) => {
                tracing::warn!("Rasterization error: {msg}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "RASTERIZATION_ERROR",
                    format!("Could not render the resume: {msg}"),
                )
            }
            AppError::Export(ExportError::Assembly(msg)) => {
                tracing::error!("Assembly error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ASSEMBLY_ERROR",
                    "Could not generate PDF. Please try again.".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_errors_map_to_distinct_codes() {
        let cases = [
            (
                AppError::from(ExportError::CaptureUnavailable),
                StatusCode::CONFLICT,
                "CAPTURE_UNAVAILABLE",
            ),
            (
                AppError::from(ExportError::Rasterization("cross-origin".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
                "RASTERIZATION_ERROR",
            ),
            (
                AppError::from(ExportError::Assembly("disk full".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "ASSEMBLY_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            let (s, c, _) = err.parts();
            assert_eq!(s, status);
            assert_eq!(c, code);
        }
    }

    #[test]
    fn test_response_status() {
        let response = AppError::NotFound("Resume x not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
