//! Custom error types and handling
//!
//! This module defines the application's error types and implements
//! conversion to HTTP responses for the Axum framework.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid patch: {0}")]
    InvalidPatch(String),

    // Resource errors
    #[error("Project {0} not found")]
    ProjectNotFound(String),

    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Task {0} not found")]
    TaskNotFound(String),

    #[error("No language server found for {0}")]
    LanguageServerNotFound(String),

    #[error("File {0} already exists")]
    FileExists(String),

    // Unsupported configurations
    #[error("Unsupported: {0}")]
    Unsupported(String),

    // External service errors
    #[error("Docker error: {0}")]
    Docker(String),

    #[error("Git error: {0}")]
    Git(String),

    #[error("Language server error: {0}")]
    Lsp(String),

    // Internal errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in response
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl AppError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidPatch(_) => "INVALID_PATCH",
            Self::ProjectNotFound(_) => "PROJECT_NOT_FOUND",
            Self::FileNotFound(_) => "FILE_NOT_FOUND",
            Self::TaskNotFound(_) => "TASK_NOT_FOUND",
            Self::LanguageServerNotFound(_) => "LANGUAGE_SERVER_NOT_FOUND",
            Self::FileExists(_) => "FILE_EXISTS",
            Self::Unsupported(_) => "UNSUPPORTED",
            Self::Docker(_) => "DOCKER_ERROR",
            Self::Git(_) => "GIT_ERROR",
            Self::Lsp(_) => "LSP_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidPatch(_) | Self::Unsupported(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::ProjectNotFound(_)
            | Self::FileNotFound(_)
            | Self::TaskNotFound(_)
            | Self::LanguageServerNotFound(_) => StatusCode::NOT_FOUND,
            Self::FileExists(_) => StatusCode::CONFLICT,
            Self::Docker(_) | Self::Git(_) | Self::Lsp(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log internal errors but don't expose details to clients
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                "An internal error occurred".to_string()
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code: self.error_code().to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

// Implement From for common error types
impl From<bollard::errors::Error> for AppError {
    fn from(err: bollard::errors::Error) -> Self {
        AppError::Docker(err.to_string())
    }
}

impl From<git2::Error> for AppError {
    fn from(err: git2::Error) -> Self {
        AppError::Git(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(anyhow::anyhow!("background task failed: {err}"))
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ProjectNotFound("p".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::FileExists("a.txt".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Unsupported("compose".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Docker("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
