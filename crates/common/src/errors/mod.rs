//! Error types for Cognify services
//!
//! Provides a single error enum with:
//! - Distinct variants for validation, AI, acquisition and storage failures
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    PayloadTooLarge,

    // Authentication errors (2xxx)
    Unauthorized,
    InvalidToken,
    ExpiredToken,

    // Resource errors (4xxx)
    MaterialNotFound,
    TestNotFound,
    AttemptNotFound,

    // Conflict errors (5xxx)
    AttemptClosed,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    UpstreamError,
    AiServiceError,
    AiFlowFailed,
    ExtractionFailed,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::PayloadTooLarge => 1004,

            ErrorCode::Unauthorized => 2001,
            ErrorCode::InvalidToken => 2002,
            ErrorCode::ExpiredToken => 2003,

            ErrorCode::MaterialNotFound => 4002,
            ErrorCode::TestNotFound => 4003,
            ErrorCode::AttemptNotFound => 4004,

            ErrorCode::AttemptClosed => 5001,

            ErrorCode::RateLimited => 6001,

            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            ErrorCode::UpstreamError => 8001,
            ErrorCode::AiServiceError => 8002,
            ErrorCode::AiFlowFailed => 8003,
            ErrorCode::ExtractionFailed => 8004,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    // Resource errors
    #[error("Study material not found: {id}")]
    MaterialNotFound { id: String },

    #[error("Test not found: {id}")]
    TestNotFound { id: String },

    #[error("Assessment attempt not found: {id}")]
    AttemptNotFound { id: String },

    #[error("Assessment attempt {id} is already closed")]
    AttemptClosed { id: String },

    // Rate limiting
    #[error("Rate limit exceeded, try again shortly")]
    RateLimited,

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("AI service error: {message}")]
    AiService { message: String },

    /// An AI flow returned nothing usable. Displays the flow's generic
    /// failure message; `detail` carries the reason for logs.
    #[error("{message}")]
    FlowFailed {
        flow: &'static str,
        message: String,
        detail: String,
    },

    #[error("Failed to extract content from URL: {url}")]
    UrlExtraction { url: String },

    #[error("Failed to extract content from {file_name}: {message}")]
    FileExtraction { file_name: String, message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a validation failure on a named field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::MaterialNotFound { .. } => ErrorCode::MaterialNotFound,
            AppError::TestNotFound { .. } => ErrorCode::TestNotFound,
            AppError::AttemptNotFound { .. } => ErrorCode::AttemptNotFound,
            AppError::AttemptClosed { .. } => ErrorCode::AttemptClosed,
            AppError::RateLimited => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::AiService { .. } => ErrorCode::AiServiceError,
            AppError::FlowFailed { .. } => ErrorCode::AiFlowFailed,
            AppError::UrlExtraction { .. } | AppError::FileExtraction { .. } => {
                ErrorCode::ExtractionFailed
            }
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. } | AppError::InvalidToken | AppError::ExpiredToken => {
                StatusCode::UNAUTHORIZED
            }

            // 404 Not Found
            AppError::MaterialNotFound { .. }
            | AppError::TestNotFound { .. }
            | AppError::AttemptNotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::AttemptClosed { .. } => StatusCode::CONFLICT,

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 422 Unprocessable Entity
            AppError::UrlExtraction { .. } | AppError::FileExtraction { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            // 429 Too Many Requests
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::AiService { .. } | AppError::FlowFailed { .. } | AppError::HttpClient(_) => {
                StatusCode::BAD_GATEWAY
            }

            // 503 Service Unavailable
            AppError::DatabaseConnection { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Field-level details surfaced to clients, if any
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Validation {
                field: Some(field), ..
            } => Some(serde_json::json!({ "field": field })),
            AppError::FileExtraction { file_name, .. } => {
                Some(serde_json::json!({ "fileName": file_name }))
            }
            _ => None,
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            match &self {
                AppError::FlowFailed { flow, detail, .. } => tracing::error!(
                    error = %message,
                    flow = flow,
                    detail = %detail,
                    status = status.as_u16(),
                    "AI flow failed"
                ),
                _ => tracing::error!(
                    error = %message,
                    code = ?code,
                    status = status.as_u16(),
                    "Server error"
                ),
            }
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::DatabaseConnection {
            message: format!("Migration failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::MaterialNotFound { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::MaterialNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code().as_code(), 4002);
    }

    #[test]
    fn test_validation_error_displays_field_message() {
        let err = AppError::validation("title", "Title must be at least 3 characters.");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Title must be at least 3 characters.");
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_flow_failure_hides_detail() {
        let err = AppError::FlowFailed {
            flow: "studyGuidePrompt",
            message: "Failed to generate study guide.".into(),
            detail: "missing field `summary`".into(),
        };
        assert_eq!(err.to_string(), "Failed to generate study guide.");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.is_server_error());
    }

    #[test]
    fn test_url_extraction_names_url() {
        let err = AppError::UrlExtraction {
            url: "https://example.com/empty".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to extract content from URL: https://example.com/empty"
        );
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_attempt_closed_is_conflict() {
        let err = AppError::AttemptClosed { id: "a1".into() };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), ErrorCode::AttemptClosed);
    }
}
