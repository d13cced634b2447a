use crate::classification::ClassificationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error types surfaced over HTTP
#[derive(Error, Debug)]
pub enum AppError {
    /// The request carried no image
    #[error("No image provided")]
    MissingInput,

    /// Malformed request body
    #[error("Validation error: {0}")]
    Validation(String),

    /// Provider credential absent and the route is configured to refuse
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingInput => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::MissingInput => "MISSING_INPUT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Convert AppError to HTTP response
///
/// The body is `{ "error": <message> }`, the shape the report form reads.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        if status.is_client_error() {
            tracing::warn!(
                error_code = error_code,
                status_code = status.as_u16(),
                message = %message,
                "Rejected request"
            );
        } else {
            tracing::error!(
                error_code = error_code,
                status_code = status.as_u16(),
                message = %message,
                "Request error"
            );
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Conversion from classification errors; only caller-side problems keep a 4xx status
impl From<ClassificationError> for AppError {
    fn from(err: ClassificationError) -> Self {
        match err {
            ClassificationError::MissingInput => AppError::MissingInput,
            ClassificationError::InvalidInput(message) => AppError::Validation(message),
            not_configured @ ClassificationError::ServiceNotConfigured => {
                AppError::ServiceUnavailable(not_configured.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
