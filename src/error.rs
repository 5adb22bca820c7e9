//! Error types for the finance assistant

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Error, Debug)]
pub enum TrackerError {

    // =============================
    // Domain Errors
    // =============================

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Advice service error: {0}")]
    AdviceError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Pattern error: {0}")]
    PatternError(#[from] regex::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TrackerError {
    /// HTTP status the API layer reports for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            TrackerError::Validation(_) | TrackerError::SerializationError(_) => {
                StatusCode::BAD_REQUEST
            }
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            TrackerError::Conflict(_) => StatusCode::CONFLICT,
            TrackerError::AdviceError(_) | TrackerError::HttpError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
