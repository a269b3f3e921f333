//! Error types for daka
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad arguments, invalid input, misconfiguration)
//! - 3: Authentication required
//! - 4: Operation failed (storage or network trouble)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Exit codes for the daka CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const AUTH_REQUIRED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for daka operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    // Authentication (exit code 3)
    #[error("Not authenticated")]
    Unauthorized,

    // Operation failures (exit code 4)
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::Config(_) | Error::InvalidArgument(_) | Error::Validation(_) => {
                exit_codes::USER_ERROR
            }

            // Authentication
            Error::Unauthorized => exit_codes::AUTH_REQUIRED,

            // Operation failures
            Error::Storage(_) | Error::Network(_) | Error::Io(_) | Error::Json(_) => {
                exit_codes::OPERATION_FAILED
            }
        }
    }

    /// HTTP status the server answers with for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            Error::InvalidArgument(_) | Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Config(_)
            | Error::Storage(_)
            | Error::Network(_)
            | Error::Io(_)
            | Error::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Wire shape of an error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.http_status();
        // Configuration details stay in the server log, not the response.
        let message = match &self {
            Error::Config(detail) => {
                tracing::error!(%detail, "configuration error");
                "server configuration error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Result type alias for daka operations
pub type Result<T> = std::result::Result<T, Error>;
