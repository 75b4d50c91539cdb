//! Server error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Structured error response for API clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Store not found: {0}")]
    StoreNotFound(String),

    #[error("Invalid store name: {0}")]
    InvalidName(String),

    #[error("Invalid artifact: {0}")]
    InvalidArtifact(#[source] sealdict_core::Error),

    #[error("Store error: {0}")]
    Store(#[from] sealdict_core::Error),

    #[error("Metrics recorder not installed")]
    MetricsDisabled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Get the error code for structured responses
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::StoreNotFound(_) => "STORE_NOT_FOUND",
            ServerError::InvalidName(_) => "INVALID_NAME",
            ServerError::InvalidArtifact(_) => "INVALID_ARTIFACT",
            ServerError::Store(_) => "STORE_ERROR",
            ServerError::MetricsDisabled => "METRICS_DISABLED",
            ServerError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::StoreNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidName(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidArtifact(_) => StatusCode::BAD_REQUEST,
            ServerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::MetricsDisabled => StatusCode::NOT_FOUND,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
