//! Centralized API error handling for WalletGate
//!
//! This module provides a unified error type for API responses with proper
//! HTTP status code mapping and JSON error responses. The response body is
//! the wire-compatible `{"error": "...", "message": "..."}` shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed request body or missing required field → 400, never retried
    #[error("Invalid input: {0}")]
    InputInvalid(String),

    /// Bad signature, bad token, bad carrier decryption → 401
    #[error("Invalid credential: {0}")]
    CredentialInvalid(String),

    /// Invalid, expired, or consumed nonce; refresh token not matching the
    /// stored one → 403; the caller must restart from nonce issuance
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Unknown identity → 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// Lost a conditional-update race during refresh rotation → 409; the
    /// client retries the refresh with its current token
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Transient store/infrastructure failure → 500, safe to retry with
    /// backoff
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Anything unexpected, caught at the topmost boundary → 500 with a
    /// generic message
    #[error("Internal server error")]
    Internal,
}

/// JSON error response body: `{error, message?}`
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InputInvalid(_) => "INPUT_INVALID",
            ApiError::CredentialInvalid(_) => "CREDENTIAL_INVALID",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            ApiError::Internal => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InputInvalid(_) => StatusCode::BAD_REQUEST,
            ApiError::CredentialInvalid(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The human-readable detail, if it is safe to expose.
    ///
    /// Server-side failures get a generic message; never leak store errors
    /// or internals to the client.
    fn client_message(&self) -> Option<String> {
        match self {
            ApiError::StoreUnavailable(_) | ApiError::Internal => None,
            other => Some(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        match &self {
            ApiError::StoreUnavailable(detail) => {
                tracing::error!(detail = %detail, code = %error_code, "Server error occurred");
            }
            ApiError::Internal => {
                tracing::error!(code = %error_code, "Server error occurred");
            }
            other => {
                tracing::debug!(error = %other, code = %error_code, "Client error occurred");
            }
        }

        let body = ErrorResponse {
            error: error_code.to_string(),
            message: self.client_message(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::StoreUnavailable(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::InputInvalid(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InputInvalid(format!("Invalid JSON: {}", err))
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ApiError::InputInvalid("test".to_string()).error_code(),
            "INPUT_INVALID"
        );
        assert_eq!(
            ApiError::CredentialInvalid("test".to_string()).error_code(),
            "CREDENTIAL_INVALID"
        );
        assert_eq!(
            ApiError::Conflict("test".to_string()).error_code(),
            "CONFLICT"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::InputInvalid("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::CredentialInvalid("test".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("test".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Conflict("test".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::StoreUnavailable("test".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_detail() {
        assert!(ApiError::StoreUnavailable("pool timed out".to_string())
            .client_message()
            .is_none());
        assert!(ApiError::Internal.client_message().is_none());
        assert!(ApiError::Forbidden("nonce expired".to_string())
            .client_message()
            .is_some());
    }
}
