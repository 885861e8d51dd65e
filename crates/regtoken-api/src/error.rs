//! Error types for the API crate.

use crate::homeserver::HomeserverError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use regtoken_core::CredentialError;
use regtoken_tokens::{ExpirationError, TokenError};
use serde_json::json;
use thiserror::Error;

/// Errors that can occur serving the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failed to start the server.
    #[error("failed to start server: {0}")]
    StartupFailed(String),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Username or password rejected by the local rules.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Unknown or inactive token, or a failed token write.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Unparseable expiration in a create request.
    #[error(transparent)]
    Expiration(#[from] ExpirationError),

    /// Invalid request parameter.
    #[error("{0}")]
    InvalidParam(String),

    /// No token with this name.
    #[error("token {0} not found")]
    NotFound(String),

    /// Token already in the requested state.
    #[error("token {0} is already disabled")]
    Unchanged(String),

    /// Homeserver refused or could not be reached.
    #[error(transparent)]
    Homeserver(#[from] HomeserverError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, String) {
        let (status, errcode) = match self {
            ApiError::PasswordMismatch => (StatusCode::BAD_REQUEST, "M_PASSWORD_MISMATCH"),
            ApiError::Credential(CredentialError::InvalidUsername(_)) => {
                (StatusCode::BAD_REQUEST, "M_INVALID_USERNAME")
            }
            ApiError::Credential(CredentialError::WeakPassword { .. }) => {
                (StatusCode::BAD_REQUEST, "M_WEAK_PASSWORD")
            }
            ApiError::Token(TokenError::NotFound(_) | TokenError::NotActive(_)) => {
                (StatusCode::UNAUTHORIZED, "M_FORBIDDEN")
            }
            ApiError::Expiration(_) | ApiError::InvalidParam(_) => {
                (StatusCode::BAD_REQUEST, "M_INVALID_PARAM")
            }
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "M_NOT_FOUND"),
            ApiError::Unchanged(_) => (StatusCode::CONFLICT, "M_UNCHANGED"),
            ApiError::Homeserver(HomeserverError::Rejected { status, errcode, .. }) => {
                let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
                return (status, errcode.clone());
            }
            ApiError::Homeserver(_) => (StatusCode::BAD_GATEWAY, "M_UNKNOWN"),
            ApiError::StartupFailed(_)
            | ApiError::Token(TokenError::NameUnavailable(_) | TokenError::Persistence(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "M_UNKNOWN")
            }
        };
        (status, errcode.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, errcode) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let error = match &self {
            ApiError::Homeserver(HomeserverError::Rejected { error, .. }) => error.clone(),
            other => other.to_string(),
        };

        (status, Json(json!({ "errcode": errcode, "error": error }))).into_response()
    }
}
