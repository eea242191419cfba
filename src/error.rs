//! Error types for the relay
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// Exchange failures reported by the provider are deliberately NOT a
/// variant here: they are delivered to the opener window as an error-typed
/// bridge page (see `oauth::bridge`), not as an HTTP error status.
#[derive(Debug, Error)]
pub enum AppError {
    /// Callback arrived without an authorization code (400)
    #[error("missing authorization code")]
    MissingCode,

    /// Callback state did not match the state cookie (400)
    #[error("state parameter does not match the state cookie")]
    StateMismatch,

    /// Transport-level failure talking to the token endpoint (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error (500; normally startup-fatal before serving)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to a status code and a stable machine-readable
    /// error code. Details of upstream/internal failures are logged
    /// server-side and never echoed to the browser.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_code) = match &self {
            AppError::MissingCode => (StatusCode::BAD_REQUEST, "missing_code"),
            AppError::StateMismatch => (StatusCode::BAD_REQUEST, "state_mismatch"),
            AppError::HttpClient(error) => {
                tracing::error!(%error, "Token endpoint request failed");
                (StatusCode::BAD_GATEWAY, "token_exchange_failed")
            }
            AppError::Config(message) => {
                tracing::error!(%message, "Configuration error surfaced during a request");
                (StatusCode::INTERNAL_SERVER_ERROR, "config")
            }
            AppError::Internal(error) => {
                tracing::error!(%error, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };

        let body = Json(serde_json::json!({
            "error": error_code,
        }));

        (status, [(header::CACHE_CONTROL, "no-store")], body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
