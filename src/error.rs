use std::time::Duration;

use axum::http::header::{HeaderName, HeaderValue, RETRY_AFTER};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::limiter::LimiterError;
use crate::models::ErrorResponse;

/// Message returned to clients that exceed their request quota.
pub const RATE_LIMIT_MESSAGE: &str = "Demasiadas solicitudes";

/// Message returned for any internal failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Error interno del servidor";

/// `X-RateLimit-Limit` response header.
pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");

/// Application-wide error types with appropriate HTTP status codes.
///
/// The two gate rejections are terminal: they are turned into a response
/// directly and the request never reaches a route handler.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Origin not allowed: {origin}")]
    OriginRejected { origin: String },

    #[error("Rate limit exceeded for client {client_key}")]
    RateLimitExceeded {
        client_key: String,
        limit: u32,
        retry_after: Duration,
    },

    #[error("Invalid rate limiter settings: {0}")]
    Limiter(#[from] LimiterError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::OriginRejected { .. } => StatusCode::FORBIDDEN,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Limiter(_) | AppError::Internal(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // Empty body: nothing about the allowlist is revealed.
            AppError::OriginRejected { .. } => StatusCode::FORBIDDEN.into_response(),

            AppError::RateLimitExceeded {
                limit, retry_after, ..
            } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    axum::Json(ErrorResponse::new(RATE_LIMIT_MESSAGE)),
                )
                    .into_response();

                let headers = response.headers_mut();
                headers.insert(RETRY_AFTER, HeaderValue::from(retry_after_secs(retry_after)));
                headers.insert(X_RATELIMIT_LIMIT.clone(), HeaderValue::from(limit));
                response
            }

            // Log the details server-side, never expose them.
            other => {
                tracing::error!(error = %other, "Request failed");
                (
                    other.status(),
                    axum::Json(ErrorResponse::new(INTERNAL_ERROR_MESSAGE)),
                )
                    .into_response()
            }
        }
    }
}

/// Whole seconds until retry, rounded up, never less than one.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
