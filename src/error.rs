// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Insufficient role for this resource")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Strava rejected the refresh token (or the refresh call failed).
    #[error("Strava token refresh failed: {0}")]
    TokenRefresh(String),

    /// Strava answered 401 to an API call made with a locally-valid token.
    #[error("Strava rejected the access token")]
    StravaUnauthorized,

    #[error("Strava rate limit exceeded")]
    StravaRateLimited,

    #[error("Strava API error: {0}")]
    StravaApi(String),

    #[error("Token encryption error: {0}")]
    Crypto(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True when the failure means the stored Strava grant is no longer usable
    /// (refresh rejected or access token rejected).
    pub fn is_strava_token_error(&self) -> bool {
        matches!(
            self,
            AppError::TokenRefresh(_) | AppError::StravaUnauthorized
        )
    }

    /// Short machine-readable code used in API error bodies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Forbidden => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::TokenRefresh(_) => "strava_refresh_failed",
            AppError::StravaUnauthorized => "strava_token_rejected",
            AppError::StravaRateLimited => "strava_rate_limited",
            AppError::StravaApi(_) => "strava_error",
            AppError::Crypto(_) => "crypto_error",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, details) = match &self {
            AppError::Forbidden => (StatusCode::FORBIDDEN, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, Some(msg.clone())),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Some(msg.clone())),
            AppError::TokenRefresh(msg) | AppError::StravaApi(msg) => {
                (StatusCode::BAD_GATEWAY, Some(msg.clone()))
            }
            AppError::StravaUnauthorized => (StatusCode::BAD_GATEWAY, None),
            AppError::StravaRateLimited => (StatusCode::SERVICE_UNAVAILABLE, None),
            AppError::Crypto(msg) => {
                tracing::error!(error = %msg, "Token encryption error");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_errors_are_classified() {
        assert!(AppError::TokenRefresh("invalid_grant".into()).is_strava_token_error());
        assert!(AppError::StravaUnauthorized.is_strava_token_error());
        assert!(!AppError::StravaRateLimited.is_strava_token_error());
        assert!(!AppError::StravaApi("HTTP 500".into()).is_strava_token_error());
        assert!(!AppError::Database("down".into()).is_strava_token_error());
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::Forbidden, StatusCode::FORBIDDEN),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::StravaUnauthorized, StatusCode::BAD_GATEWAY),
            (AppError::StravaRateLimited, StatusCode::SERVICE_UNAVAILABLE),
            (
                AppError::Database("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
