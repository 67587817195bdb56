// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared-secret guard for operator `/tasks/*` routes.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Require `Authorization: Bearer <CRON_SECRET>`.
pub async fn require_cron_secret(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(presented) = presented else {
        tracing::warn!("Blocked tasks request without bearer token");
        return Err(StatusCode::UNAUTHORIZED);
    };

    if !secret_matches(presented, &state.config.cron_secret) {
        tracing::warn!("Blocked tasks request with wrong cron secret");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

fn secret_matches(presented: &str, expected: &str) -> bool {
    // An unset secret never matches, not even an empty token.
    !expected.is_empty() && bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}
