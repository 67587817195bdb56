// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT session middleware.
//!
//! The session layer of the membership site issues the token; here we only
//! verify it and expose the member identity and role to handlers.

use crate::models::Role;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "club_session";

const SESSION_LIFETIME_SECS: usize = 30 * 24 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (member ID)
    pub sub: String,
    #[serde(default)]
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated member extracted from the session.
#[derive(Debug, Clone)]
pub struct AuthMember {
    pub member_id: String,
    pub role: Role,
}

/// Middleware that requires a valid session.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let member = session_member(&jar, request.headers(), &state.config.jwt_signing_key)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(member);

    Ok(next.run(request).await)
}

/// Resolve the session from the cookie, then the `Authorization` header.
///
/// Used directly by handlers that must redirect rather than 401.
pub fn session_member(
    jar: &CookieJar,
    headers: &HeaderMap,
    signing_key: &[u8],
) -> Option<AuthMember> {
    let token = match jar.get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))?
            .to_string(),
    };

    let claims = verify_jwt(&token, signing_key)
        .map_err(|e| tracing::debug!(error = %e, "Rejected session token"))
        .ok()?;

    if claims.sub.is_empty() {
        return None;
    }

    Some(AuthMember {
        member_id: claims.sub,
        role: claims.role,
    })
}

/// Decode and validate a session token.
pub fn verify_jwt(token: &str, signing_key: &[u8]) -> jsonwebtoken::errors::Result<Claims> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &key, &validation).map(|data| data.claims)
}

/// Create a JWT for a member session.
pub fn create_jwt(member_id: &str, role: Role, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: member_id.to_string(),
        role,
        iat: now,
        exp: now + SESSION_LIFETIME_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
