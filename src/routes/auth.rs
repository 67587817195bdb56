// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth connection routes.
//!
//! A signed-in member is sent to Strava's consent page; the callback stores
//! the encrypted tokens on the member's credential record.

use axum::{
    extract::{Extension, Query, State},
    http::HeaderMap,
    response::Redirect,
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;

use crate::db::CredentialStore;
use crate::error::{AppError, Result};
use crate::middleware::auth::{session_member, AuthMember};
use crate::models::StravaCredential;
use crate::services::strava::authorize_url;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// How long a consent round trip may take before its state is rejected.
const STATE_MAX_AGE_SECS: i64 = 10 * 60;

/// Start of the flow; requires a session.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/strava", get(auth_start))
}

/// Strava redirects the browser here. Session problems become redirects,
/// not 401s, so this sits outside the auth layer.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/strava/callback", get(auth_callback))
}

/// Redirect the member to Strava's consent page.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Extension(member): Extension<AuthMember>,
) -> Result<Redirect> {
    let oauth_state = sign_state(&member.member_id, Utc::now(), &state.config.oauth_state_key)?;

    let url = authorize_url(
        &state.config.strava_oauth_url,
        &state.config.strava_client_id,
        &callback_url(&state.config.api_url),
        &oauth_state,
    );

    tracing::info!(member_id = %member.member_id, "Starting Strava OAuth flow");

    Ok(Redirect::temporary(&url))
}

fn callback_url(api_url: &str) -> String {
    format!("{}/auth/strava/callback", api_url.trim_end_matches('/'))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback: exchange the code and store the encrypted credential.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let frontend = state.config.frontend_url.trim_end_matches('/');
    let profile_error = |code: &str| Redirect::temporary(&format!("{}/profile?error={}", frontend, code));

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Strava authorization denied");
        return profile_error("strava_denied");
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return profile_error("no_code");
    };

    let Some(member) = session_member(&jar, &headers, &state.config.jwt_signing_key) else {
        return Redirect::temporary(&format!("{}/login", frontend));
    };

    let state_ok = params
        .state
        .as_deref()
        .and_then(|s| verify_state(s, &state.config.oauth_state_key, Utc::now()))
        .is_some_and(|bound| bound == member.member_id);
    if !state_ok {
        tracing::warn!(member_id = %member.member_id, "Invalid or mismatched OAuth state");
        return profile_error("invalid_state");
    }

    match connect_account(&state, &member.member_id, &code).await {
        Ok(()) => Redirect::temporary(&format!("{}/profile?strava=connected", frontend)),
        Err(e) => {
            tracing::error!(member_id = %member.member_id, error = %e, "Strava connection failed");
            profile_error("strava_failed")
        }
    }
}

/// Exchange the code and upsert the member's credential record.
async fn connect_account(state: &AppState, member_id: &str, code: &str) -> Result<()> {
    let tokens = state.strava.exchange_code(code).await?;

    let expires_at = DateTime::from_timestamp(tokens.expires_at, 0).ok_or_else(|| {
        AppError::StravaApi(format!("invalid expires_at: {}", tokens.expires_at))
    })?;

    let (access_enc, refresh_enc) =
        state
            .cipher
            .encrypt_tokens(&tokens.access_token, &tokens.refresh_token, member_id)?;

    // Re-authorization keeps the sync window.
    let last_sync_at = state
        .db
        .get_credential(member_id)
        .await?
        .and_then(|c| c.last_sync_at);

    state
        .db
        .set_credential(&StravaCredential {
            member_id: member_id.to_string(),
            strava_athlete_id: Some(tokens.athlete.id.to_string()),
            access_token_encrypted: access_enc,
            refresh_token_encrypted: refresh_enc,
            expires_at,
            last_sync_at,
        })
        .await?;

    tracing::info!(
        member_id,
        strava_athlete_id = tokens.athlete.id,
        "Strava account connected"
    );
    Ok(())
}

/// Build the signed `state`: base64url("member_id|timestamp_hex|signature_hex").
pub fn sign_state(member_id: &str, now: DateTime<Utc>, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", member_id, now.timestamp());
    let signature = state_mac(&payload, secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?
        .finalize()
        .into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify the signature and age of `state`; returns the bound member ID.
pub fn verify_state(state: &str, secret: &[u8], now: DateTime<Utc>) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Member IDs never contain '|', so split from the right.
    let mut parts = state_str.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let member_id = parts.next()?;

    let signature = hex::decode(signature_hex).ok()?;
    let payload = format!("{}|{}", member_id, timestamp_hex);
    if state_mac(&payload, secret).ok()?.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch");
        return None;
    }

    let issued = i64::from_str_radix(timestamp_hex, 16).ok()?;
    let age = now.timestamp() - issued;
    if !(0..=STATE_MAX_AGE_SECS).contains(&age) {
        tracing::warn!(age, "OAuth state expired");
        return None;
    }

    Some(member_id.to_string())
}

fn state_mac(payload: &str, secret: &[u8]) -> std::result::Result<HmacSha256, hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret)?;
    mac.update(payload.as_bytes());
    Ok(mac)
}
