// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client.
//!
//! Handles:
//! - Authorization code exchange
//! - Token refresh
//! - Activity listing (single page)
//! - Status mapping (401 token rejected, 429 rate limited)

use crate::config::Config;
use crate::error::AppError;
use crate::models::StravaActivitySummary;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Maximum page size accepted by the activity list endpoint.
pub const ACTIVITIES_PER_PAGE: u32 = 200;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry (Unix seconds)
    pub expires_at: i64,
}

/// Token exchange response from Strava OAuth (includes athlete info).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub athlete: StravaAthlete,
}

/// Athlete info from OAuth token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaAthlete {
    pub id: u64,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
}

/// URL of the Strava consent page.
pub fn authorize_url(oauth_url: &str, client_id: &str, redirect_uri: &str, state: &str) -> String {
    format!(
        "{}/authorize?client_id={}&redirect_uri={}&response_type=code&approval_prompt=force&scope={}&state={}",
        oauth_url.trim_end_matches('/'),
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode("read,activity:read"),
        urlencoding::encode(state),
    )
}

/// The Strava calls the application depends on.
#[async_trait]
pub trait StravaApi: Send + Sync {
    /// Exchange an OAuth authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<TokenExchangeResponse, AppError>;

    /// Refresh an expired access token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenRefreshResponse, AppError>;

    /// One page of the athlete's activities, optionally only those after
    /// `after` (Unix seconds).
    async fn list_activities(
        &self,
        access_token: &str,
        after: Option<i64>,
        per_page: u32,
    ) -> Result<Vec<StravaActivitySummary>, AppError>;
}

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    api_url: String,
    oauth_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::with_urls(
            config.strava_client_id.clone(),
            config.strava_client_secret.clone(),
            config.strava_api_url.clone(),
            config.strava_oauth_url.clone(),
        )
    }

    /// Create a client against non-default base URLs (stubs, proxies).
    pub fn with_urls(
        client_id: String,
        client_secret: String,
        api_url: String,
        oauth_url: String,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            oauth_url: oauth_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        })
    }

    fn token_url(&self) -> String {
        format!("{}/token", self.oauth_url)
    }

    /// Map a non-success status to an error; parse the body otherwise.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Strava rate limit hit (429)");
                return Err(AppError::StravaRateLimited);
            }

            if status.as_u16() == 401 {
                return Err(AppError::StravaUnauthorized);
            }

            return Err(AppError::StravaApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl StravaApi for StravaClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenExchangeResponse, AppError> {
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Strava token exchange failed");
            return Err(AppError::StravaApi(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("Failed to parse token response: {}", e)))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenRefreshResponse, AppError> {
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::TokenRefresh(format!("request failed: {}", e)))?;

        // Any rejection of the refresh grant is a refresh failure, whatever the status.
        Self::check_response_json(response)
            .await
            .map_err(|e| match e {
                AppError::TokenRefresh(_) => e,
                other => AppError::TokenRefresh(other.to_string()),
            })
    }

    async fn list_activities(
        &self,
        access_token: &str,
        after: Option<i64>,
        per_page: u32,
    ) -> Result<Vec<StravaActivitySummary>, AppError> {
        let url = format!("{}/athlete/activities", self.api_url);

        let mut query = vec![("per_page", per_page.to_string())];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        Self::check_response_json(response).await
    }
}
