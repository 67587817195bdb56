// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets are injected as environment variables by the deployment and read
//! once at startup.

use std::env;
use std::time::Duration;

/// Default Strava REST API base URL.
pub const STRAVA_API_URL: &str = "https://www.strava.com/api/v3";
/// Default Strava OAuth base URL (authorize / token endpoints live below it).
pub const STRAVA_OAUTH_URL: &str = "https://www.strava.com/oauth";

/// Which persistence backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// Process-local store, for local development without the emulator.
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::Invalid("STORE_BACKEND")),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Strava OAuth client ID (public)
    pub strava_client_id: String,
    /// Frontend URL for OAuth redirects
    pub frontend_url: String,
    /// Public URL of this API (OAuth callback is built from it)
    pub api_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,
    /// Delay between members in a batch sync
    pub sync_pacing: Duration,
    pub strava_api_url: String,
    pub strava_oauth_url: String,

    // --- Secrets ---
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Key material for stored token encryption
    pub encryption_key: Vec<u8>,
    /// Shared secret for the operator batch-sync trigger
    pub cron_secret: String,
    /// HMAC key for the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Fixed configuration for tests.
    pub fn test_default() -> Self {
        Self {
            strava_client_id: "test_client_id".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            api_url: "http://localhost:8080".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            sync_pacing: Duration::ZERO,
            strava_api_url: STRAVA_API_URL.to_string(),
            strava_oauth_url: STRAVA_OAUTH_URL.to_string(),
            strava_client_secret: "test_secret".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            encryption_key: b"test_encryption_key_material_32b".to_vec(),
            cron_secret: "test_cron_secret".to_string(),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            strava_client_id: required("STRAVA_CLIENT_ID")?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            api_url: env::var("API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend: env::var("STORE_BACKEND")
                .unwrap_or_else(|_| "firestore".to_string())
                .parse()?,
            sync_pacing: Duration::from_millis(
                env::var("SYNC_PACING_MS")
                    .ok()
                    .map(|v| v.parse().map_err(|_| ConfigError::Invalid("SYNC_PACING_MS")))
                    .transpose()?
                    .unwrap_or(2000),
            ),
            strava_api_url: env::var("STRAVA_API_URL")
                .unwrap_or_else(|_| STRAVA_API_URL.to_string()),
            strava_oauth_url: env::var("STRAVA_OAUTH_URL")
                .unwrap_or_else(|_| STRAVA_OAUTH_URL.to_string()),

            strava_client_secret: required("STRAVA_CLIENT_SECRET")?,
            jwt_signing_key: required("JWT_SIGNING_KEY")?.into_bytes(),
            encryption_key: required("ENCRYPTION_KEY")?.into_bytes(),
            cron_secret: required("CRON_SECRET")?,
            oauth_state_key: required("OAUTH_STATE_KEY")?.into_bytes(),
        })
    }
}

/// Read a required, trimmed, non-empty variable.
fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("STRAVA_CLIENT_ID", "test_id");
        env::set_var("STRAVA_CLIENT_SECRET", " test_secret\n");
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("ENCRYPTION_KEY", "some encryption key");
        env::set_var("CRON_SECRET", "cron");
        env::set_var("OAUTH_STATE_KEY", "state");
        env::set_var("STORE_BACKEND", "memory");
        env::set_var("SYNC_PACING_MS", "250");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.strava_client_id, "test_id");
        assert_eq!(config.strava_client_secret, "test_secret");
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.sync_pacing, Duration::from_millis(250));
        assert_eq!(config.strava_api_url, STRAVA_API_URL);
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!(
            "Firestore".parse::<StoreBackend>().unwrap(),
            StoreBackend::Firestore
        );
        assert!("postgres".parse::<StoreBackend>().is_err());
    }
}
