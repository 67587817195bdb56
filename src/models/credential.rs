// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stored Strava credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A member's Strava OAuth tokens (encrypted at rest).
///
/// One document per member, keyed by `member_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StravaCredential {
    pub member_id: String,
    /// Strava athlete ID from the OAuth exchange
    pub strava_athlete_id: Option<String>,
    /// Encrypted access token (base64)
    pub access_token_encrypted: String,
    /// Encrypted refresh token (base64)
    pub refresh_token_encrypted: String,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
    /// Last successful sync; `None` until the first one completes
    #[serde(default)]
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl StravaCredential {
    /// Expired at or before `now` (no grace margin).
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn credential(expires_at: DateTime<Utc>) -> StravaCredential {
        StravaCredential {
            member_id: "m1".to_string(),
            strava_athlete_id: None,
            access_token_encrypted: "a".to_string(),
            refresh_token_encrypted: "r".to_string(),
            expires_at,
            last_sync_at: None,
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        assert!(credential(now).is_expired(now));
        assert!(credential(now - Duration::seconds(1)).is_expired(now));
        assert!(!credential(now + Duration::seconds(1)).is_expired(now));
    }
}
