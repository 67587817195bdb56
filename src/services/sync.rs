// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava activity sync.
//!
//! For one member:
//! 1. Load the stored credential and linked athlete profile (no-op if missing)
//! 2. Refresh the access token if it has expired
//! 3. Fetch activities since the last sync (or the past year)
//! 4. Sum run / bike distance for the current calendar year
//! 5. Replace the member's yearly aggregate and record the sync time
//!
//! The batch entry point runs this for every credential holder, one at a
//! time, pausing between members to stay inside Strava's rate limit.

use crate::db::{AggregateStore, ClubStore, CredentialStore, MemberStore};
use crate::error::{AppError, Result};
use crate::models::{YearStats, YearTotals};
use crate::services::crypto::TokenCipher;
use crate::services::strava::{StravaApi, ACTIVITIES_PER_PAGE};
use crate::time_utils::{current_year, sync_window_start, year_start};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Per-member locks serializing overlapping syncs.
///
/// Entries are never pruned. There is at most one per member that has ever
/// synced in this process, so the map stays bounded by the club roster.
pub type MemberLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Result of a successful sync call.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Synced(SyncSummary),
    /// No Strava account, or no athlete profile linked to the member.
    NoLinkedAccount,
}

/// What a completed sync wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncSummary {
    pub member_id: String,
    pub year: i32,
    pub run_km: f64,
    pub bike_km: f64,
    /// Activities returned by Strava for the window
    pub fetched: usize,
    /// Activities that contributed to a bucket
    pub counted: usize,
    pub token_refreshed: bool,
}

/// Outcome counts of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BatchReport {
    pub attempted: u32,
    pub synced: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// Runs Strava syncs against the injected store, API client and cipher.
#[derive(Clone)]
pub struct SyncService {
    db: Arc<dyn ClubStore>,
    strava: Arc<dyn StravaApi>,
    cipher: TokenCipher,
    member_locks: MemberLocks,
}

impl SyncService {
    pub fn new(db: Arc<dyn ClubStore>, strava: Arc<dyn StravaApi>, cipher: TokenCipher) -> Self {
        Self {
            db,
            strava,
            cipher,
            member_locks: Arc::new(DashMap::new()),
        }
    }

    /// Sync one member now.
    pub async fn sync_member(&self, member_id: &str) -> Result<SyncOutcome> {
        self.sync_member_at(member_id, Utc::now()).await
    }

    /// Sync one member as of `now`.
    ///
    /// Errors abort the sync before the aggregate is written; the caller
    /// decides whether to surface or swallow them.
    pub async fn sync_member_at(&self, member_id: &str, now: DateTime<Utc>) -> Result<SyncOutcome> {
        let lock = self
            .member_locks
            .entry(member_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let result = self.run_sync(member_id, now).await;

        match &result {
            Ok(SyncOutcome::Synced(summary)) => tracing::info!(
                member_id,
                year = summary.year,
                run_km = summary.run_km,
                bike_km = summary.bike_km,
                fetched = summary.fetched,
                "Strava sync complete"
            ),
            Ok(SyncOutcome::NoLinkedAccount) => {
                tracing::debug!(member_id, "No linked Strava account, nothing to sync")
            }
            Err(e) if e.is_strava_token_error() => tracing::warn!(
                member_id,
                error = %e,
                kind = e.code(),
                "Strava grant no longer valid, member must reconnect"
            ),
            Err(e) => tracing::error!(
                member_id,
                error = %e,
                kind = e.code(),
                "Strava sync failed"
            ),
        }

        result
    }

    async fn run_sync(&self, member_id: &str, now: DateTime<Utc>) -> Result<SyncOutcome> {
        // 1. Credential and linked athlete profile
        let Some(credential) = self.db.get_credential(member_id).await? else {
            return Ok(SyncOutcome::NoLinkedAccount);
        };
        let Some(athlete_id) = self
            .db
            .get_member(member_id)
            .await?
            .and_then(|m| m.athlete_id)
        else {
            return Ok(SyncOutcome::NoLinkedAccount);
        };

        // 2. Refresh if expired; nothing is written unless Strava accepts the grant
        let token_refreshed = credential.is_expired(now);
        let access_token = if token_refreshed {
            tracing::info!(member_id, "Access token expired, refreshing");
            self.refresh_access_token(member_id, &credential.refresh_token_encrypted)
                .await?
        } else {
            self.cipher
                .decrypt(&credential.access_token_encrypted, member_id)?
        };

        // 3. Fetch window
        let after = sync_window_start(credential.last_sync_at, now).timestamp();

        // 4. One page of activities
        let activities = self
            .strava
            .list_activities(&access_token, Some(after), ACTIVITIES_PER_PAGE)
            .await?;

        // 5. Current-year totals
        let year = current_year(now);
        let totals = YearTotals::from_activities(&activities, year_start(year));

        // 6. Replace the yearly aggregate
        let stats = YearStats {
            member_id: member_id.to_string(),
            athlete_id,
            year,
            run_km: totals.run_km,
            bike_km: totals.bike_km,
            updated_at: now,
        };
        self.db.upsert_year_stats(&stats).await?;

        // 7. Advance the window
        self.db.touch_last_sync(member_id, now).await?;

        Ok(SyncOutcome::Synced(SyncSummary {
            member_id: member_id.to_string(),
            year,
            run_km: totals.run_km,
            bike_km: totals.bike_km,
            fetched: activities.len(),
            counted: totals.counted,
            token_refreshed,
        }))
    }

    /// Exchange the stored refresh token and persist the new pair.
    /// Returns the new plaintext access token.
    async fn refresh_access_token(
        &self,
        member_id: &str,
        refresh_token_encrypted: &str,
    ) -> Result<String> {
        let refresh_token = self.cipher.decrypt(refresh_token_encrypted, member_id)?;

        let new_tokens = self.strava.refresh_token(&refresh_token).await?;

        let expires_at = DateTime::from_timestamp(new_tokens.expires_at, 0).ok_or_else(|| {
            AppError::TokenRefresh(format!(
                "invalid expires_at in refresh response: {}",
                new_tokens.expires_at
            ))
        })?;

        let (enc_access, enc_refresh) = self.cipher.encrypt_tokens(
            &new_tokens.access_token,
            &new_tokens.refresh_token,
            member_id,
        )?;

        self.db
            .update_tokens(member_id, &enc_access, &enc_refresh, expires_at)
            .await?;

        tracing::info!(member_id, expires_at = %expires_at, "Token refreshed");
        Ok(new_tokens.access_token)
    }

    /// Sync every member holding a Strava credential, sequentially.
    ///
    /// Per-member failures are logged and counted; only failing to list the
    /// members is an error.
    pub async fn sync_all(&self, pacing: Duration) -> Result<BatchReport> {
        let member_ids = self.db.list_credential_members().await?;
        let mut report = BatchReport::default();

        tracing::info!(count = member_ids.len(), "Starting batch Strava sync");

        for (i, member_id) in member_ids.iter().enumerate() {
            if i > 0 && !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }

            report.attempted += 1;
            match self.sync_member(member_id).await {
                Ok(SyncOutcome::Synced(_)) => report.synced += 1,
                Ok(SyncOutcome::NoLinkedAccount) => report.skipped += 1,
                // Already logged by sync_member_at
                Err(_) => report.failed += 1,
            }
        }

        tracing::info!(
            attempted = report.attempted,
            synced = report.synced,
            skipped = report.skipped,
            failed = report.failed,
            "Batch Strava sync finished"
        );

        Ok(report)
    }
}
