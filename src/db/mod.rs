// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! The sync routine only sees the store traits below; production uses
//! Firestore, tests and local development use the in-memory store.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{Athlete, Member, StravaCredential, YearStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const MEMBERS: &str = "members";
    pub const ATHLETES: &str = "athletes";
    /// Encrypted Strava credentials (keyed by member_id)
    pub const STRAVA_ACCOUNTS: &str = "strava_accounts";
    /// Yearly distance aggregates (keyed by `{member_id}_{year}`)
    pub const STRAVA_YEAR_STATS: &str = "strava_year_stats";
}

/// Encrypted Strava credentials, one record per member.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_credential(&self, member_id: &str) -> Result<Option<StravaCredential>, AppError>;

    /// Create or fully replace a member's credential record.
    async fn set_credential(&self, credential: &StravaCredential) -> Result<(), AppError>;

    /// Overwrite the token pair and expiry after a refresh.
    async fn update_tokens(
        &self,
        member_id: &str,
        access_token_encrypted: &str,
        refresh_token_encrypted: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn touch_last_sync(&self, member_id: &str, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Member IDs of everyone holding a credential record.
    async fn list_credential_members(&self) -> Result<Vec<String>, AppError>;
}

/// Read access to member and athlete profiles.
#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn get_member(&self, member_id: &str) -> Result<Option<Member>, AppError>;
    async fn get_athlete(&self, athlete_id: &str) -> Result<Option<Athlete>, AppError>;
}

/// Yearly distance aggregates.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    async fn get_year_stats(&self, member_id: &str, year: i32)
        -> Result<Option<YearStats>, AppError>;

    /// Insert or replace the aggregate for `(stats.member_id, stats.year)`.
    async fn upsert_year_stats(&self, stats: &YearStats) -> Result<(), AppError>;

    async fn list_year_stats(&self, year: i32) -> Result<Vec<YearStats>, AppError>;

    /// Every yearly aggregate of one member, newest year first.
    async fn list_member_year_stats(&self, member_id: &str) -> Result<Vec<YearStats>, AppError>;
}

/// Everything the application needs from persistence.
pub trait ClubStore: CredentialStore + MemberStore + AggregateStore {}

impl<T> ClubStore for T where T: CredentialStore + MemberStore + AggregateStore {}
