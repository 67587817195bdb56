// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local store used by tests and `STORE_BACKEND=memory`.

use crate::db::{AggregateStore, CredentialStore, MemberStore};
use crate::error::AppError;
use crate::models::{Athlete, Member, StravaCredential, YearStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory implementation of every store trait.
///
/// Cloning shares the underlying maps.
#[derive(Clone, Default)]
pub struct MemoryDb {
    members: Arc<DashMap<String, Member>>,
    athletes: Arc<DashMap<String, Athlete>>,
    credentials: Arc<DashMap<String, StravaCredential>>,
    year_stats: Arc<DashMap<(String, i32), YearStats>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_member(&self, member: Member) {
        self.members.insert(member.member_id.clone(), member);
    }

    pub fn insert_athlete(&self, athlete: Athlete) {
        self.athletes.insert(athlete.athlete_id.clone(), athlete);
    }

    /// Number of credential/aggregate writes performed so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MemberStore for MemoryDb {
    async fn get_member(&self, member_id: &str) -> Result<Option<Member>, AppError> {
        Ok(self.members.get(member_id).map(|m| m.clone()))
    }

    async fn get_athlete(&self, athlete_id: &str) -> Result<Option<Athlete>, AppError> {
        Ok(self.athletes.get(athlete_id).map(|a| a.clone()))
    }
}

#[async_trait]
impl CredentialStore for MemoryDb {
    async fn get_credential(&self, member_id: &str) -> Result<Option<StravaCredential>, AppError> {
        Ok(self.credentials.get(member_id).map(|c| c.clone()))
    }

    async fn set_credential(&self, credential: &StravaCredential) -> Result<(), AppError> {
        self.credentials
            .insert(credential.member_id.clone(), credential.clone());
        self.record_write();
        Ok(())
    }

    async fn update_tokens(
        &self,
        member_id: &str,
        access_token_encrypted: &str,
        refresh_token_encrypted: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut credential = self
            .credentials
            .get_mut(member_id)
            .ok_or_else(|| AppError::NotFound(format!("Strava account for member {}", member_id)))?;

        credential.access_token_encrypted = access_token_encrypted.to_string();
        credential.refresh_token_encrypted = refresh_token_encrypted.to_string();
        credential.expires_at = expires_at;
        drop(credential);

        self.record_write();
        Ok(())
    }

    async fn touch_last_sync(&self, member_id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut credential = self
            .credentials
            .get_mut(member_id)
            .ok_or_else(|| AppError::NotFound(format!("Strava account for member {}", member_id)))?;

        credential.last_sync_at = Some(at);
        drop(credential);

        self.record_write();
        Ok(())
    }

    async fn list_credential_members(&self) -> Result<Vec<String>, AppError> {
        let mut ids: Vec<String> = self.credentials.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl AggregateStore for MemoryDb {
    async fn get_year_stats(
        &self,
        member_id: &str,
        year: i32,
    ) -> Result<Option<YearStats>, AppError> {
        Ok(self
            .year_stats
            .get(&(member_id.to_string(), year))
            .map(|s| s.clone()))
    }

    async fn upsert_year_stats(&self, stats: &YearStats) -> Result<(), AppError> {
        self.year_stats
            .insert((stats.member_id.clone(), stats.year), stats.clone());
        self.record_write();
        Ok(())
    }

    async fn list_year_stats(&self, year: i32) -> Result<Vec<YearStats>, AppError> {
        Ok(self
            .year_stats
            .iter()
            .filter(|e| e.key().1 == year)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn list_member_year_stats(&self, member_id: &str) -> Result<Vec<YearStats>, AppError> {
        let mut stats: Vec<YearStats> = self
            .year_stats
            .iter()
            .filter(|e| e.key().0 == member_id)
            .map(|e| e.value().clone())
            .collect();
        stats.sort_by(|a, b| b.year.cmp(&a.year));
        Ok(stats)
    }
}
