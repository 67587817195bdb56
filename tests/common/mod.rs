// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use club_sync::config::Config;
use club_sync::db::{
    AggregateStore, ClubStore, CredentialStore, FirestoreDb, MemberStore, MemoryDb,
};
use club_sync::error::AppError;
use club_sync::middleware::auth::create_jwt;
use club_sync::models::{
    Athlete, Member, Role, StravaActivitySummary, StravaCredential, YearStats,
};
use club_sync::routes::create_router;
use club_sync::services::strava::{
    StravaAthlete, TokenExchangeResponse, TokenRefreshResponse,
};
use club_sync::services::{StravaApi, SyncService, TokenCipher};
use club_sync::AppState;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Fixed "now" used by the sync tests: 2026-06-15 12:00 UTC.
#[allow(dead_code)]
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn parse_time(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid RFC3339")
        .with_timezone(&Utc)
}

#[allow(dead_code)]
pub fn activity(id: u64, kind: &str, meters: f64, start: &str) -> StravaActivitySummary {
    StravaActivitySummary {
        id,
        kind: kind.to_string(),
        sport_type: None,
        name: format!("{} {}", kind, id),
        distance: meters,
        start_date: parse_time(start),
    }
}

/// Scripted Strava API that records every call.
#[derive(Default)]
pub struct FakeStrava {
    pub refresh_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub exchange_calls: AtomicUsize,
    /// "refresh" / "list" / "exchange", in call order
    pub calls: Mutex<Vec<&'static str>>,
    pub activities: Mutex<Vec<StravaActivitySummary>>,
    /// `None` makes the refresh grant fail
    pub refresh_response: Mutex<Option<TokenRefreshResponse>>,
    pub exchange_response: Mutex<Option<TokenExchangeResponse>>,
    /// Access tokens the listing endpoint rejects with 401
    pub rejected_tokens: Mutex<HashSet<String>>,
    /// Makes every listing fail with a non-401 API error
    pub list_error: Mutex<Option<String>>,
    pub seen_access_tokens: Mutex<Vec<String>>,
    pub seen_after: Mutex<Vec<Option<i64>>>,
}

#[allow(dead_code)]
impl FakeStrava {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_activities(&self, activities: Vec<StravaActivitySummary>) {
        *self.activities.lock().unwrap() = activities;
    }

    pub fn set_refresh_response(&self, access: &str, refresh: &str, expires_at: DateTime<Utc>) {
        *self.refresh_response.lock().unwrap() = Some(TokenRefreshResponse {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            expires_at: expires_at.timestamp(),
        });
    }

    pub fn set_exchange_response(&self, access: &str, refresh: &str, athlete_id: u64) {
        *self.exchange_response.lock().unwrap() = Some(TokenExchangeResponse {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            expires_at: (Utc::now() + chrono::Duration::hours(6)).timestamp(),
            athlete: StravaAthlete {
                id: athlete_id,
                firstname: Some("Test".to_string()),
                lastname: Some("Athlete".to_string()),
            },
        });
    }

    pub fn reject_token(&self, access_token: &str) {
        self.rejected_tokens
            .lock()
            .unwrap()
            .insert(access_token.to_string());
    }

    pub fn fail_listing(&self, message: &str) {
        *self.list_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn call_log(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.call_log().len()
    }
}

#[async_trait]
impl StravaApi for FakeStrava {
    async fn exchange_code(&self, _code: &str) -> Result<TokenExchangeResponse, AppError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push("exchange");
        self.exchange_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::StravaApi("exchange rejected".to_string()))
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenRefreshResponse, AppError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push("refresh");
        self.refresh_response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::TokenRefresh("HTTP 400: invalid_grant".to_string()))
    }

    async fn list_activities(
        &self,
        access_token: &str,
        after: Option<i64>,
        _per_page: u32,
    ) -> Result<Vec<StravaActivitySummary>, AppError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push("list");
        self.seen_access_tokens
            .lock()
            .unwrap()
            .push(access_token.to_string());
        self.seen_after.lock().unwrap().push(after);

        if self.rejected_tokens.lock().unwrap().contains(access_token) {
            return Err(AppError::StravaUnauthorized);
        }
        if let Some(message) = self.list_error.lock().unwrap().clone() {
            return Err(AppError::StravaApi(message));
        }
        Ok(self.activities.lock().unwrap().clone())
    }
}

/// Store write that [`FailingStore`] makes fail.
#[allow(dead_code)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    UpsertYearStats,
    TouchLastSync,
}

/// In-memory store whose chosen write always fails with a database error.
#[allow(dead_code)]
pub struct FailingStore {
    pub inner: MemoryDb,
    pub fail_on: FailOn,
}

impl FailingStore {
    fn fail(&self, op: FailOn) -> Result<(), AppError> {
        if self.fail_on == op {
            Err(AppError::Database("write rejected".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CredentialStore for FailingStore {
    async fn get_credential(&self, member_id: &str) -> Result<Option<StravaCredential>, AppError> {
        self.inner.get_credential(member_id).await
    }

    async fn set_credential(&self, credential: &StravaCredential) -> Result<(), AppError> {
        self.inner.set_credential(credential).await
    }

    async fn update_tokens(
        &self,
        member_id: &str,
        access_token_encrypted: &str,
        refresh_token_encrypted: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.inner
            .update_tokens(
                member_id,
                access_token_encrypted,
                refresh_token_encrypted,
                expires_at,
            )
            .await
    }

    async fn touch_last_sync(&self, member_id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        self.fail(FailOn::TouchLastSync)?;
        self.inner.touch_last_sync(member_id, at).await
    }

    async fn list_credential_members(&self) -> Result<Vec<String>, AppError> {
        self.inner.list_credential_members().await
    }
}

#[async_trait]
impl MemberStore for FailingStore {
    async fn get_member(&self, member_id: &str) -> Result<Option<Member>, AppError> {
        self.inner.get_member(member_id).await
    }

    async fn get_athlete(&self, athlete_id: &str) -> Result<Option<Athlete>, AppError> {
        self.inner.get_athlete(athlete_id).await
    }
}

#[async_trait]
impl AggregateStore for FailingStore {
    async fn get_year_stats(
        &self,
        member_id: &str,
        year: i32,
    ) -> Result<Option<YearStats>, AppError> {
        self.inner.get_year_stats(member_id, year).await
    }

    async fn upsert_year_stats(&self, stats: &YearStats) -> Result<(), AppError> {
        self.fail(FailOn::UpsertYearStats)?;
        self.inner.upsert_year_stats(stats).await
    }

    async fn list_year_stats(&self, year: i32) -> Result<Vec<YearStats>, AppError> {
        self.inner.list_year_stats(year).await
    }

    async fn list_member_year_stats(&self, member_id: &str) -> Result<Vec<YearStats>, AppError> {
        self.inner.list_member_year_stats(member_id).await
    }
}

/// Sync service over an in-memory store and a fake Strava API.
#[allow(dead_code)]
pub struct SyncHarness {
    pub db: MemoryDb,
    pub strava: Arc<FakeStrava>,
    pub cipher: TokenCipher,
    pub service: SyncService,
}

#[allow(dead_code)]
impl SyncHarness {
    pub fn new() -> Self {
        let db = MemoryDb::new();
        Self::over_store(db.clone(), Arc::new(db))
    }

    /// Harness whose store fails the given write; `db` still sees every
    /// write that succeeded.
    pub fn with_failing_store(fail_on: FailOn) -> Self {
        let db = MemoryDb::new();
        let store = FailingStore {
            inner: db.clone(),
            fail_on,
        };
        Self::over_store(db, Arc::new(store))
    }

    fn over_store(db: MemoryDb, store: Arc<dyn ClubStore>) -> Self {
        let config = Config::test_default();
        let strava = FakeStrava::new();
        let cipher = TokenCipher::new(&config.encryption_key).unwrap();
        let service = SyncService::new(
            store,
            strava.clone() as Arc<dyn StravaApi>,
            cipher.clone(),
        );
        Self {
            db,
            strava,
            cipher,
            service,
        }
    }

    /// A member with a linked athlete profile and a stored credential whose
    /// access token is `access-{member_id}`.
    pub async fn seed_linked_member(&self, member_id: &str, expires_at: DateTime<Utc>) {
        seed_linked_member(&self.db, &self.cipher, member_id, expires_at).await;
    }
}

#[allow(dead_code)]
pub async fn seed_linked_member(
    db: &MemoryDb,
    cipher: &TokenCipher,
    member_id: &str,
    expires_at: DateTime<Utc>,
) {
    let athlete_id = format!("athlete-{}", member_id);
    db.insert_member(Member {
        member_id: member_id.to_string(),
        name: format!("Member {}", member_id),
        email: Some(format!("{}@example.org", member_id)),
        role: Role::Member,
        athlete_id: Some(athlete_id.clone()),
    });
    db.insert_athlete(Athlete {
        athlete_id: athlete_id.clone(),
        name: format!("Athlete {}", member_id),
        slug: athlete_id,
    });

    let (access, refresh) = cipher
        .encrypt_tokens(
            &format!("access-{}", member_id),
            &format!("refresh-{}", member_id),
            member_id,
        )
        .unwrap();
    db.set_credential(&StravaCredential {
        member_id: member_id.to_string(),
        strava_athlete_id: Some("4242".to_string()),
        access_token_encrypted: access,
        refresh_token_encrypted: refresh,
        expires_at,
        last_sync_at: None,
    })
    .await
    .unwrap();
}

/// Create a test app over an in-memory store and a fake Strava API.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryDb, Arc<FakeStrava>) {
    let config = Config::test_default();
    let db = MemoryDb::new();
    let strava = FakeStrava::new();
    let cipher = TokenCipher::new(&config.encryption_key).unwrap();

    let state = Arc::new(AppState::new(
        config,
        Arc::new(db.clone()),
        strava.clone(),
        cipher,
    ));

    (create_router(state.clone()), state, db, strava)
}

/// Session token signed with the test key.
#[allow(dead_code)]
pub fn session_token(member_id: &str, role: Role) -> String {
    create_jwt(member_id, role, &Config::test_default().jwt_signing_key).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
