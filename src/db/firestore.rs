// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Members and athlete profiles (read only)
//! - Strava credentials (encrypted OAuth tokens)
//! - Yearly distance aggregates

use crate::db::{collections, AggregateStore, CredentialStore, MemberStore};
use crate::error::AppError;
use crate::models::{Athlete, Member, StravaCredential, YearStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator does not need (or want) real credentials.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client for testing.
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Create or replace a member profile (admin tooling and tests).
    pub async fn upsert_member(&self, member: &Member) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::MEMBERS)
            .document_id(&member.member_id)
            .object(member)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Create or replace an athlete profile (admin tooling and tests).
    pub async fn upsert_athlete(&self, athlete: &Athlete) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ATHLETES)
            .document_id(&athlete.athlete_id)
            .object(athlete)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Fetch-modify-write on a credential record.
    async fn modify_credential<F>(&self, member_id: &str, modify: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut StravaCredential) + Send,
    {
        let mut credential = self
            .get_credential(member_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Strava account for member {}", member_id)))?;

        modify(&mut credential);
        self.set_credential(&credential).await
    }
}

#[async_trait]
impl MemberStore for FirestoreDb {
    async fn get_member(&self, member_id: &str) -> Result<Option<Member>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::MEMBERS)
            .obj()
            .one(member_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn get_athlete(&self, athlete_id: &str) -> Result<Option<Athlete>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ATHLETES)
            .obj()
            .one(athlete_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl CredentialStore for FirestoreDb {
    async fn get_credential(&self, member_id: &str) -> Result<Option<StravaCredential>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::STRAVA_ACCOUNTS)
            .obj()
            .one(member_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_credential(&self, credential: &StravaCredential) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::STRAVA_ACCOUNTS)
            .document_id(&credential.member_id)
            .object(credential)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update_tokens(
        &self,
        member_id: &str,
        access_token_encrypted: &str,
        refresh_token_encrypted: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let access = access_token_encrypted.to_string();
        let refresh = refresh_token_encrypted.to_string();
        self.modify_credential(member_id, move |c| {
            c.access_token_encrypted = access;
            c.refresh_token_encrypted = refresh;
            c.expires_at = expires_at;
        })
        .await
    }

    async fn touch_last_sync(&self, member_id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        self.modify_credential(member_id, move |c| c.last_sync_at = Some(at))
            .await
    }

    async fn list_credential_members(&self) -> Result<Vec<String>, AppError> {
        let credentials: Vec<StravaCredential> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::STRAVA_ACCOUNTS)
            .order_by([("member_id", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(credentials.into_iter().map(|c| c.member_id).collect())
    }
}

#[async_trait]
impl AggregateStore for FirestoreDb {
    async fn get_year_stats(
        &self,
        member_id: &str,
        year: i32,
    ) -> Result<Option<YearStats>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::STRAVA_YEAR_STATS)
            .obj()
            .one(&YearStats::document_id(member_id, year))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_year_stats(&self, stats: &YearStats) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::STRAVA_YEAR_STATS)
            .document_id(YearStats::document_id(&stats.member_id, stats.year))
            .object(stats)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_year_stats(&self, year: i32) -> Result<Vec<YearStats>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::STRAVA_YEAR_STATS)
            .filter(move |q| q.for_all([q.field("year").eq(year)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_member_year_stats(&self, member_id: &str) -> Result<Vec<YearStats>, AppError> {
        let member_id = member_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::STRAVA_YEAR_STATS)
            .filter(move |q| q.for_all([q.field("member_id").eq(member_id.clone())]))
            .order_by([("year", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
