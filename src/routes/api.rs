// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for signed-in members.

use crate::db::{AggregateStore, CredentialStore, MemberStore};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthMember;
use crate::models::{Athlete, Role, YearStats};
use crate::services::{SyncOutcome, SyncSummary};
use crate::time_utils::{current_year, format_utc_rfc3339};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Entries per leaderboard.
const LEADERBOARD_SIZE: usize = 10;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/sync", post(sync_now))
        .route("/api/stats", get(get_club_stats))
}

// ─── Profile ─────────────────────────────────────────────────

/// Current-year totals as shown on the profile.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct YearStatsResponse {
    pub year: i32,
    pub run_km: f64,
    pub bike_km: f64,
    pub updated_at: String,
}

/// Current member response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MeResponse {
    pub member_id: String,
    pub name: String,
    pub email: Option<String>,
    pub role: Role,
    pub strava_connected: bool,
    pub strava_athlete_id: Option<String>,
    pub last_sync_at: Option<String>,
    pub stats: Option<YearStatsResponse>,
    /// All synced years, newest first
    pub history: Vec<YearStatsResponse>,
}

impl From<YearStats> for YearStatsResponse {
    fn from(s: YearStats) -> Self {
        Self {
            year: s.year,
            run_km: s.run_km,
            bike_km: s.bike_km,
            updated_at: format_utc_rfc3339(s.updated_at),
        }
    }
}

/// Get the member's profile and Strava status.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(member): Extension<AuthMember>,
) -> Result<Json<MeResponse>> {
    let profile = state
        .db
        .get_member(&member.member_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member {} not found", member.member_id)))?;

    let credential = state.db.get_credential(&member.member_id).await?;
    let history = state.db.list_member_year_stats(&member.member_id).await?;
    let year = current_year(Utc::now());
    let stats = history.iter().find(|s| s.year == year).cloned();

    Ok(Json(MeResponse {
        member_id: profile.member_id,
        name: profile.name,
        email: profile.email,
        role: profile.role,
        strava_connected: credential.is_some(),
        strava_athlete_id: credential.as_ref().and_then(|c| c.strava_athlete_id.clone()),
        last_sync_at: credential
            .and_then(|c| c.last_sync_at)
            .map(format_utc_rfc3339),
        stats: stats.map(YearStatsResponse::from),
        history: history.into_iter().map(YearStatsResponse::from).collect(),
    }))
}

// ─── Manual Sync ─────────────────────────────────────────────

/// Response for a member-triggered sync.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncResponse {
    pub success: bool,
    /// False when the member has no linked Strava account or athlete profile
    pub synced: bool,
    pub summary: Option<SyncSummary>,
}

/// Sync the signed-in member now. Failures surface as error responses.
async fn sync_now(
    State(state): State<Arc<AppState>>,
    Extension(member): Extension<AuthMember>,
) -> Result<Json<SyncResponse>> {
    tracing::info!(member_id = %member.member_id, "Member-triggered Strava sync");

    let response = match state.sync_service.sync_member(&member.member_id).await? {
        SyncOutcome::Synced(summary) => SyncResponse {
            success: true,
            synced: true,
            summary: Some(summary),
        },
        SyncOutcome::NoLinkedAccount => SyncResponse {
            success: true,
            synced: false,
            summary: None,
        },
    };

    Ok(Json(response))
}

// ─── Club Statistics ─────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
struct StatsQuery {
    #[validate(range(min = 2000, max = 2100))]
    year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub athlete_id: String,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub km: f64,
}

/// Club totals and leaderboards for one year.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ClubStatsResponse {
    pub year: i32,
    pub total_run_km: f64,
    pub total_bike_km: f64,
    pub athletes: usize,
    pub run_leaderboard: Vec<LeaderboardEntry>,
    pub bike_leaderboard: Vec<LeaderboardEntry>,
}

/// Club statistics; members and admins only.
async fn get_club_stats(
    State(state): State<Arc<AppState>>,
    Extension(member): Extension<AuthMember>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ClubStatsResponse>> {
    if !member.role.is_member() {
        return Err(AppError::Forbidden);
    }

    query
        .validate()
        .map_err(|e| AppError::BadRequest(format!("Invalid query: {}", e)))?;

    let year = query.year.unwrap_or_else(|| current_year(Utc::now()));
    let stats = state.db.list_year_stats(year).await?;

    let mut athletes = HashMap::new();
    for s in &stats {
        if athletes.contains_key(&s.athlete_id) {
            continue;
        }
        if let Some(athlete) = state.db.get_athlete(&s.athlete_id).await? {
            athletes.insert(s.athlete_id.clone(), athlete);
        }
    }

    Ok(Json(ClubStatsResponse {
        year,
        total_run_km: stats.iter().map(|s| s.run_km).sum(),
        total_bike_km: stats.iter().map(|s| s.bike_km).sum(),
        athletes: stats.len(),
        run_leaderboard: leaderboard(&stats, &athletes, |s| s.run_km),
        bike_leaderboard: leaderboard(&stats, &athletes, |s| s.bike_km),
    }))
}

/// Top entries by `km`, descending. Members with no distance still rank.
fn leaderboard(
    stats: &[YearStats],
    athletes: &HashMap<String, Athlete>,
    km: impl Fn(&YearStats) -> f64,
) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<&YearStats> = stats.iter().collect();
    ranked.sort_by(|a, b| km(b).total_cmp(&km(a)));

    ranked
        .into_iter()
        .take(LEADERBOARD_SIZE)
        .enumerate()
        .map(|(i, s)| {
            let athlete = athletes.get(&s.athlete_id);
            LeaderboardEntry {
                rank: i + 1,
                athlete_id: s.athlete_id.clone(),
                name: athlete.map(|a| a.name.clone()),
                slug: athlete.map(|a| a.slug.clone()),
                km: km(s),
            }
        })
        .collect()
}
