// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Operator task routes.
//!
//! Called by the scheduler with `Authorization: Bearer <CRON_SECRET>`,
//! never directly by members. The guard is applied in routes/mod.rs.

use crate::error::Result;
use crate::services::BatchReport;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tasks/sync-all", post(sync_all))
}

/// Batch sync result.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncAllResponse {
    pub success: bool,
    /// Credential holders attempted
    pub synced: u32,
    pub succeeded: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl From<BatchReport> for SyncAllResponse {
    fn from(report: BatchReport) -> Self {
        Self {
            success: true,
            synced: report.attempted,
            succeeded: report.synced,
            skipped: report.skipped,
            failed: report.failed,
        }
    }
}

/// Sync every member with a linked Strava account.
///
/// Runs to completion before responding; individual failures only show up
/// in the counts and the logs.
async fn sync_all(State(state): State<Arc<AppState>>) -> Result<Json<SyncAllResponse>> {
    let report = state
        .sync_service
        .sync_all(state.config.sync_pacing)
        .await?;

    Ok(Json(report.into()))
}
