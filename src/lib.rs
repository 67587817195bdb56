// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Club-Sync: Strava integration for a sports club membership site
//!
//! This crate provides the backend API that links member accounts to
//! Strava, keeps their yearly run / bike distance up to date and serves
//! club leaderboards.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::ClubStore;
use services::{StravaApi, SyncService, TokenCipher};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn ClubStore>,
    pub strava: Arc<dyn StravaApi>,
    pub cipher: TokenCipher,
    pub sync_service: SyncService,
}

impl AppState {
    /// Wire the sync service to the same store, client and cipher.
    pub fn new(
        config: Config,
        db: Arc<dyn ClubStore>,
        strava: Arc<dyn StravaApi>,
        cipher: TokenCipher,
    ) -> Self {
        let sync_service = SyncService::new(db.clone(), strava.clone(), cipher.clone());
        Self {
            config,
            db,
            strava,
            cipher,
            sync_service,
        }
    }
}
