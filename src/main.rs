// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Club-Sync API Server
//!
//! Links club member accounts to Strava and keeps their yearly run and bike
//! distances in sync for the club leaderboards.

use club_sync::{
    config::{Config, StoreBackend},
    db::{ClubStore, FirestoreDb, MemoryDb},
    services::{StravaClient, TokenCipher},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.store_backend,
        "Starting Club-Sync API"
    );

    let db: Arc<dyn ClubStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryDb::new())
        }
    };

    let cipher = TokenCipher::new(&config.encryption_key)?;
    let strava = Arc::new(StravaClient::from_config(&config)?);
    tracing::info!(api_url = %config.strava_api_url, "Strava client initialized");

    let state = Arc::new(AppState::new(config.clone(), db, strava, cipher));

    let app = club_sync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("club_sync=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}
