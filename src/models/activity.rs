// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava activity records as returned by the list endpoint.
//!
//! These are never persisted; a sync consumes them to compute yearly totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary activity from `GET /athlete/activities`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StravaActivitySummary {
    pub id: u64,
    /// Legacy activity type ("Run", "Ride", "VirtualRide", ...)
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub sport_type: Option<String>,
    #[serde(default)]
    pub name: String,
    /// Distance in meters
    pub distance: f64,
    pub start_date: DateTime<Utc>,
}

/// Bucket an activity contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Run,
    Bike,
    Other,
}

impl ActivityKind {
    /// Classify a Strava activity type label.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Run" => ActivityKind::Run,
            "Ride" | "VirtualRide" => ActivityKind::Bike,
            _ => ActivityKind::Other,
        }
    }
}

impl StravaActivitySummary {
    pub fn activity_kind(&self) -> ActivityKind {
        ActivityKind::from_label(&self.kind)
    }
}
