// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Yearly distance aggregates per member.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::activity::{ActivityKind, StravaActivitySummary};

/// Distance totals for one member and one calendar year.
///
/// Stored in `strava_year_stats`, document ID `{member_id}_{year}`.
///
/// A sync overwrites `run_km`/`bike_km` with the totals of the activities it
/// fetched. The fetch window starts at the previous sync, so after several
/// incremental syncs the stored value only covers the most recent window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearStats {
    pub member_id: String,
    pub athlete_id: String,
    pub year: i32,
    pub run_km: f64,
    pub bike_km: f64,
    pub updated_at: DateTime<Utc>,
}

impl YearStats {
    pub fn document_id(member_id: &str, year: i32) -> String {
        format!("{}_{}", member_id, year)
    }
}

/// Running totals computed from one batch of fetched activities.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct YearTotals {
    pub run_km: f64,
    pub bike_km: f64,
    /// Activities that landed in either bucket
    pub counted: usize,
}

impl YearTotals {
    /// Sum run and bike distances (km) of activities starting at or after
    /// `year_start`. Other kinds and earlier activities are ignored.
    pub fn from_activities(activities: &[StravaActivitySummary], year_start: DateTime<Utc>) -> Self {
        let mut totals = Self::default();

        for activity in activities.iter().filter(|a| a.start_date >= year_start) {
            let km = activity.distance / 1000.0;
            match activity.activity_kind() {
                ActivityKind::Run => totals.run_km += km,
                ActivityKind::Bike => totals.bike_km += km,
                ActivityKind::Other => continue,
            }
            totals.counted += 1;
        }

        totals
    }
}
