// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod activity;
pub mod credential;
pub mod member;
pub mod stats;

pub use activity::{ActivityKind, StravaActivitySummary};
pub use credential::StravaCredential;
pub use member::{Athlete, Member, Role};
pub use stats::{YearStats, YearTotals};
