// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod crypto;
pub mod strava;
pub mod sync;

pub use crypto::{CipherError, TokenCipher};
pub use strava::{StravaApi, StravaClient};
pub use sync::{BatchReport, SyncOutcome, SyncService, SyncSummary};
