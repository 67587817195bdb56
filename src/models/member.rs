// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Member and athlete profile models.
//!
//! Both are owned by the membership/admin layer; this service only reads them.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Role flag carried in the session and stored on the member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Role {
    /// Registered account that is not (yet) a club member.
    #[default]
    User,
    Member,
    Admin,
}

impl Role {
    /// Members and admins may see club-internal pages.
    pub fn is_member(self) -> bool {
        matches!(self, Role::Member | Role::Admin)
    }
}

/// Registered member (document ID = member ID).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub member_id: String,
    pub name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// Linked athlete profile, if the admin created one for this member.
    pub athlete_id: Option<String>,
}

/// Public athlete profile (roster entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Athlete {
    pub athlete_id: String,
    pub name: String,
    pub slug: String,
}
