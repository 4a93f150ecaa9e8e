// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Challenge (reto) model: a time-boxed activity users post submissions to.

use crate::error::AppError;
use crate::ids;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// How long a challenge stays open after creation.
pub const CHALLENGE_LIFETIME_DAYS: i64 = 30;
/// Challenges a single user may create per calendar month.
pub const MONTHLY_CHALLENGE_LIMIT: u64 = 3;
/// Editing is allowed while a challenge has at most this many submissions.
pub const MAX_SUBMISSIONS_FOR_EDIT: u64 = 1;

/// Stored challenge document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Challenge {
    /// Time-ordered id; also the document ID
    pub id: String,
    pub title: String,
    pub description: String,
    /// Owning user (immutable)
    pub creator_id: String,
    /// `created_at + 30 days`, never advanced
    #[serde(with = "crate::time_utils::rfc3339")]
    pub expires_at: DateTime<Utc>,
    /// Cleared by the cleanup sweep once expired
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Fields supplied when creating a challenge.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewChallenge {
    #[validate(length(min = 5, max = 50))]
    pub title: String,
    #[validate(length(min = 10, max = 200))]
    pub description: String,
}

/// Partial update of a challenge. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ChallengePatch {
    #[validate(length(min = 5, max = 50))]
    pub title: Option<String>,
    #[validate(length(min = 10, max = 200))]
    pub description: Option<String>,
}

impl ChallengePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

impl Challenge {
    /// Build a validated challenge created at `now`.
    pub fn new(draft: NewChallenge, creator_id: &str, now: DateTime<Utc>) -> Result<Self, AppError> {
        draft.validate()?;

        Ok(Self {
            id: ids::new_id_at(now),
            title: draft.title,
            description: draft.description,
            creator_id: creator_id.to_string(),
            expires_at: now + Duration::days(CHALLENGE_LIFETIME_DAYS),
            active: true,
        })
    }

    /// Creation instant, recovered from the id.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        ids::id_timestamp(&self.id)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Creators may only delete a challenge once it has expired.
    pub fn can_be_deleted_at(&self, now: DateTime<Utc>) -> bool {
        self.is_expired_at(now)
    }

    /// Whole days left before expiry, floored and never negative.
    pub fn days_remaining_at(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_days().max(0)
    }
}

/// Challenge as returned by the API, annotated with its time state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChallengeView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub creator_id: String,
    pub created_at: Option<String>,
    pub expires_at: String,
    pub active: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub days_remaining: i64,
    pub is_expired: bool,
}

impl ChallengeView {
    pub fn at(challenge: Challenge, now: DateTime<Utc>) -> Self {
        let days_remaining = challenge.days_remaining_at(now);
        Self {
            created_at: challenge
                .created_at()
                .map(crate::time_utils::format_utc_rfc3339),
            expires_at: crate::time_utils::format_utc_rfc3339(challenge.expires_at),
            id: challenge.id,
            title: challenge.title,
            description: challenge.description,
            creator_id: challenge.creator_id,
            active: challenge.active,
            days_remaining,
            is_expired: days_remaining == 0,
        }
    }
}
