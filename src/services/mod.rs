// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod challenges;
pub mod cleanup;
pub mod ranking;
pub mod submissions;
pub mod users;

use serde::Serialize;

pub use challenges::{CascadeOutcome, ChallengeService, SweepReport};
pub use cleanup::CleanupScheduler;
pub use ranking::{MyRanking, RankingService};
pub use submissions::{DeleteOutcome, RatingOutcome, SubmissionService};
pub use users::UserService;

/// Outcome of an edit that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateOutcome {
    Updated,
    /// Nothing to apply, or every field already had the given value
    NoChanges,
    /// The target can no longer be edited
    Rejected { submission_count: u64 },
}
