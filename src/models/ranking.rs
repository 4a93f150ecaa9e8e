// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Derived per-user scores and leaderboard pages.
//!
//! Nothing here is stored: every value is recomputed from submissions at
//! read time.

use crate::models::submission::{round2, Submission};
use crate::models::User;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Aggregate score of one user's submissions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ScoreSummary {
    /// Sum of the submissions' average ratings (2dp)
    pub score_total: f64,
    pub submission_count: usize,
    /// `score_total / rated_submission_count` (2dp), 0 when unrated
    pub mean_score: f64,
    /// Individual rating events across all submissions
    pub rated_submission_count: usize,
}

impl ScoreSummary {
    pub fn from_submissions(submissions: &[Submission]) -> Self {
        let score_total: f64 = submissions.iter().map(|s| s.average_rating).sum();
        let rated_submission_count: usize = submissions.iter().map(|s| s.ratings.len()).sum();

        let mean_score = if rated_submission_count > 0 {
            score_total / rated_submission_count as f64
        } else {
            0.0
        };

        Self {
            score_total: round2(score_total),
            submission_count: submissions.len(),
            mean_score: round2(mean_score),
            rated_submission_count,
        }
    }
}

/// One leaderboard row: public profile plus score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RankingEntry {
    pub user_id: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub photo: Option<String>,
    pub city: Option<String>,
    #[serde(flatten)]
    pub summary: ScoreSummary,
    /// 1-based, assigned after sorting; 0 means unranked
    pub position: usize,
}

impl RankingEntry {
    pub fn new(user: &User, summary: ScoreSummary) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.name.clone(),
            surname: user.surname.clone(),
            email: user.email.clone(),
            photo: user.photo.clone(),
            city: user.city.clone(),
            summary,
            position: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RankingPage {
    pub ranking: Vec<RankingEntry>,
    pub total: usize,
    pub current_page: u32,
    pub total_pages: u32,
}
