// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Submission (publicacion) model with embedded ratings and comments.

use crate::error::AppError;
use crate::ids;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 5;

/// One user's score for a submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub rater_id: String,
    pub score: u8,
    #[serde(with = "crate::time_utils::rfc3339")]
    pub rated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    pub text: String,
    #[serde(with = "crate::time_utils::rfc3339")]
    pub created_at: DateTime<Utc>,
}

/// Stored submission document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    /// Time-ordered id; also the document ID
    pub id: String,
    pub title: String,
    pub description: String,
    /// Submitting user's id (immutable)
    pub owner_id: String,
    pub challenge_id: String,
    /// Handle into the media store
    pub video_ref: String,
    /// At most one entry per rater, in first-rated order
    #[serde(default)]
    pub ratings: Vec<Rating>,
    /// Mean of `ratings[*].score` to 2 decimals, 0 when unrated
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Bumped on every rating or comment write (optimistic concurrency)
    #[serde(default)]
    pub version: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewSubmission {
    #[validate(length(min = 5, max = 30))]
    pub title: String,
    #[validate(length(min = 10, max = 100))]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SubmissionPatch {
    #[validate(length(min = 5, max = 30))]
    pub title: Option<String>,
    #[validate(length(min = 10, max = 100))]
    pub description: Option<String>,
}

impl SubmissionPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewComment {
    #[validate(length(min = 1, max = 300))]
    pub text: String,
}

/// Round to two decimal places, halves to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Check a raw score against the 1-5 range.
pub fn check_score(score: i64) -> Result<u8, AppError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(score as u8)
    } else {
        Err(AppError::BusinessLogic(format!(
            "Score must be between {} and {}",
            MIN_SCORE, MAX_SCORE
        )))
    }
}

impl Submission {
    pub fn new(
        draft: NewSubmission,
        owner_id: &str,
        challenge_id: &str,
        video_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        draft.validate()?;

        Ok(Self {
            id: ids::new_id_at(now),
            title: draft.title,
            description: draft.description,
            owner_id: owner_id.to_string(),
            challenge_id: challenge_id.to_string(),
            video_ref: video_ref.to_string(),
            ratings: Vec::new(),
            average_rating: 0.0,
            comments: Vec::new(),
            version: 0,
        })
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        ids::id_timestamp(&self.id)
    }

    /// Insert or replace `rater_id`'s rating and recompute the average.
    ///
    /// A replaced rating keeps its position in the list. Returns `true` when
    /// an existing rating was replaced.
    pub fn upsert_rating(&mut self, rater_id: &str, score: u8, now: DateTime<Utc>) -> bool {
        let replaced = match self.ratings.iter_mut().find(|r| r.rater_id == rater_id) {
            Some(existing) => {
                existing.score = score;
                existing.rated_at = now;
                true
            }
            None => {
                self.ratings.push(Rating {
                    rater_id: rater_id.to_string(),
                    score,
                    rated_at: now,
                });
                false
            }
        };

        self.recompute_average();
        replaced
    }

    pub fn recompute_average(&mut self) {
        self.average_rating = if self.ratings.is_empty() {
            0.0
        } else {
            let sum: u64 = self.ratings.iter().map(|r| r.score as u64).sum();
            round2(sum as f64 / self.ratings.len() as f64)
        };
    }
}

/// Rating entry as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RatingView {
    pub rater_id: String,
    pub score: u8,
    pub rated_at: String,
}

impl From<&Rating> for RatingView {
    fn from(rating: &Rating) -> Self {
        Self {
            rater_id: rating.rater_id.clone(),
            score: rating.score,
            rated_at: format_utc_rfc3339(rating.rated_at),
        }
    }
}

/// Average, count and entries of a submission's ratings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RatingSummary {
    pub average: f64,
    pub count: usize,
    pub ratings: Vec<RatingView>,
}

impl From<&Submission> for RatingSummary {
    fn from(submission: &Submission) -> Self {
        Self {
            average: if submission.ratings.is_empty() {
                0.0
            } else {
                submission.average_rating
            },
            count: submission.ratings.len(),
            ratings: submission.ratings.iter().map(RatingView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CommentView {
    pub id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: String,
}

impl From<&Comment> for CommentView {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id.clone(),
            author_id: comment.author_id.clone(),
            text: comment.text.clone(),
            created_at: format_utc_rfc3339(comment.created_at),
        }
    }
}

/// Transport-safe projection of a stored submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SubmissionView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub owner_id: String,
    pub challenge_id: String,
    pub video_ref: String,
    pub video_url: String,
    pub created_at: Option<String>,
    pub ratings: Vec<RatingView>,
    pub average_rating: f64,
    pub comments: Vec<CommentView>,
}

impl From<Submission> for SubmissionView {
    fn from(submission: Submission) -> Self {
        Self {
            video_url: format!("/api/submissions/{}/video", submission.id),
            created_at: submission.created_at().map(format_utc_rfc3339),
            ratings: submission.ratings.iter().map(RatingView::from).collect(),
            comments: submission.comments.iter().map(CommentView::from).collect(),
            id: submission.id,
            title: submission.title,
            description: submission.description,
            owner_id: submission.owner_id,
            challenge_id: submission.challenge_id,
            video_ref: submission.video_ref,
            average_rating: submission.average_rating,
        }
    }
}
