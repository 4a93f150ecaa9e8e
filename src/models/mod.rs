// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod challenge;
pub mod ranking;
pub mod submission;
pub mod user;

pub use challenge::{Challenge, ChallengePatch, ChallengeView, NewChallenge};
pub use ranking::{RankingEntry, RankingPage, ScoreSummary};
pub use submission::{
    Comment, CommentView, NewComment, NewSubmission, Rating, RatingSummary, Submission,
    SubmissionPatch, SubmissionView,
};
pub use user::{ProfilePatch, Role, User};
