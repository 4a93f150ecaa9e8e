// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Challenge lifecycle: creation quota, edits, expiry-gated deletion,
//! attaching submissions, and the expiry sweep.
//!
//! Deletes cascade challenge -> submissions as a sequence of independent
//! writes. There is no rollback; a cascade that stops part way reports how
//! far it got through [`AppError::CascadeIncomplete`].

use crate::db::repository::text_patch;
use crate::db::Repository;
use crate::error::AppError;
use crate::ids;
use crate::media::VideoUpload;
use crate::models::challenge::{MAX_SUBMISSIONS_FOR_EDIT, MONTHLY_CHALLENGE_LIMIT};
use crate::models::{
    Challenge, ChallengePatch, ChallengeView, NewChallenge, NewSubmission, Submission,
};
use crate::services::{SubmissionService, UpdateOutcome};
use crate::time_utils::start_of_month;
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use validator::Validate;

const MAX_CONCURRENT_PURGES: usize = 8;

/// Result of a creator-initiated delete.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CascadeOutcome {
    pub challenge_id: String,
    pub submissions_deleted: usize,
}

/// Result of one expiry sweep.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SweepReport {
    pub challenges_deactivated: usize,
    pub submissions_deleted: usize,
}

#[derive(Clone)]
pub struct ChallengeService {
    repo: Repository,
    submissions: SubmissionService,
}

impl ChallengeService {
    pub fn new(repo: Repository, submissions: SubmissionService) -> Self {
        Self { repo, submissions }
    }

    async fn load(&self, challenge_id: &str) -> Result<Challenge, AppError> {
        self.repo
            .get_challenge(challenge_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Challenge {} not found", challenge_id)))
    }

    // ─── Creation ────────────────────────────────────────────────

    pub async fn create(&self, draft: NewChallenge, creator_id: &str) -> Result<Challenge, AppError> {
        self.create_at(draft, creator_id, Utc::now()).await
    }

    /// Create a challenge, enforcing the per-creator monthly quota.
    pub async fn create_at(
        &self,
        draft: NewChallenge,
        creator_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Challenge, AppError> {
        draft.validate()?;
        self.check_quota(creator_id, now).await?;

        let challenge = Challenge::new(draft, creator_id, now)?;
        self.repo.insert_challenge(&challenge).await?;

        tracing::info!(
            challenge_id = %challenge.id,
            creator_id,
            expires_at = %challenge.expires_at,
            "Challenge created"
        );

        Ok(challenge)
    }

    /// Challenges created since the start of the month are counted through
    /// the creation time embedded in their ids.
    async fn check_quota(&self, creator_id: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        let floor = ids::id_floor(start_of_month(now));
        let created = self.repo.count_challenges_since(creator_id, &floor).await?;

        if created >= MONTHLY_CHALLENGE_LIMIT {
            tracing::info!(creator_id, created, "Monthly challenge quota exhausted");
            return Err(AppError::BusinessLogic(format!(
                "Monthly challenge limit reached ({} per month)",
                MONTHLY_CHALLENGE_LIMIT
            )));
        }
        Ok(())
    }

    /// Create a challenge and its first submission.
    ///
    /// Both parts are validated before anything is written. If the
    /// submission step fails, the challenge stays and the error names it.
    pub async fn create_with_submission_at(
        &self,
        challenge_draft: NewChallenge,
        submission_draft: NewSubmission,
        video: VideoUpload,
        actor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(Challenge, Submission), AppError> {
        challenge_draft.validate()?;
        submission_draft.validate()?;

        let challenge = self.create_at(challenge_draft, actor_id, now).await?;

        match self
            .submissions
            .create_at(&challenge.id, actor_id, submission_draft, video, now)
            .await
        {
            Ok(submission) => Ok((challenge, submission)),
            Err(e) => {
                tracing::error!(
                    challenge_id = %challenge.id,
                    error = %e,
                    "Challenge created but its first submission failed"
                );
                Err(e.with_context(&format!(
                    "Challenge {} was created but its submission was not",
                    challenge.id
                )))
            }
        }
    }

    // ─── Reads ───────────────────────────────────────────────────

    pub async fn list_at(
        &self,
        only_open: bool,
        limit: u32,
        offset: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<ChallengeView>, AppError> {
        Ok(self
            .repo
            .list_challenges(only_open, now, limit, offset)
            .await?
            .into_iter()
            .map(|c| ChallengeView::at(c, now))
            .collect())
    }

    pub async fn get_at(&self, challenge_id: &str, now: DateTime<Utc>) -> Result<ChallengeView, AppError> {
        Ok(ChallengeView::at(self.load(challenge_id).await?, now))
    }

    pub async fn list_by_creator_at(
        &self,
        creator_id: &str,
        limit: u32,
        offset: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<ChallengeView>, AppError> {
        Ok(self
            .repo
            .list_challenges_by_creator(creator_id, limit, offset)
            .await?
            .into_iter()
            .map(|c| ChallengeView::at(c, now))
            .collect())
    }

    // ─── Creator operations ──────────────────────────────────────

    /// Edit title and/or description. Refused once the challenge has more
    /// than one submission.
    pub async fn update(
        &self,
        challenge_id: &str,
        actor_id: &str,
        patch: ChallengePatch,
    ) -> Result<UpdateOutcome, AppError> {
        patch.validate()?;

        let challenge = self.load(challenge_id).await?;
        if challenge.creator_id != actor_id {
            return Err(AppError::Authorization(
                "Only the creator can edit this challenge".to_string(),
            ));
        }

        let submission_count = self
            .repo
            .count_submissions_for_challenge(challenge_id)
            .await?;
        if submission_count > MAX_SUBMISSIONS_FOR_EDIT {
            return Ok(UpdateOutcome::Rejected { submission_count });
        }

        if patch.is_empty() {
            return Ok(UpdateOutcome::NoChanges);
        }

        let modified = self
            .repo
            .update_challenge(
                challenge_id,
                text_patch(patch.title.as_deref(), patch.description.as_deref()),
            )
            .await?;

        Ok(if modified == 0 {
            UpdateOutcome::NoChanges
        } else {
            tracing::info!(challenge_id, actor_id, "Challenge updated");
            UpdateOutcome::Updated
        })
    }

    pub async fn delete(&self, challenge_id: &str, actor_id: &str) -> Result<CascadeOutcome, AppError> {
        self.delete_at(challenge_id, actor_id, Utc::now()).await
    }

    /// Creator-initiated delete, allowed only once the challenge has expired.
    /// Submissions go first, then the challenge document.
    pub async fn delete_at(
        &self,
        challenge_id: &str,
        actor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CascadeOutcome, AppError> {
        let challenge = self.load(challenge_id).await?;
        if challenge.creator_id != actor_id {
            return Err(AppError::Authorization(
                "Only the creator can delete this challenge".to_string(),
            ));
        }
        if !challenge.can_be_deleted_at(now) {
            return Err(AppError::BusinessLogic(
                "A challenge can only be deleted after it expires".to_string(),
            ));
        }

        let submissions_deleted = self.cascade_submissions(&challenge).await?;

        if let Err(e) = self.repo.delete_challenge(challenge_id).await {
            tracing::error!(
                challenge_id,
                submissions_deleted,
                error = %e,
                "Submissions deleted but challenge delete failed"
            );
            return Err(AppError::CascadeIncomplete {
                completed: submissions_deleted,
                total: submissions_deleted + 1,
                message: e.to_string(),
            });
        }

        tracing::info!(challenge_id, actor_id, submissions_deleted, "Challenge deleted");

        Ok(CascadeOutcome {
            challenge_id: challenge_id.to_string(),
            submissions_deleted,
        })
    }

    /// Delete every submission of `challenge`. Returns how many were deleted.
    async fn cascade_submissions(&self, challenge: &Challenge) -> Result<usize, AppError> {
        let submissions = self
            .repo
            .list_submissions_by_challenge(&challenge.id)
            .await?;
        let total = submissions.len();

        let results: Vec<Result<bool, AppError>> = stream::iter(submissions)
            .map(|submission| async move { self.submissions.purge(&submission).await })
            .buffer_unordered(MAX_CONCURRENT_PURGES)
            .collect()
            .await;

        let mut completed = 0;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(_) => completed += 1,
                Err(e) => {
                    tracing::error!(challenge_id = %challenge.id, error = %e, "Submission delete failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            None => Ok(completed),
            Some(e) => Err(AppError::CascadeIncomplete {
                completed,
                total,
                message: e.to_string(),
            }),
        }
    }

    /// Point an existing submission at an open challenge.
    pub async fn attach_at(
        &self,
        challenge_id: &str,
        submission_id: &str,
        actor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let challenge = self.load(challenge_id).await?;
        // Existence check; the write below re-reads under the submission lock.
        self.submissions.get_one(submission_id).await?;

        if challenge.is_expired_at(now) {
            return Err(AppError::BusinessLogic(
                "Cannot attach a submission to an expired challenge".to_string(),
            ));
        }

        self.submissions
            .set_challenge(submission_id, challenge_id)
            .await?;

        tracing::info!(challenge_id, submission_id, actor_id, "Submission attached");
        Ok(())
    }

    // ─── Sweep ───────────────────────────────────────────────────

    /// Deactivate every active challenge that expired before `now`, deleting
    /// its submissions first.
    ///
    /// Stops at the first failure with the counts completed so far.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, AppError> {
        let expired = self.repo.find_expired_active_challenges(now).await?;
        let total = expired.len();
        let mut report = SweepReport::default();

        for challenge in &expired {
            let deleted = match self.cascade_submissions(challenge).await {
                Ok(deleted) => deleted,
                Err(e) => return Err(sweep_stopped(challenge, &report, total, e)),
            };
            report.submissions_deleted += deleted;

            if let Err(e) = self.repo.deactivate_challenge(&challenge.id).await {
                return Err(sweep_stopped(challenge, &report, total, e));
            }

            report.challenges_deactivated += 1;
            tracing::debug!(challenge_id = %challenge.id, "Expired challenge deactivated");
        }

        Ok(report)
    }
}

fn sweep_stopped(challenge: &Challenge, report: &SweepReport, total: usize, e: AppError) -> AppError {
    tracing::error!(
        challenge_id = %challenge.id,
        challenges_deactivated = report.challenges_deactivated,
        submissions_deleted = report.submissions_deleted,
        error = %e,
        "Cleanup sweep stopped"
    );
    AppError::CascadeIncomplete {
        completed: report.challenges_deactivated,
        total,
        message: e.to_string(),
    }
}
