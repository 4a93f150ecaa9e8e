// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Submission & rating engine.
//!
//! Handles:
//! - Submission creation against an open challenge (media stored first)
//! - One rating per rater per submission, with the average kept in step
//! - Comments
//! - Owner-only edits and deletes
//!
//! Rating and comment writes are read-modify-write on the whole submission
//! document. A per-submission lock serialises writers in this process and a
//! version check on write catches writers in other processes.

use crate::db::Repository;
use crate::error::{AppError, FileError};
use crate::ids;
use crate::media::{MediaObject, MediaStore, VideoUpload};
use crate::models::submission::{check_score, RatingSummary};
use crate::models::{Comment, NewComment, NewSubmission, Submission, SubmissionPatch};
use crate::services::UpdateOutcome;
use crate::time_utils::with_deadline;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use validator::Validate;

/// Versioned writes attempted before giving up on a contended submission.
const MAX_WRITE_ATTEMPTS: u32 = 5;

/// Per-submission write locks.
pub type WriteLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Result of a rating write.
#[derive(Debug, Clone, Serialize)]
pub struct RatingOutcome {
    #[serde(flatten)]
    pub summary: RatingSummary,
    /// The rater already had a rating, which was replaced
    pub replaced: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeleteOutcome {
    pub media_deleted: bool,
}

/// Apply the provided fields. Returns whether anything changed.
fn apply_patch(submission: &mut Submission, patch: &SubmissionPatch) -> bool {
    let mut changed = false;
    if let Some(title) = &patch.title {
        if submission.title != *title {
            submission.title = title.clone();
            changed = true;
        }
    }
    if let Some(description) = &patch.description {
        if submission.description != *description {
            submission.description = description.clone();
            changed = true;
        }
    }
    changed
}

#[derive(Clone)]
pub struct SubmissionService {
    repo: Repository,
    media: Arc<dyn MediaStore>,
    locks: WriteLocks,
    media_timeout: Duration,
}

impl SubmissionService {
    pub fn new(repo: Repository, media: Arc<dyn MediaStore>, media_timeout: Duration) -> Self {
        Self {
            repo,
            media,
            locks: Arc::new(DashMap::new()),
            media_timeout,
        }
    }

    async fn media_call<T>(
        &self,
        fut: impl Future<Output = Result<T, FileError>>,
    ) -> Result<T, AppError> {
        let limit = self.media_timeout;
        with_deadline(limit, async { fut.await.map_err(AppError::from) }, || {
            AppError::File(FileError::Io(format!(
                "Media call timed out after {:?}",
                limit
            )))
        })
        .await
    }

    async fn load(&self, submission_id: &str) -> Result<Submission, AppError> {
        self.repo
            .get_submission(submission_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", submission_id)))
    }

    // ─── Creation ────────────────────────────────────────────────

    pub async fn create(
        &self,
        challenge_id: &str,
        owner_id: &str,
        draft: NewSubmission,
        video: VideoUpload,
    ) -> Result<Submission, AppError> {
        self.create_at(challenge_id, owner_id, draft, video, Utc::now())
            .await
    }

    /// Create a submission against an open challenge.
    ///
    /// The video is stored before the document is written; if the write
    /// fails the stored video is removed again.
    pub async fn create_at(
        &self,
        challenge_id: &str,
        owner_id: &str,
        draft: NewSubmission,
        video: VideoUpload,
        now: DateTime<Utc>,
    ) -> Result<Submission, AppError> {
        let challenge = self
            .repo
            .get_challenge(challenge_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Challenge {} not found", challenge_id)))?;

        if challenge.is_expired_at(now) {
            return Err(AppError::BusinessLogic(
                "Challenge has expired and no longer accepts submissions".to_string(),
            ));
        }

        draft.validate()?;

        if video.bytes.is_empty() {
            return Err(FileError::Invalid("Video file is empty".to_string()).into());
        }

        let video_ref = self
            .media_call(
                self.media
                    .put(video.bytes, &video.file_name, &video.content_type),
            )
            .await?;

        let submission = Submission::new(draft, owner_id, challenge_id, &video_ref, now)?;

        if let Err(e) = self.repo.insert_submission(&submission).await {
            if let Err(cleanup) = self.media_call(self.media.delete(&video_ref)).await {
                tracing::warn!(
                    video_ref = %video_ref,
                    error = %cleanup,
                    "Failed to remove media after submission insert failed"
                );
            }
            return Err(e);
        }

        tracing::info!(
            submission_id = %submission.id,
            challenge_id,
            owner_id,
            "Submission created"
        );

        Ok(submission)
    }

    // ─── Ratings ─────────────────────────────────────────────────

    /// Read-modify-write `submission_id` under its lock with a version check.
    async fn mutate<T, F>(&self, submission_id: &str, mut apply: F) -> Result<(Submission, T), AppError>
    where
        F: FnMut(&mut Submission) -> Result<T, AppError> + Send,
        T: Send,
    {
        let lock = self
            .locks
            .entry(submission_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.mutate_locked(submission_id, &mut apply).await
        };

        drop(lock);
        self.locks
            .remove_if(submission_id, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    async fn mutate_locked<T, F>(
        &self,
        submission_id: &str,
        apply: &mut F,
    ) -> Result<(Submission, T), AppError>
    where
        F: FnMut(&mut Submission) -> Result<T, AppError> + Send,
        T: Send,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut submission = self.load(submission_id).await?;
            let expected = submission.version;

            let value = apply(&mut submission)?;
            submission.version = expected + 1;

            if self
                .repo
                .replace_submission_if_version(&submission, expected)
                .await?
            {
                return Ok((submission, value));
            }

            tracing::debug!(submission_id, attempt, "Submission version conflict, retrying");
        }

        Err(AppError::Database(format!(
            "Gave up writing submission {} after {} conflicting attempts",
            submission_id, MAX_WRITE_ATTEMPTS
        )))
    }

    pub async fn rate(
        &self,
        submission_id: &str,
        rater_id: &str,
        score: i64,
    ) -> Result<RatingOutcome, AppError> {
        self.rate_at(submission_id, rater_id, score, Utc::now()).await
    }

    /// Insert or replace `rater_id`'s score on a submission.
    pub async fn rate_at(
        &self,
        submission_id: &str,
        rater_id: &str,
        score: i64,
        now: DateTime<Utc>,
    ) -> Result<RatingOutcome, AppError> {
        let (submission, replaced) = self
            .mutate(submission_id, |submission| {
                let score = check_score(score)?;
                if submission.owner_id == rater_id {
                    return Err(AppError::BusinessLogic(
                        "You cannot rate your own submission".to_string(),
                    ));
                }
                Ok(submission.upsert_rating(rater_id, score, now))
            })
            .await?;

        tracing::info!(
            submission_id,
            rater_id,
            score,
            replaced,
            average = submission.average_rating,
            "Submission rated"
        );

        Ok(RatingOutcome {
            summary: RatingSummary::from(&submission),
            replaced,
        })
    }

    /// Rating summary; readable without authentication.
    pub async fn average(&self, submission_id: &str) -> Result<RatingSummary, AppError> {
        let submission = self.load(submission_id).await?;
        Ok(RatingSummary::from(&submission))
    }

    // ─── Comments ────────────────────────────────────────────────

    pub async fn comment(
        &self,
        submission_id: &str,
        author_id: &str,
        draft: NewComment,
    ) -> Result<Comment, AppError> {
        self.comment_at(submission_id, author_id, draft, Utc::now())
            .await
    }

    pub async fn comment_at(
        &self,
        submission_id: &str,
        author_id: &str,
        draft: NewComment,
        now: DateTime<Utc>,
    ) -> Result<Comment, AppError> {
        draft.validate()?;

        let comment = Comment {
            id: ids::new_id_at(now),
            author_id: author_id.to_string(),
            text: draft.text,
            created_at: now,
        };

        self.mutate(submission_id, |submission| {
            submission.comments.push(comment.clone());
            Ok(())
        })
        .await?;

        tracing::debug!(submission_id, author_id, comment_id = %comment.id, "Comment added");
        Ok(comment)
    }

    /// Comments oldest first.
    pub async fn comments(&self, submission_id: &str) -> Result<Vec<Comment>, AppError> {
        let mut comments = self.load(submission_id).await?.comments;
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    // ─── Reads ───────────────────────────────────────────────────

    pub async fn get_one(&self, submission_id: &str) -> Result<Submission, AppError> {
        self.load(submission_id).await
    }

    pub async fn list_all(&self, limit: u32, offset: u32) -> Result<Vec<Submission>, AppError> {
        self.repo.list_submissions(limit, offset).await
    }

    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Submission>, AppError> {
        self.repo.list_submissions_by_owner(owner_id).await
    }

    pub async fn list_by_challenge(&self, challenge_id: &str) -> Result<Vec<Submission>, AppError> {
        if self.repo.get_challenge(challenge_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Challenge {} not found",
                challenge_id
            )));
        }
        self.repo.list_submissions_by_challenge(challenge_id).await
    }

    /// Stored video of a submission.
    pub async fn video(&self, submission_id: &str) -> Result<MediaObject, AppError> {
        let submission = self.load(submission_id).await?;
        self.media_call(self.media.get(&submission.video_ref)).await
    }

    // ─── Owner operations ────────────────────────────────────────

    pub async fn update(
        &self,
        submission_id: &str,
        actor_id: &str,
        patch: SubmissionPatch,
    ) -> Result<UpdateOutcome, AppError> {
        if patch.is_empty() {
            return Err(AppError::validation("No fields to update"));
        }
        patch.validate()?;

        let submission = self.load(submission_id).await?;
        if submission.owner_id != actor_id {
            return Err(AppError::Authorization(
                "Only the owner can edit this submission".to_string(),
            ));
        }

        if !apply_patch(&mut submission.clone(), &patch) {
            return Ok(UpdateOutcome::NoChanges);
        }

        // Goes through the versioned path so a concurrent rating write
        // cannot overwrite the edit.
        let (_, changed) = self
            .mutate(submission_id, |submission| Ok(apply_patch(submission, &patch)))
            .await?;

        Ok(if changed {
            tracing::info!(submission_id, actor_id, "Submission updated");
            UpdateOutcome::Updated
        } else {
            UpdateOutcome::NoChanges
        })
    }

    /// Owner-initiated delete. Media removal is best-effort; the record is
    /// deleted either way.
    pub async fn delete(&self, submission_id: &str, actor_id: &str) -> Result<DeleteOutcome, AppError> {
        let submission = self.load(submission_id).await?;
        if submission.owner_id != actor_id {
            return Err(AppError::Authorization(
                "Only the owner can delete this submission".to_string(),
            ));
        }

        let media_deleted = self.purge(&submission).await?;
        tracing::info!(submission_id, actor_id, media_deleted, "Submission deleted");

        Ok(DeleteOutcome { media_deleted })
    }

    /// Delete a submission's media (best-effort) and then its document.
    ///
    /// Returns whether the media was removed. Only a failure to delete the
    /// document is an error.
    pub async fn purge(&self, submission: &Submission) -> Result<bool, AppError> {
        let media_deleted = match self.media_call(self.media.delete(&submission.video_ref)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    submission_id = %submission.id,
                    video_ref = %submission.video_ref,
                    error = %e,
                    "Failed to delete submission media"
                );
                false
            }
        };

        self.repo.delete_submission(&submission.id).await?;
        Ok(media_deleted)
    }

    /// Point a submission at a different challenge.
    pub async fn set_challenge(&self, submission_id: &str, challenge_id: &str) -> Result<(), AppError> {
        self.mutate(submission_id, |submission| {
            submission.challenge_id = challenge_id.to_string();
            Ok(())
        })
        .await?;
        Ok(())
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.len()
    }
}
