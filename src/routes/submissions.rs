// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Submission, rating and comment routes.

use crate::error::{AppError, FileError, Result};
use crate::media::VideoUpload;
use crate::middleware::auth::AuthUser;
use crate::models::submission::RatingSummary;
use crate::models::{CommentView, NewComment, NewSubmission, SubmissionPatch, SubmissionView};
use crate::routes::PageQuery;
use crate::services::{DeleteOutcome, RatingOutcome, UpdateOutcome};
use crate::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Routes readable without a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/submissions/{id}/ratings", get(get_ratings))
}

/// Routes that require authentication.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/challenges/{id}/submissions", post(create_submission).get(list_for_challenge))
        .route("/api/submissions", get(list_submissions))
        .route("/api/submissions/mine", get(list_mine))
        .route(
            "/api/submissions/{id}",
            get(get_submission).put(update_submission).delete(delete_submission),
        )
        .route("/api/submissions/{id}/video", get(get_video))
        .route("/api/submissions/{id}/ratings", post(rate_submission))
        .route("/api/submissions/{id}/comments", post(add_comment).get(list_comments))
}

// ─── Multipart ───────────────────────────────────────────────

/// Text fields and the optional `video` part of a multipart upload.
#[derive(Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub video: Option<VideoUpload>,
}

impl UploadForm {
    /// Read every part of `multipart`. The part named `video` is kept as
    /// bytes; all other parts are read as text.
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == "video" {
                let file_name = field.file_name().unwrap_or("video").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| FileError::Invalid(format!("Failed to read video: {e}")))?;
                form.video = Some(VideoUpload {
                    bytes,
                    file_name,
                    content_type,
                });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Failed to read field {name}: {e}")))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Remove and return a text field. Missing fields read as empty so the
    /// length validation reports them.
    pub fn take(&mut self, name: &str) -> String {
        self.fields.remove(name).unwrap_or_default()
    }

    pub fn take_video(&mut self) -> Result<VideoUpload> {
        self.video
            .take()
            .ok_or_else(|| FileError::Invalid("Missing 'video' field".to_string()).into())
    }
}

// ─── Submissions ─────────────────────────────────────────────

async fn create_submission(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(challenge_id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = UploadForm::read(multipart).await?;
    let draft = NewSubmission {
        title: form.take("title"),
        description: form.take("description"),
    };
    let video = form.take_video()?;

    let submission = state
        .submissions
        .create(&challenge_id, &user.id, draft, video)
        .await?;

    Ok((StatusCode::CREATED, Json(SubmissionView::from(submission))))
}

async fn list_submissions(
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<SubmissionView>>> {
    let submissions = state
        .submissions
        .list_all(page.clamped_limit(), page.offset)
        .await?;
    Ok(Json(submissions.into_iter().map(SubmissionView::from).collect()))
}

async fn list_mine(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<SubmissionView>>> {
    let submissions = state.submissions.list_by_owner(&user.id).await?;
    Ok(Json(submissions.into_iter().map(SubmissionView::from).collect()))
}

async fn list_for_challenge(
    State(state): State<Arc<AppState>>,
    Path(challenge_id): Path<String>,
) -> Result<Json<Vec<SubmissionView>>> {
    let submissions = state.submissions.list_by_challenge(&challenge_id).await?;
    Ok(Json(submissions.into_iter().map(SubmissionView::from).collect()))
}

async fn get_submission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SubmissionView>> {
    Ok(Json(state.submissions.get_one(&id).await?.into()))
}

async fn update_submission(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(patch): Json<SubmissionPatch>,
) -> Result<Json<UpdateOutcome>> {
    Ok(Json(state.submissions.update(&id, &user.id, patch).await?))
}

async fn delete_submission(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<DeleteOutcome>> {
    Ok(Json(state.submissions.delete(&id, &user.id).await?))
}

async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let media = state.submissions.video(&id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, media.content_type),
            (header::CACHE_CONTROL, "private, max-age=300".to_string()),
        ],
        media.bytes,
    ))
}

// ─── Ratings ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RateRequest {
    score: i64,
}

async fn rate_submission(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<RateRequest>,
) -> Result<Json<RatingOutcome>> {
    Ok(Json(state.submissions.rate(&id, &user.id, body.score).await?))
}

async fn get_ratings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RatingSummary>> {
    Ok(Json(state.submissions.average(&id).await?))
}

// ─── Comments ────────────────────────────────────────────────

#[derive(Serialize)]
struct CommentList {
    comments: Vec<CommentView>,
}

async fn add_comment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(draft): Json<NewComment>,
) -> Result<impl IntoResponse> {
    let comment = state.submissions.comment(&id, &user.id, draft).await?;
    Ok((StatusCode::CREATED, Json(CommentView::from(&comment))))
}

async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CommentList>> {
    let comments = state.submissions.comments(&id).await?;
    Ok(Json(CommentList {
        comments: comments.iter().map(CommentView::from).collect(),
    }))
}
