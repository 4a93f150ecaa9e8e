// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Challenge routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{ChallengePatch, ChallengeView, NewChallenge, NewSubmission, SubmissionView};
use crate::routes::submissions::UploadForm;
use crate::routes::MAX_PAGE_SIZE;
use crate::services::{CascadeOutcome, UpdateOutcome};
use crate::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/challenges", post(create_challenge).get(list_challenges))
        .route("/api/challenges/with-submission", post(create_with_submission))
        .route(
            "/api/challenges/{id}",
            get(get_challenge)
                .put(update_challenge)
                .delete(delete_challenge),
        )
        .route(
            "/api/challenges/{id}/submissions/{submission_id}",
            post(attach_submission),
        )
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    /// Only challenges that have not expired yet
    #[serde(default)]
    open: bool,
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    offset: u32,
}

fn default_limit() -> u32 {
    20
}

/// A page of challenges.
#[derive(Serialize)]
pub struct ChallengeList {
    pub challenges: Vec<ChallengeView>,
    pub limit: u32,
    pub offset: u32,
}

async fn create_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<NewChallenge>,
) -> Result<impl IntoResponse> {
    let now = Utc::now();
    let challenge = state.challenges.create_at(draft, &user.id, now).await?;
    Ok((StatusCode::CREATED, Json(ChallengeView::at(challenge, now))))
}

async fn list_challenges(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ChallengeList>> {
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    let challenges = state
        .challenges
        .list_at(query.open, limit, query.offset, Utc::now())
        .await?;

    Ok(Json(ChallengeList {
        challenges,
        limit,
        offset: query.offset,
    }))
}

async fn get_challenge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ChallengeView>> {
    Ok(Json(state.challenges.get_at(&id, Utc::now()).await?))
}

/// 409 when the challenge already has too many submissions to edit.
async fn update_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(patch): Json<ChallengePatch>,
) -> Result<impl IntoResponse> {
    let outcome = state.challenges.update(&id, &user.id, patch).await?;
    let status = match outcome {
        UpdateOutcome::Rejected { .. } => StatusCode::CONFLICT,
        UpdateOutcome::Updated | UpdateOutcome::NoChanges => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}

async fn delete_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<CascadeOutcome>> {
    Ok(Json(state.challenges.delete(&id, &user.id).await?))
}

async fn attach_submission(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, submission_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    state
        .challenges
        .attach_at(&id, &submission_id, &user.id, Utc::now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct CreatedWithSubmission {
    challenge: ChallengeView,
    submission: SubmissionView,
}

/// Multipart: `challenge_title`, `challenge_description`, `title`,
/// `description` and `video`.
async fn create_with_submission(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = UploadForm::read(multipart).await?;
    let challenge_draft = NewChallenge {
        title: form.take("challenge_title"),
        description: form.take("challenge_description"),
    };
    let submission_draft = NewSubmission {
        title: form.take("title"),
        description: form.take("description"),
    };
    let video = form.take_video()?;

    let now = Utc::now();
    let (challenge, submission) = state
        .challenges
        .create_with_submission_at(challenge_draft, submission_draft, video, &user.id, now)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedWithSubmission {
            challenge: ChallengeView::at(challenge, now),
            submission: submission.into(),
        }),
    ))
}
