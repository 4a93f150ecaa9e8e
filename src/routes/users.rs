// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ProfilePatch, User};
use crate::routes::challenges::ChallengeList;
use crate::routes::PageQuery;
use crate::services::UpdateOutcome;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use chrono::Utc;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).put(update_me))
        .route("/api/users/{id}/challenges", get(list_user_challenges))
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>> {
    let profile = state
        .repo
        .get_user(&user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.id)))?;

    Ok(Json(profile))
}

#[derive(Serialize)]
struct ProfileUpdate {
    #[serde(flatten)]
    outcome: UpdateOutcome,
    user: User,
}

/// Edit the caller's own profile.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<ProfileUpdate>> {
    let (outcome, user) = state.users.update_profile(&user.id, patch).await?;
    Ok(Json(ProfileUpdate { outcome, user }))
}

/// Challenges created by a user, newest first.
async fn list_user_challenges(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ChallengeList>> {
    let limit = page.clamped_limit();
    let challenges = state
        .challenges
        .list_by_creator_at(&user_id, limit, page.offset, Utc::now())
        .await?;

    Ok(Json(ChallengeList {
        challenges,
        limit,
        offset: page.offset,
    }))
}
