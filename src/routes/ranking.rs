// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::RankingPage;
use crate::services::MyRanking;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// The global leaderboard is public.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/ranking", get(global_ranking))
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/ranking/me", get(my_ranking))
}

#[derive(Debug, Deserialize)]
struct RankingQuery {
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    offset: u32,
}

fn default_limit() -> u32 {
    10
}

async fn global_ranking(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<RankingPage>> {
    Ok(Json(
        state.ranking.global_ranking(query.limit, query.offset).await?,
    ))
}

async fn my_ranking(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MyRanking>> {
    Ok(Json(state.ranking.my_position(&user.id).await?))
}
