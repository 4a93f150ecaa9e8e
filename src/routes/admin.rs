// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin-only maintenance routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::services::SweepReport;
use crate::AppState;
use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Extension, Json,
    Router,
};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/admin/cleanup", post(run_cleanup))
}

#[derive(Serialize)]
struct CleanupResponse {
    /// False when a sweep was already running
    ran: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<SweepReport>,
}

/// Run the expiry sweep now. Answers 409 if one is already in progress.
async fn run_cleanup(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    user.require_admin()?;
    tracing::info!(user_id = %user.id, "Manual cleanup sweep requested");

    let response = match state.cleanup.run_once().await? {
        Some(report) => (
            StatusCode::OK,
            Json(CleanupResponse {
                ran: true,
                report: Some(report),
            }),
        ),
        None => (
            StatusCode::CONFLICT,
            Json(CleanupResponse {
                ran: false,
                report: None,
            }),
        ),
    };
    Ok(response)
}
