// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Self-service profile edits.

use crate::db::Repository;
use crate::error::AppError;
use crate::models::{ProfilePatch, User};
use crate::services::UpdateOutcome;
use validator::Validate;

#[derive(Clone)]
pub struct UserService {
    repo: Repository,
}

impl UserService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Apply `patch` to the actor's own profile and return the stored result.
    ///
    /// A new email must not belong to another user.
    pub async fn update_profile(
        &self,
        actor_id: &str,
        patch: ProfilePatch,
    ) -> Result<(UpdateOutcome, User), AppError> {
        patch.validate()?;

        let mut user = self
            .repo
            .get_user(actor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", actor_id)))?;

        if let Some(email) = patch.email.as_deref() {
            if email != user.email && self.repo.email_taken(email, actor_id).await? {
                return Err(AppError::BusinessLogic(format!(
                    "Email {} is already registered",
                    email
                )));
            }
        }

        if !user.apply_profile(&patch) {
            return Ok((UpdateOutcome::NoChanges, user));
        }

        self.repo.update_user(&user).await?;
        tracing::info!(user_id = actor_id, "Profile updated");

        Ok((UpdateOutcome::Updated, user))
    }
}
