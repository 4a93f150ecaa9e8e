// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed access to the document store.
//!
//! Converts schemaless documents to the model structs at the boundary and
//! bounds every store call with a timeout.

use crate::db::{collections, Document, DocumentStore, Filter, FindOptions, SortDirection};
use crate::error::AppError;
use crate::models::{Challenge, Submission, User};
use crate::time_utils::{format_utc_rfc3339, with_deadline};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

/// Shared handle to the configured store. Cheap to clone.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

fn to_document<T: Serialize>(value: &T) -> Result<Document, AppError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::Database(
            "Record did not serialize to a document".to_string(),
        )),
        Err(e) => Err(AppError::Database(format!("Failed to encode document: {}", e))),
    }
}

fn from_document<T: DeserializeOwned>(collection: &str, doc: Document) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(doc)).map_err(|e| {
        AppError::Database(format!("Malformed document in {}: {}", collection, e))
    })
}

fn from_documents<T: DeserializeOwned>(
    collection: &str,
    docs: Vec<Document>,
) -> Result<Vec<T>, AppError> {
    docs.into_iter()
        .map(|doc| from_document(collection, doc))
        .collect()
}

/// Build a patch document from optional title/description fields.
pub fn text_patch(title: Option<&str>, description: Option<&str>) -> Document {
    let mut patch = Document::new();
    if let Some(title) = title {
        patch.insert("title".to_string(), Value::String(title.to_string()));
    }
    if let Some(description) = description {
        patch.insert(
            "description".to_string(),
            Value::String(description.to_string()),
        );
    }
    patch
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T, AppError>>) -> Result<T, AppError> {
        let limit = self.timeout;
        with_deadline(limit, fut, || {
            AppError::Database(format!("Store call timed out after {:?}", limit))
        })
        .await
    }

    /// Connectivity check; fails fast when the store is unreachable.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.bounded(self.store.ping()).await
    }

    // ─── Challenges ──────────────────────────────────────────────

    pub async fn insert_challenge(&self, challenge: &Challenge) -> Result<(), AppError> {
        let doc = to_document(challenge)?;
        self.bounded(self.store.insert(collections::CHALLENGES, doc))
            .await?;
        Ok(())
    }

    pub async fn get_challenge(&self, id: &str) -> Result<Option<Challenge>, AppError> {
        self.bounded(
            self.store
                .find_one(collections::CHALLENGES, &Filter::by_id(id)),
        )
        .await?
        .map(|doc| from_document(collections::CHALLENGES, doc))
        .transpose()
    }

    /// Newest first. With `only_open`, restricted to `expires_at > now`.
    pub async fn list_challenges(
        &self,
        only_open: bool,
        now: DateTime<Utc>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Challenge>, AppError> {
        let filter = if only_open {
            Filter::new().gt("expires_at", format_utc_rfc3339(now))
        } else {
            Filter::new()
        };
        let options = FindOptions::sorted("id", SortDirection::Descending).page(offset, limit);

        let docs = self
            .bounded(self.store.find(collections::CHALLENGES, &filter, &options))
            .await?;
        from_documents(collections::CHALLENGES, docs)
    }

    pub async fn list_challenges_by_creator(
        &self,
        creator_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Challenge>, AppError> {
        let filter = Filter::new().eq("creator_id", creator_id);
        let options = FindOptions::sorted("id", SortDirection::Descending).page(offset, limit);

        let docs = self
            .bounded(self.store.find(collections::CHALLENGES, &filter, &options))
            .await?;
        from_documents(collections::CHALLENGES, docs)
    }

    /// Challenges by `creator_id` whose id is at or above `floor_id`, i.e.
    /// created at or after the instant the floor was derived from.
    pub async fn count_challenges_since(
        &self,
        creator_id: &str,
        floor_id: &str,
    ) -> Result<u64, AppError> {
        let filter = Filter::new()
            .eq("creator_id", creator_id)
            .gte("id", floor_id);
        self.bounded(self.store.count(collections::CHALLENGES, &filter))
            .await
    }

    pub async fn update_challenge(&self, id: &str, patch: Document) -> Result<u64, AppError> {
        self.bounded(
            self.store
                .update_one(collections::CHALLENGES, &Filter::by_id(id), patch),
        )
        .await
    }

    pub async fn delete_challenge(&self, id: &str) -> Result<u64, AppError> {
        self.bounded(
            self.store
                .delete_one(collections::CHALLENGES, &Filter::by_id(id)),
        )
        .await
    }

    /// Active challenges with `expires_at < now`, oldest first.
    pub async fn find_expired_active_challenges(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Challenge>, AppError> {
        let filter = Filter::new()
            .eq("active", true)
            .lt("expires_at", format_utc_rfc3339(now));
        let options = FindOptions::sorted("expires_at", SortDirection::Ascending);

        let docs = self
            .bounded(self.store.find(collections::CHALLENGES, &filter, &options))
            .await?;
        from_documents(collections::CHALLENGES, docs)
    }

    pub async fn deactivate_challenge(&self, id: &str) -> Result<u64, AppError> {
        let mut patch = Document::new();
        patch.insert("active".to_string(), Value::Bool(false));
        self.update_challenge(id, patch).await
    }

    // ─── Submissions ─────────────────────────────────────────────

    pub async fn insert_submission(&self, submission: &Submission) -> Result<(), AppError> {
        let doc = to_document(submission)?;
        self.bounded(self.store.insert(collections::SUBMISSIONS, doc))
            .await?;
        Ok(())
    }

    pub async fn get_submission(&self, id: &str) -> Result<Option<Submission>, AppError> {
        self.bounded(
            self.store
                .find_one(collections::SUBMISSIONS, &Filter::by_id(id)),
        )
        .await?
        .map(|doc| from_document(collections::SUBMISSIONS, doc))
        .transpose()
    }

    async fn find_submissions(
        &self,
        filter: Filter,
        options: FindOptions,
    ) -> Result<Vec<Submission>, AppError> {
        let docs = self
            .bounded(self.store.find(collections::SUBMISSIONS, &filter, &options))
            .await?;
        from_documents(collections::SUBMISSIONS, docs)
    }

    /// Every submission, newest first.
    pub async fn list_submissions(&self, limit: u32, offset: u32) -> Result<Vec<Submission>, AppError> {
        self.find_submissions(
            Filter::new(),
            FindOptions::sorted("id", SortDirection::Descending).page(offset, limit),
        )
        .await
    }

    pub async fn list_submissions_by_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<Submission>, AppError> {
        self.find_submissions(
            Filter::new().eq("owner_id", owner_id),
            FindOptions::sorted("id", SortDirection::Descending),
        )
        .await
    }

    pub async fn list_submissions_by_challenge(
        &self,
        challenge_id: &str,
    ) -> Result<Vec<Submission>, AppError> {
        self.find_submissions(
            Filter::new().eq("challenge_id", challenge_id),
            FindOptions::sorted("id", SortDirection::Descending),
        )
        .await
    }

    pub async fn count_submissions_for_challenge(
        &self,
        challenge_id: &str,
    ) -> Result<u64, AppError> {
        let filter = Filter::new().eq("challenge_id", challenge_id);
        self.bounded(self.store.count(collections::SUBMISSIONS, &filter))
            .await
    }

    /// Write `submission` back only if the stored version is still
    /// `expected_version`.
    pub async fn replace_submission_if_version(
        &self,
        submission: &Submission,
        expected_version: u64,
    ) -> Result<bool, AppError> {
        let doc = to_document(submission)?;
        self.bounded(self.store.replace_if_version(
            collections::SUBMISSIONS,
            &submission.id,
            expected_version,
            doc,
        ))
        .await
    }

    pub async fn delete_submission(&self, id: &str) -> Result<u64, AppError> {
        self.bounded(
            self.store
                .delete_one(collections::SUBMISSIONS, &Filter::by_id(id)),
        )
        .await
    }

    // ─── Users ───────────────────────────────────────────────────

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.bounded(self.store.find_one(collections::USERS, &Filter::by_id(id)))
            .await?
            .map(|doc| from_document(collections::USERS, doc))
            .transpose()
    }

    /// All users in id order.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let docs = self
            .bounded(self.store.find(
                collections::USERS,
                &Filter::new(),
                &FindOptions::sorted("id", SortDirection::Ascending),
            ))
            .await?;
        from_documents(collections::USERS, docs)
    }

    /// Whether any user other than `except_id` has `email`.
    pub async fn email_taken(&self, email: &str, except_id: &str) -> Result<bool, AppError> {
        let docs = self
            .bounded(self.store.find(
                collections::USERS,
                &Filter::new().eq("email", email),
                &FindOptions::default(),
            ))
            .await?;
        Ok(docs
            .iter()
            .any(|doc| doc.get("id").and_then(Value::as_str) != Some(except_id)))
    }

    /// Overwrite the profile fields of a stored user. Fields the model does
    /// not know about, such as the password hash, are left alone.
    pub async fn update_user(&self, user: &User) -> Result<u64, AppError> {
        user.validate()?;
        let patch = to_document(user)?;
        self.bounded(
            self.store
                .update_one(collections::USERS, &Filter::by_id(&user.id), patch),
        )
        .await
    }

    /// Store a user profile. Emails are unique across users.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        user.validate()?;

        let filter = Filter::new().eq("email", user.email.as_str());
        if self
            .bounded(self.store.count(collections::USERS, &filter))
            .await?
            > 0
        {
            return Err(AppError::BusinessLogic(format!(
                "Email {} is already registered",
                user.email
            )));
        }

        let doc = to_document(user)?;
        self.bounded(self.store.insert(collections::USERS, doc))
            .await?;
        Ok(())
    }
}
