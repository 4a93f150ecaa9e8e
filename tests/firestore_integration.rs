// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST). The emulator is shared across tests, so every
//! test works on ids it generated itself.

use chrono::{Duration, Utc};
use retos_backend::config::Config;
use retos_backend::db::{
    collections, DocumentStore, Filter, FirestoreStore, FindOptions, Repository, SortDirection,
};
use retos_backend::error::AppError;
use retos_backend::media::MemoryMediaStore;
use retos_backend::models::{Role, User};
use retos_backend::AppState;
use serde_json::json;
use std::sync::Arc;

mod common;
use common::{challenge_draft, submission_draft, test_store, video};

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::now_v7())
}

fn doc(value: serde_json::Value) -> retos_backend::db::Document {
    value.as_object().cloned().unwrap()
}

async fn emulator_state() -> Arc<AppState> {
    Arc::new(AppState::new(
        Config::test_default(),
        Arc::new(test_store().await),
        Arc::new(MemoryMediaStore::new()),
    ))
}

async fn seed(state: &AppState, name: &str) -> User {
    let id = unique(name);
    let user = User {
        id: id.clone(),
        email: format!("{}@example.com", id),
        name: name.to_string(),
        surname: "Tester".to_string(),
        role: Role::User,
        bio: None,
        photo: None,
        city: None,
        phone: None,
    };
    state.repo.insert_user(&user).await.unwrap();
    user
}

#[tokio::test]
async fn test_offline_store_is_database_error() {
    let repo = Repository::new(
        Arc::new(FirestoreStore::new_mock()),
        std::time::Duration::from_secs(1),
    );

    assert!(matches!(repo.ping().await, Err(AppError::Database(_))));
    assert!(matches!(
        repo.get_challenge("anything").await,
        Err(AppError::Database(_))
    ));
}

#[tokio::test]
async fn test_document_round_trip() {
    require_emulator!();

    let store = test_store().await;
    let id = unique("doc");
    let marker = unique("marker");

    store
        .insert(
            collections::CHALLENGES,
            doc(json!({"id": id, "creator_id": marker, "title": "First", "version": 0})),
        )
        .await
        .unwrap();

    let found = store
        .find_one(collections::CHALLENGES, &Filter::by_id(&id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found["title"], "First");

    let modified = store
        .update_one(
            collections::CHALLENGES,
            &Filter::by_id(&id),
            doc(json!({"title": "Second"})),
        )
        .await
        .unwrap();
    assert_eq!(modified, 1);

    let listed = store
        .find(
            collections::CHALLENGES,
            &Filter::new().eq("creator_id", marker.as_str()),
            &FindOptions::sorted("id", SortDirection::Descending),
        )
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["title"], "Second");

    assert_eq!(
        store
            .delete_one(collections::CHALLENGES, &Filter::by_id(&id))
            .await
            .unwrap(),
        1
    );
    assert!(store
        .find_one(collections::CHALLENGES, &Filter::by_id(&id))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_replace_if_version() {
    require_emulator!();

    let store = test_store().await;
    let id = unique("versioned");
    store
        .insert(
            collections::SUBMISSIONS,
            doc(json!({"id": id, "version": 0, "average_rating": 0.0})),
        )
        .await
        .unwrap();

    let next = doc(json!({"id": id, "version": 1, "average_rating": 4.0}));
    assert!(store
        .replace_if_version(collections::SUBMISSIONS, &id, 0, next.clone())
        .await
        .unwrap());
    // Stale writer loses
    assert!(!store
        .replace_if_version(collections::SUBMISSIONS, &id, 0, next)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_concurrent_writers_with_same_version() {
    require_emulator!();

    let store = test_store().await;
    let id = unique("contended");
    store
        .insert(
            collections::SUBMISSIONS,
            doc(json!({"id": id, "version": 3, "ratings": []})),
        )
        .await
        .unwrap();

    let first = doc(json!({"id": id, "version": 4, "ratings": [{"rater_id": "c", "score": 4}]}));
    let second = doc(json!({"id": id, "version": 4, "ratings": [{"rater_id": "d", "score": 5}]}));
    let (a, b) = tokio::join!(
        store.replace_if_version(collections::SUBMISSIONS, &id, 3, first),
        store.replace_if_version(collections::SUBMISSIONS, &id, 3, second),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(a ^ b, "exactly one writer should win, got {} and {}", a, b);

    let stored = store
        .find_one(collections::SUBMISSIONS, &Filter::by_id(&id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["version"], 4);
    let winner = if a { "c" } else { "d" };
    assert_eq!(stored["ratings"][0]["rater_id"], winner);
}

#[tokio::test]
async fn test_count_matches_filter() {
    require_emulator!();

    let store = test_store().await;
    let marker = unique("owner");
    for _ in 0..3 {
        store
            .insert(
                collections::SUBMISSIONS,
                doc(json!({"id": unique("counted"), "owner_id": marker, "version": 0})),
            )
            .await
            .unwrap();
    }

    let filter = Filter::new().eq("owner_id", marker.as_str());
    assert_eq!(store.count(collections::SUBMISSIONS, &filter).await.unwrap(), 3);
    assert_eq!(
        store
            .count(
                collections::SUBMISSIONS,
                &Filter::new().eq("owner_id", "nobody-has-this-owner")
            )
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_rating_flow_against_emulator() {
    require_emulator!();

    let state = emulator_state().await;
    let a = seed(&state, "ana").await;
    let b = seed(&state, "bea").await;

    let challenge = state
        .challenges
        .create(challenge_draft("Plank Challenge"), &a.id)
        .await
        .unwrap();
    let submission = state
        .submissions
        .create(&challenge.id, &b.id, submission_draft("My Plank"), video())
        .await
        .unwrap();

    state.submissions.rate(&submission.id, "c", 4).await.unwrap();
    state.submissions.rate(&submission.id, "d", 5).await.unwrap();
    let outcome = state.submissions.rate(&submission.id, "c", 2).await.unwrap();
    assert_eq!(outcome.summary.average, 3.5);
    assert_eq!(outcome.summary.count, 2);

    let score = state.ranking.compute_user_score(&b.id).await.unwrap();
    assert_eq!(score.score_total, 3.5);
}

#[tokio::test]
async fn test_expired_delete_against_emulator() {
    require_emulator!();

    let state = emulator_state().await;
    let a = seed(&state, "ana").await;
    let past = Utc::now() - Duration::days(40);

    let challenge = state
        .challenges
        .create_at(challenge_draft("Old challenge"), &a.id, past)
        .await
        .unwrap();
    for title in ["First try", "Second try"] {
        state
            .submissions
            .create_at(&challenge.id, &a.id, submission_draft(title), video(), past)
            .await
            .unwrap();
    }

    let outcome = state.challenges.delete(&challenge.id, &a.id).await.unwrap();
    assert_eq!(outcome.submissions_deleted, 2);
    assert!(state.repo.get_challenge(&challenge.id).await.unwrap().is_none());
}
