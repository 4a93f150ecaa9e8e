// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rating engine tests: averages, upsert-by-rater and concurrent raters.

use retos_backend::error::AppError;
use retos_backend::models::{Role, Submission};
use std::sync::Arc;

mod common;

use common::{challenge_draft, create_test_app, seed_user, submission_draft, video, TestApp};

/// A challenge by Ana with one submission by Bea.
async fn setup() -> (TestApp, Submission) {
    let app = create_test_app();
    let a = seed_user(&app.state, "Ana", Role::User).await;
    let b = seed_user(&app.state, "Bea", Role::User).await;

    let challenge = app
        .state
        .challenges
        .create(challenge_draft("Plank Challenge"), &a.id)
        .await
        .unwrap();
    let submission = app
        .state
        .submissions
        .create(&challenge.id, &b.id, submission_draft("My Plank"), video())
        .await
        .unwrap();

    (app, submission)
}

#[tokio::test]
async fn test_plank_scenario() {
    let (app, submission) = setup().await;
    let c = seed_user(&app.state, "Cris", Role::User).await;
    let d = seed_user(&app.state, "Dani", Role::User).await;
    let engine = &app.state.submissions;

    assert_eq!(submission.average_rating, 0.0);
    assert!(submission.ratings.is_empty());

    let first = engine.rate(&submission.id, &c.id, 4).await.unwrap();
    assert!(!first.replaced);

    let second = engine.rate(&submission.id, &d.id, 5).await.unwrap();
    assert_eq!(second.summary.average, 4.5);
    assert_eq!(second.summary.count, 2);

    let rerate = engine.rate(&submission.id, &c.id, 2).await.unwrap();
    assert!(rerate.replaced);
    assert_eq!(rerate.summary.average, 3.5);
    assert_eq!(rerate.summary.count, 2);

    // C's entry keeps its place in the list
    let raters: Vec<&str> = rerate
        .summary
        .ratings
        .iter()
        .map(|r| r.rater_id.as_str())
        .collect();
    assert_eq!(raters, vec![c.id.as_str(), d.id.as_str()]);

    let stored = app.state.repo.get_submission(&submission.id).await.unwrap().unwrap();
    assert_eq!(stored.average_rating, 3.5);
    assert_eq!(stored.ratings.len(), 2);
}

#[tokio::test]
async fn test_score_bounds() {
    let (app, submission) = setup().await;
    let engine = &app.state.submissions;

    for score in [0, 6, -1, 100] {
        let result = engine.rate(&submission.id, "user-judge", score).await;
        assert!(
            matches!(result, Err(AppError::BusinessLogic(_))),
            "score {score} should be rejected"
        );
    }

    for score in 1..=5 {
        engine.rate(&submission.id, "user-judge", score).await.unwrap();
    }

    let summary = engine.average(&submission.id).await.unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.average, 5.0);
}

#[tokio::test]
async fn test_average_is_rounded_mean() {
    let (app, submission) = setup().await;
    let engine = &app.state.submissions;

    for (rater, score) in [("r1", 5), ("r2", 4), ("r3", 4)] {
        engine.rate(&submission.id, rater, score).await.unwrap();
    }

    // 13 / 3 = 4.333...
    let summary = engine.average(&submission.id).await.unwrap();
    assert_eq!(summary.average, 4.33);
}

#[tokio::test]
async fn test_unknown_submission() {
    let (app, _) = setup().await;

    let rate = app.state.submissions.rate("missing", "user-judge", 3).await;
    assert!(matches!(rate, Err(AppError::NotFound(_))));

    let average = app.state.submissions.average("missing").await;
    assert!(matches!(average, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_concurrent_raters_are_all_kept() {
    let (app, submission) = setup().await;
    let app = Arc::new(app);

    let handles: Vec<_> = (0..25)
        .map(|i| {
            let app = app.clone();
            let id = submission.id.clone();
            tokio::spawn(async move {
                let score = (i % 5) + 1;
                app.state
                    .submissions
                    .rate(&id, &format!("rater-{i}"), score)
                    .await
                    .unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    let stored = app.state.repo.get_submission(&submission.id).await.unwrap().unwrap();
    assert_eq!(stored.ratings.len(), 25);
    // Five of each score from 1 to 5
    assert_eq!(stored.average_rating, 3.0);
    assert_eq!(stored.version, 25);
}

#[tokio::test]
async fn test_comments_do_not_disturb_ratings() {
    let (app, submission) = setup().await;
    let engine = &app.state.submissions;

    engine.rate(&submission.id, "user-judge", 4).await.unwrap();
    engine
        .comment(
            &submission.id,
            "user-judge",
            retos_backend::models::NewComment {
                text: "Solid form".to_string(),
            },
        )
        .await
        .unwrap();

    let stored = engine.get_one(&submission.id).await.unwrap();
    assert_eq!(stored.ratings.len(), 1);
    assert_eq!(stored.comments.len(), 1);
    assert_eq!(stored.average_rating, 4.0);
}
