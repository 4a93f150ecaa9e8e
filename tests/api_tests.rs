// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP boundary tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Errors come back as `{error, message, details?}` with the right status
//! 3. Multipart uploads, public ratings and the admin sweep work end to end

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use retos_backend::models::Role;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

mod common;

use common::{
    authed_request, body_json, create_test_app, create_test_app_with_store, create_test_jwt,
    json_request, multipart_body, seed_user, FaultyStore,
};

#[tokio::test]
async fn test_health() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("X-Content-Type-Options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(Request::builder().uri("/api/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "authentication_error");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_invalid_token() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(authed_request("GET", "/api/me", "not.a.jwt"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "token_error");
}

#[tokio::test]
async fn test_token_for_unknown_user() {
    let app = create_test_app();
    let token = create_test_jwt("user-ghost", &app.state);

    let response = app
        .router
        .oneshot(authed_request("GET", "/api/me", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_cookie_accepted() {
    let app = create_test_app();
    let a = seed_user(&app.state, "Ana", Role::User).await;
    let token = create_test_jwt(&a.id, &app.state);

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, format!("retos_token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "ana@example.com");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_create_challenge_and_validation_error() {
    let app = create_test_app();
    let a = seed_user(&app.state, "Ana", Role::User).await;
    let token = create_test_jwt(&a.id, &app.state);

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/challenges",
            &token,
            json!({"title": "Plank Challenge", "description": "Hold it for two minutes"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["days_remaining"], 30);
    assert_eq!(body["is_expired"], false);
    assert_eq!(body["creator_id"], a.id);

    let response = app
        .router
        .oneshot(json_request(
            "POST",
            "/api/challenges",
            &token,
            json!({"title": "Hi", "description": "short"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(body["details"]["title"].is_array());
    assert!(body["details"]["description"].is_array());
}

#[tokio::test]
async fn test_submission_upload_and_public_ratings() {
    let app = create_test_app();
    let a = seed_user(&app.state, "Ana", Role::User).await;
    let b = seed_user(&app.state, "Bea", Role::User).await;
    let c = seed_user(&app.state, "Cris", Role::User).await;
    let challenge = app
        .state
        .challenges
        .create(common::challenge_draft("Plank Challenge"), &a.id)
        .await
        .unwrap();

    let (content_type, body) = multipart_body(
        &[("title", "My Plank"), ("description", "Two minutes flat")],
        Some(b"fake video bytes"),
    );
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/challenges/{}/submissions", challenge.id))
                .header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", create_test_jwt(&b.id, &app.state)),
                )
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let submission_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["average_rating"], 0.0);
    assert_eq!(app.media.len(), 1);

    // Video is served back with its content type
    let response = app
        .router
        .clone()
        .oneshot(authed_request(
            "GET",
            &format!("/api/submissions/{}/video", submission_id),
            &create_test_jwt(&c.id, &app.state),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "video/mp4");
    let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&bytes[..], b"fake video bytes");

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/submissions/{}/ratings", submission_id),
            &create_test_jwt(&c.id, &app.state),
            json!({"score": 4}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Rating without a session is refused, reading them is not
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/submissions/{}/ratings", submission_id))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"score": 5}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri(format!("/api/submissions/{}/ratings", submission_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["average"], 4.0);
    assert_eq!(summary["count"], 1);
}

#[tokio::test]
async fn test_submission_without_video_rejected() {
    let app = create_test_app();
    let a = seed_user(&app.state, "Ana", Role::User).await;
    let challenge = app
        .state
        .challenges
        .create(common::challenge_draft("Plank Challenge"), &a.id)
        .await
        .unwrap();

    let (content_type, body) =
        multipart_body(&[("title", "My Plank"), ("description", "Two minutes flat")], None);
    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/challenges/{}/submissions", challenge.id))
                .header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", create_test_jwt(&a.id, &app.state)),
                )
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "file_error");
    assert!(app.media.is_empty());
}

#[tokio::test]
async fn test_ranking_is_public() {
    let app = create_test_app();
    seed_user(&app.state, "Ana", Role::User).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/ranking?limit=5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["ranking"][0]["position"], 1);
    assert_eq!(page["ranking"][0]["score_total"], 0.0);

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/ranking?limit=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_edit_rejection_is_conflict() {
    let app = create_test_app();
    let a = seed_user(&app.state, "Ana", Role::User).await;
    let challenge = app
        .state
        .challenges
        .create(common::challenge_draft("Plank Challenge"), &a.id)
        .await
        .unwrap();
    for name in ["Bea", "Cris"] {
        let user = seed_user(&app.state, name, Role::User).await;
        app.state
            .submissions
            .create(
                &challenge.id,
                &user.id,
                common::submission_draft("Attempt"),
                common::video(),
            )
            .await
            .unwrap();
    }

    let response = app
        .router
        .oneshot(json_request(
            "PUT",
            &format!("/api/challenges/{}", challenge.id),
            &create_test_jwt(&a.id, &app.state),
            json!({"title": "New rules now"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["submission_count"], 2);
}

#[tokio::test]
async fn test_admin_cleanup() {
    let app = create_test_app();
    let user = seed_user(&app.state, "Ana", Role::User).await;
    let admin = seed_user(&app.state, "Root", Role::Admin).await;

    let response = app
        .router
        .clone()
        .oneshot(authed_request(
            "POST",
            "/api/admin/cleanup",
            &create_test_jwt(&user.id, &app.state),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "authorization_error");

    let response = app
        .router
        .oneshot(authed_request(
            "POST",
            "/api/admin/cleanup",
            &create_test_jwt(&admin.id, &app.state),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ran"], true);
    assert_eq!(body["report"]["challenges_deactivated"], 0);
}

#[tokio::test]
async fn test_incomplete_delete_reports_progress() {
    let store = Arc::new(FaultyStore::new());
    let app = create_test_app_with_store(store.clone());
    let a = seed_user(&app.state, "Ana", Role::User).await;
    let past = chrono::Utc::now() - chrono::Duration::days(40);

    let challenge = app
        .state
        .challenges
        .create_at(common::challenge_draft("Old challenge"), &a.id, past)
        .await
        .unwrap();
    for title in ["First try", "Second try"] {
        app.state
            .submissions
            .create_at(
                &challenge.id,
                &a.id,
                common::submission_draft(title),
                common::video(),
                past,
            )
            .await
            .unwrap();
    }
    store.fail_submission_deletes_from(2);

    let response = app
        .router
        .oneshot(authed_request(
            "DELETE",
            &format!("/api/challenges/{}", challenge.id),
            &create_test_jwt(&a.id, &app.state),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "cascade_incomplete");
    assert_eq!(body["details"]["completed"], 1);
    assert_eq!(body["details"]["total"], 2);
}

#[tokio::test]
async fn test_update_own_profile() {
    let app = create_test_app();
    let a = seed_user(&app.state, "Ana", Role::User).await;
    let token = create_test_jwt(&a.id, &app.state);

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/me",
            &token,
            json!({"bio": "Trail runner", "city": "Granada", "phone": "+34 600 111 222"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "updated");
    assert_eq!(body["user"]["city"], "Granada");
    assert_eq!(body["user"]["email"], "ana@example.com");

    let response = app
        .router
        .clone()
        .oneshot(authed_request("GET", "/api/me", &token))
        .await
        .unwrap();
    let profile = body_json(response).await;
    assert_eq!(profile["bio"], "Trail runner");
    assert_eq!(profile["phone"], "+34 600 111 222");

    let response = app
        .router
        .oneshot(json_request(
            "PUT",
            "/api/me",
            &token,
            json!({"photo": "not a url", "phone": "12"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(body["details"]["photo"].is_array());
    assert!(body["details"]["phone"].is_array());
}

#[tokio::test]
async fn test_profile_update_requires_session() {
    let app = create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/me")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"city": "Granada"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
