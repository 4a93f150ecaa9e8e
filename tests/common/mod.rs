// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, Request};
use axum::response::Response;
use retos_backend::config::Config;
use retos_backend::db::{
    collections, Document, DocumentStore, Filter, FindOptions, FirestoreStore, MemoryStore,
};
use retos_backend::error::AppError;
use retos_backend::media::{MemoryMediaStore, VideoUpload};
use retos_backend::middleware::auth::create_jwt;
use retos_backend::models::{NewChallenge, NewSubmission, Role, User};
use retos_backend::routes::create_router;
use retos_backend::AppState;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a Firestore connection (emulator when FIRESTORE_EMULATOR_HOST is set).
#[allow(dead_code)]
pub async fn test_store() -> FirestoreStore {
    FirestoreStore::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// App over in-memory document and media stores.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub media: Arc<MemoryMediaStore>,
}

#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_store(Arc::new(MemoryStore::new()))
}

#[allow(dead_code)]
pub fn create_test_app_with_store(store: Arc<dyn DocumentStore>) -> TestApp {
    let media = Arc::new(MemoryMediaStore::new());
    let state = Arc::new(AppState::new(Config::test_default(), store, media.clone()));

    TestApp {
        router: create_router(state.clone()),
        state,
        media,
    }
}

/// In-memory store with injectable faults.
///
/// Submission deletes can be made to fail from the Nth call on, and
/// challenge queries can be parked until released.
#[allow(dead_code)]
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    fail_submission_delete_from: AtomicUsize,
    submission_deletes: AtomicUsize,
    hold_challenge_queries: AtomicBool,
    /// Signalled when a challenge query is parked
    pub parked: Notify,
    release: Notify,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th submission delete (1-based) and every one after it.
    pub fn fail_submission_deletes_from(&self, n: usize) {
        self.fail_submission_delete_from.store(n, Ordering::SeqCst);
    }

    pub fn hold_challenge_queries(&self) {
        self.hold_challenge_queries.store(true, Ordering::SeqCst);
    }

    pub fn release_challenge_queries(&self) {
        self.hold_challenge_queries.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.inner.ping().await
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<String, AppError> {
        self.inner.insert(collection, doc).await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, AppError> {
        self.inner.find_one(collection, filter).await
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, AppError> {
        if collection == collections::CHALLENGES
            && self.hold_challenge_queries.load(Ordering::SeqCst)
        {
            self.parked.notify_one();
            self.release.notified().await;
        }
        self.inner.find(collection, filter, options).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Document,
    ) -> Result<u64, AppError> {
        self.inner.update_one(collection, filter, patch).await
    }

    async fn replace_if_version(
        &self,
        collection: &str,
        id: &str,
        expected_version: u64,
        doc: Document,
    ) -> Result<bool, AppError> {
        self.inner
            .replace_if_version(collection, id, expected_version, doc)
            .await
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, AppError> {
        if collection == collections::SUBMISSIONS {
            let call = self.submission_deletes.fetch_add(1, Ordering::SeqCst) + 1;
            let fail_from = self.fail_submission_delete_from.load(Ordering::SeqCst);
            if fail_from > 0 && call >= fail_from {
                return Err(AppError::Database("injected delete failure".to_string()));
            }
        }
        self.inner.delete_one(collection, filter).await
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, AppError> {
        self.inner.delete_many(collection, filter).await
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, AppError> {
        self.inner.count(collection, filter).await
    }
}

/// Store a user whose id and email derive from `name`.
#[allow(dead_code)]
pub async fn seed_user(state: &AppState, name: &str, role: Role) -> User {
    let user = User {
        id: format!("user-{}", name.to_lowercase()),
        email: format!("{}@example.com", name.to_lowercase()),
        name: name.to_string(),
        surname: "Tester".to_string(),
        role,
        bio: None,
        photo: None,
        city: Some("Madrid".to_string()),
        phone: None,
    };
    state.repo.insert_user(&user).await.unwrap();
    user
}

#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, state: &AppState) -> String {
    create_jwt(user_id, &state.config.jwt_signing_key).unwrap()
}

#[allow(dead_code)]
pub fn challenge_draft(title: &str) -> NewChallenge {
    NewChallenge {
        title: title.to_string(),
        description: "Twenty char describe".to_string(),
    }
}

#[allow(dead_code)]
pub fn submission_draft(title: &str) -> NewSubmission {
    NewSubmission {
        title: title.to_string(),
        description: "Two minutes, no breaks".to_string(),
    }
}

#[allow(dead_code)]
pub fn video() -> VideoUpload {
    VideoUpload {
        bytes: Bytes::from_static(b"\x00\x00\x00\x18ftypmp42"),
        file_name: "clip.mp4".to_string(),
        content_type: "video/mp4".to_string(),
    }
}

const BOUNDARY: &str = "retos-test-boundary";

/// Build a multipart/form-data body. Returns the content type header value
/// and the encoded body.
#[allow(dead_code)]
pub fn multipart_body(fields: &[(&str, &str)], video: Option<&[u8]>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = video {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"video\"; filename=\"clip.mp4\"\r\nContent-Type: video/mp4\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// Authenticated JSON request.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Authenticated request without a body.
#[allow(dead_code)]
pub fn authed_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
