// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Binary media storage for submission videos.

pub mod local;
pub mod memory;

use crate::error::FileError;
use async_trait::async_trait;
use axum::body::Bytes;

pub use local::LocalMediaStore;
pub use memory::MemoryMediaStore;

/// Stored media with the content type it was uploaded with.
#[derive(Debug, Clone)]
pub struct MediaObject {
    pub bytes: Bytes,
    pub content_type: String,
}

/// A video received from a client, not yet stored.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub bytes: Bytes,
    pub file_name: String,
    pub content_type: String,
}

/// Opaque-reference media store.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store `bytes` and return a reference for later retrieval.
    async fn put(&self, bytes: Bytes, name: &str, content_type: &str) -> Result<String, FileError>;

    async fn get(&self, media_ref: &str) -> Result<MediaObject, FileError>;

    async fn delete(&self, media_ref: &str) -> Result<(), FileError>;
}
