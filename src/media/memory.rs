// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process media store for tests and local runs.

use crate::error::FileError;
use crate::media::{MediaObject, MediaStore};
use async_trait::async_trait;
use axum::body::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct MemoryMediaStore {
    objects: DashMap<String, MediaObject>,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `put` calls fail with an I/O error.
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `delete` calls fail with an I/O error.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, media_ref: &str) -> bool {
        self.objects.contains_key(media_ref)
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn put(&self, bytes: Bytes, _name: &str, content_type: &str) -> Result<String, FileError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(FileError::Io("media store unavailable".to_string()));
        }

        let media_ref = uuid::Uuid::new_v4().to_string();
        self.objects.insert(
            media_ref.clone(),
            MediaObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(media_ref)
    }

    async fn get(&self, media_ref: &str) -> Result<MediaObject, FileError> {
        self.objects
            .get(media_ref)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FileError::NotFound(media_ref.to_string()))
    }

    async fn delete(&self, media_ref: &str) -> Result<(), FileError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(FileError::Io("media store unavailable".to_string()));
        }

        self.objects
            .remove(media_ref)
            .map(|_| ())
            .ok_or_else(|| FileError::NotFound(media_ref.to_string()))
    }
}
