// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Filesystem-backed media store.
//!
//! Each object is `{root}/{ref}` with a `{root}/{ref}.meta` JSON sidecar
//! holding its content type. References are UUIDs, so they can never
//! name a path outside the root.

use crate::error::FileError;
use crate::media::{MediaObject, MediaStore};
use async_trait::async_trait;
use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

#[derive(Serialize, Deserialize)]
struct Sidecar {
    content_type: String,
    name: String,
}

pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, FileError> {
        let root = root.into();
        fs::create_dir_all(root.join(".tmp"))
            .await
            .map_err(|e| FileError::Io(format!("Failed to create {}: {}", root.display(), e)))?;
        Ok(Self { root })
    }

    fn object_path(&self, media_ref: &str) -> Result<PathBuf, FileError> {
        uuid::Uuid::parse_str(media_ref)
            .map_err(|_| FileError::Invalid(format!("Bad media reference {}", media_ref)))?;
        Ok(self.root.join(media_ref))
    }

    fn sidecar_path(&self, media_ref: &str) -> PathBuf {
        self.root.join(format!("{}.meta", media_ref))
    }
}

fn io_error(media_ref: &str, e: std::io::Error) -> FileError {
    if e.kind() == ErrorKind::NotFound {
        FileError::NotFound(media_ref.to_string())
    } else {
        FileError::Io(format!("{}: {}", media_ref, e))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn put(&self, bytes: Bytes, name: &str, content_type: &str) -> Result<String, FileError> {
        let media_ref = uuid::Uuid::new_v4().to_string();
        let object_path = self.object_path(&media_ref)?;
        let temp_path = self.root.join(".tmp").join(&media_ref);

        if let Err(e) = fs::write(&temp_path, &bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(io_error(&media_ref, e));
        }

        let sidecar = serde_json::to_vec(&Sidecar {
            content_type: content_type.to_string(),
            name: name.to_string(),
        })
        .map_err(|e| FileError::Io(e.to_string()))?;

        if let Err(e) = fs::write(self.sidecar_path(&media_ref), sidecar).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(io_error(&media_ref, e));
        }

        if let Err(e) = fs::rename(&temp_path, &object_path).await {
            let _ = fs::remove_file(&temp_path).await;
            let _ = fs::remove_file(self.sidecar_path(&media_ref)).await;
            return Err(io_error(&media_ref, e));
        }

        tracing::debug!(media_ref = %media_ref, size = bytes.len(), "Stored media");
        Ok(media_ref)
    }

    async fn get(&self, media_ref: &str) -> Result<MediaObject, FileError> {
        let object_path = self.object_path(media_ref)?;
        let bytes = fs::read(&object_path)
            .await
            .map_err(|e| io_error(media_ref, e))?;

        let content_type = match fs::read(self.sidecar_path(media_ref)).await {
            Ok(raw) => serde_json::from_slice::<Sidecar>(&raw)
                .map(|s| s.content_type)
                .unwrap_or_else(|_| "application/octet-stream".to_string()),
            Err(_) => "application/octet-stream".to_string(),
        };

        Ok(MediaObject {
            bytes: Bytes::from(bytes),
            content_type,
        })
    }

    async fn delete(&self, media_ref: &str) -> Result<(), FileError> {
        let object_path = self.object_path(media_ref)?;
        fs::remove_file(&object_path)
            .await
            .map_err(|e| io_error(media_ref, e))?;

        match fs::remove_file(self.sidecar_path(media_ref)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(media_ref, e)),
        }
    }
}
