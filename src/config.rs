// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use chrono::NaiveTime;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// Process-local store, lost on restart
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::Invalid("STORE_BACKEND", s.to_string())),
        }
    }
}

/// Expiry sweep schedule.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    pub enabled: bool,
    pub interval: Duration,
    /// Daily run time, UTC
    pub daily_at: NaiveTime,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(6 * 3600),
            daily_at: NaiveTime::from_hms_opt(2, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Allowed CORS origin
    pub frontend_url: String,
    pub gcp_project_id: String,
    pub port: u16,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    pub store_backend: StoreBackend,
    /// Root directory of the filesystem media store
    pub media_dir: PathBuf,
    /// Upper bound on every store and media call
    pub store_timeout: Duration,
    /// Largest accepted request body, for video uploads
    pub max_upload_bytes: usize,
    pub cleanup: CleanupConfig,
}

impl Config {
    /// Config for tests: in-memory store, fixed signing key, scheduler off.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            store_backend: StoreBackend::Memory,
            media_dir: PathBuf::from("data/media"),
            store_timeout: Duration::from_secs(10),
            max_upload_bytes: 10 * 1024 * 1024,
            cleanup: CleanupConfig {
                enabled: false,
                ..CleanupConfig::default()
            },
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = CleanupConfig::default();

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_var("PORT", 8080)?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            store_backend: parse_var("STORE_BACKEND", StoreBackend::Firestore)?,
            media_dir: env::var("MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/media")),
            store_timeout: Duration::from_secs(parse_var("STORE_TIMEOUT_SECS", 10)?),
            max_upload_bytes: parse_var::<usize>("MAX_UPLOAD_MB", 100)? * 1024 * 1024,
            cleanup: CleanupConfig {
                enabled: parse_var("CLEANUP_ENABLED", defaults.enabled)?,
                interval: Duration::from_secs(parse_var::<u64>("CLEANUP_INTERVAL_HOURS", 6)? * 3600),
                daily_at: match env::var("CLEANUP_DAILY_AT") {
                    Ok(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M")
                        .map_err(|_| ConfigError::Invalid("CLEANUP_DAILY_AT", raw))?,
                    Err(_) => defaults.daily_at,
                },
            },
        })
    }
}

/// Parse `name` if set, otherwise fall back to `default`.
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
