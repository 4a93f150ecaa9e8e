// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Background sweep of expired challenges.
//!
//! Runs on a fixed interval and once a day at a fixed UTC time, whichever
//! comes first. At most one sweep runs at a time, whether started by the
//! timer or on demand.

use crate::config::CleanupConfig;
use crate::error::AppError;
use crate::services::challenges::{ChallengeService, SweepReport};
use crate::time_utils::{format_utc_rfc3339, next_daily_occurrence};
use chrono::{DateTime, NaiveTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// When the next sweep is due.
pub fn next_run(now: DateTime<Utc>, interval: Duration, daily_at: NaiveTime) -> DateTime<Utc> {
    let by_interval = chrono::Duration::from_std(interval)
        .map(|d| now + d)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    by_interval.min(next_daily_occurrence(now, daily_at))
}

/// Clears the in-progress flag when a sweep ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CleanupScheduler {
    challenges: ChallengeService,
    config: CleanupConfig,
    running: AtomicBool,
}

impl CleanupScheduler {
    pub fn new(challenges: ChallengeService, config: CleanupConfig) -> Self {
        Self {
            challenges,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn run_once(&self) -> Result<Option<SweepReport>, AppError> {
        self.run_once_at(Utc::now()).await
    }

    /// Sweep now. Returns `None` without doing anything if another sweep is
    /// already in progress.
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> Result<Option<SweepReport>, AppError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Cleanup sweep already in progress, skipping");
            return Ok(None);
        }
        let _guard = RunGuard(&self.running);

        tracing::info!(now = %format_utc_rfc3339(now), "Cleanup sweep started");
        let report = self.challenges.sweep_at(now).await?;
        tracing::info!(
            challenges_deactivated = report.challenges_deactivated,
            submissions_deleted = report.submissions_deleted,
            "Cleanup sweep finished"
        );

        Ok(Some(report))
    }

    /// Timer loop. Returns once `shutdown` flips to true (or its sender is
    /// dropped); a sweep already running is allowed to finish first.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        if !self.config.enabled {
            tracing::info!("Cleanup scheduler disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            daily_at = %self.config.daily_at,
            "Starting cleanup scheduler"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = Utc::now();
            let due = next_run(now, self.config.interval, self.config.daily_at);
            let delay = (due - now).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!(next_run = %format_utc_rfc3339(due), "Next cleanup sweep scheduled");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            if let Err(e) = self.run_once().await {
                tracing::error!(error = %e, "Cleanup sweep failed");
            }
        }

        tracing::info!("Cleanup scheduler stopped");
    }
}
