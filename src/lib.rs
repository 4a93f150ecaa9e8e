// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Retos: a social fitness backend.
//!
//! Users publish time-limited challenges, answer them with video
//! submissions, rate and comment on each other's submissions, and compete
//! on a leaderboard derived from those ratings.

pub mod config;
pub mod db;
pub mod error;
pub mod ids;
pub mod media;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{DocumentStore, Repository};
use media::MediaStore;
use services::{
    ChallengeService, CleanupScheduler, RankingService, SubmissionService, UserService,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub repo: Repository,
    pub challenges: ChallengeService,
    pub submissions: SubmissionService,
    pub ranking: RankingService,
    pub users: UserService,
    pub cleanup: Arc<CleanupScheduler>,
}

impl AppState {
    /// Wire the services over the given store and media collaborators.
    pub fn new(config: Config, store: Arc<dyn DocumentStore>, media: Arc<dyn MediaStore>) -> Self {
        let repo = Repository::new(store, config.store_timeout);
        let submissions = SubmissionService::new(repo.clone(), media, config.store_timeout);
        let challenges = ChallengeService::new(repo.clone(), submissions.clone());
        let ranking = RankingService::new(repo.clone());
        let users = UserService::new(repo.clone());
        let cleanup = Arc::new(CleanupScheduler::new(
            challenges.clone(),
            config.cleanup.clone(),
        ));

        Self {
            config,
            repo,
            challenges,
            submissions,
            ranking,
            users,
            cleanup,
        }
    }
}
