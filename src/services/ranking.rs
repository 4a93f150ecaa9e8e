// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ranking aggregator.
//!
//! Scores are never stored. Each request scans every user's submissions,
//! so results always reflect the latest ratings.

use crate::db::Repository;
use crate::error::AppError;
use crate::models::{RankingEntry, RankingPage, ScoreSummary};
use futures_util::{stream, StreamExt};
use serde::Serialize;

/// Largest page the leaderboard will return.
pub const MAX_RANKING_LIMIT: u32 = 100;
const MAX_CONCURRENT_DB_OPS: usize = 16;

/// A user's own summary and leaderboard position.
#[derive(Debug, Clone, Serialize)]
pub struct MyRanking {
    #[serde(flatten)]
    pub summary: ScoreSummary,
    /// 1-based; 0 when the user is not on the board
    pub position: usize,
}

/// Sort by `score_total` descending, keeping input order for ties, and
/// number the result from 1.
pub fn rank_entries(mut entries: Vec<RankingEntry>) -> Vec<RankingEntry> {
    entries.sort_by(|a, b| b.summary.score_total.total_cmp(&a.summary.score_total));
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.position = i + 1;
    }
    entries
}

/// Cut one page out of a ranked list.
pub fn paginate(ranked: Vec<RankingEntry>, limit: u32, offset: u32) -> RankingPage {
    let total = ranked.len();
    let ranking = ranked
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();

    RankingPage {
        ranking,
        total,
        current_page: offset / limit + 1,
        total_pages: total.div_ceil(limit as usize) as u32,
    }
}

#[derive(Clone)]
pub struct RankingService {
    repo: Repository,
}

impl RankingService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Score summary for one user. Unknown users get a zeroed summary.
    pub async fn compute_user_score(&self, user_id: &str) -> Result<ScoreSummary, AppError> {
        let Some(user) = self.repo.get_user(user_id).await? else {
            return Ok(ScoreSummary::default());
        };

        let submissions = self.repo.list_submissions_by_owner(&user.id).await?;
        Ok(ScoreSummary::from_submissions(&submissions))
    }

    /// Every user, scored and ranked.
    async fn ranked(&self) -> Result<Vec<RankingEntry>, AppError> {
        let users = self.repo.list_users().await?;

        // `buffered` keeps user order, which the stable sort relies on for ties.
        let entries = stream::iter(users)
            .map(|user| async move {
                let submissions = self.repo.list_submissions_by_owner(&user.id).await?;
                Ok::<_, AppError>(RankingEntry::new(
                    &user,
                    ScoreSummary::from_submissions(&submissions),
                ))
            })
            .buffered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<RankingEntry, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<RankingEntry>, AppError>>()?;

        Ok(rank_entries(entries))
    }

    /// One page of the global leaderboard. `limit` must be positive and is
    /// capped at [`MAX_RANKING_LIMIT`].
    pub async fn global_ranking(&self, limit: u32, offset: u32) -> Result<RankingPage, AppError> {
        if limit == 0 {
            return Err(AppError::validation("limit must be at least 1"));
        }
        let limit = limit.min(MAX_RANKING_LIMIT);

        let ranked = self.ranked().await?;
        Ok(paginate(ranked, limit, offset))
    }

    pub async fn my_position(&self, user_id: &str) -> Result<MyRanking, AppError> {
        let ranked = self.ranked().await?;

        match ranked.into_iter().find(|entry| entry.user_id == user_id) {
            Some(entry) => Ok(MyRanking {
                summary: entry.summary,
                position: entry.position,
            }),
            None => Ok(MyRanking {
                summary: self.compute_user_score(user_id).await?,
                position: 0,
            }),
        }
    }
}
