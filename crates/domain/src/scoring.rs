use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::prompts::PromptRepository;
use crate::ranking::hot_score;

const MAX_VOTE_ATTEMPTS: usize = 16;
const DEFAULT_SWEEP_CONCURRENCY: usize = 8;

/// The inputs of the hot score as currently stored for one prompt.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScoreSnapshot {
    pub prompt_id: String,
    pub votes_count: u64,
    pub created_at_ms: i64,
}

impl ScoreSnapshot {
    pub fn rescore(&self, votes_count: u64, now_ms: i64) -> ScoreUpdate {
        ScoreUpdate {
            votes_count,
            score_cached: hot_score(votes_count, self.created_at_ms, now_ms),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScoreUpdate {
    pub votes_count: u64,
    pub score_cached: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecomputeReport {
    pub scanned: u64,
    pub updated: u64,
    /// Prompts that took a vote mid-sweep; the vote already stored a fresher score.
    pub superseded: u64,
    pub failed: u64,
}

enum SweepOutcome {
    Updated,
    Superseded,
    Failed,
}

/// Keeps `score_cached` in step with vote counts and the passage of time.
#[derive(Clone)]
pub struct ScoreMaintainer {
    repository: Arc<dyn PromptRepository>,
    sweep_concurrency: usize,
}

impl ScoreMaintainer {
    pub fn new(repository: Arc<dyn PromptRepository>) -> Self {
        Self {
            repository,
            sweep_concurrency: DEFAULT_SWEEP_CONCURRENCY,
        }
    }

    pub fn with_sweep_concurrency(mut self, concurrency: usize) -> Self {
        self.sweep_concurrency = concurrency.max(1);
        self
    }

    /// Adds one vote and stores the matching score. The new count and score
    /// come from the same snapshot; a concurrent writer forces a retry.
    pub async fn record_vote(&self, prompt_id: &str, now_ms: i64) -> DomainResult<ScoreUpdate> {
        for attempt in 1..=MAX_VOTE_ATTEMPTS {
            let snapshot = self
                .repository
                .score_snapshot(prompt_id)
                .await?
                .ok_or(DomainError::NotFound)?;
            let update = snapshot.rescore(snapshot.votes_count.saturating_add(1), now_ms);
            if self
                .repository
                .compare_and_set_score(prompt_id, snapshot.votes_count, &update)
                .await?
            {
                return Ok(update);
            }
            tracing::debug!(prompt_id, attempt, "vote count moved, retrying score write");
        }

        tracing::warn!(
            prompt_id,
            attempts = MAX_VOTE_ATTEMPTS,
            "gave up recording vote under contention"
        );
        Err(DomainError::Conflict)
    }

    pub async fn wipe_votes(&self, prompt_id: &str, now_ms: i64) -> DomainResult<ScoreUpdate> {
        let snapshot = self
            .repository
            .score_snapshot(prompt_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        let update = snapshot.rescore(0, now_ms);
        self.repository.store_score(prompt_id, &update).await?;
        Ok(update)
    }

    /// Recomputes one prompt from its stored count. Returns `None` when a
    /// vote landed in between and already wrote a newer score.
    pub async fn refresh(&self, prompt_id: &str, now_ms: i64) -> DomainResult<Option<ScoreUpdate>> {
        let snapshot = self
            .repository
            .score_snapshot(prompt_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        rewrite(self.repository.as_ref(), &snapshot, now_ms).await
    }

    /// Rescores every live prompt. Individual failures are logged and
    /// counted; only failing to enumerate prompts aborts the sweep.
    pub async fn recompute_all(&self, now_ms: i64) -> DomainResult<RecomputeReport> {
        let snapshots = self.repository.list_live_snapshots().await?;
        let mut report = RecomputeReport {
            scanned: snapshots.len() as u64,
            ..RecomputeReport::default()
        };

        let mut outcomes = stream::iter(snapshots)
            .map(|snapshot| {
                let repository = self.repository.clone();
                async move {
                    match rewrite(repository.as_ref(), &snapshot, now_ms).await {
                        Ok(Some(_)) => SweepOutcome::Updated,
                        Ok(None) => SweepOutcome::Superseded,
                        Err(err) => {
                            tracing::warn!(
                                prompt_id = %snapshot.prompt_id,
                                error = %err,
                                "score recompute failed, skipping prompt"
                            );
                            SweepOutcome::Failed
                        }
                    }
                }
            })
            .buffer_unordered(self.sweep_concurrency);

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                SweepOutcome::Updated => report.updated += 1,
                SweepOutcome::Superseded => report.superseded += 1,
                SweepOutcome::Failed => report.failed += 1,
            }
        }

        tracing::info!(
            scanned = report.scanned,
            updated = report.updated,
            superseded = report.superseded,
            failed = report.failed,
            "score sweep finished"
        );
        Ok(report)
    }
}

async fn rewrite(
    repository: &dyn PromptRepository,
    snapshot: &ScoreSnapshot,
    now_ms: i64,
) -> DomainResult<Option<ScoreUpdate>> {
    let update = snapshot.rescore(snapshot.votes_count, now_ms);
    let applied = repository
        .compare_and_set_score(&snapshot.prompt_id, snapshot.votes_count, &update)
        .await?;
    Ok(applied.then_some(update))
}
