use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::bans::BanRepository;
use crate::ports::prompts::PromptRepository;
use crate::ports::votes::VoteRepository;
use crate::scoring::ScoreMaintainer;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vote {
    pub prompt_id: String,
    pub hashed_ip: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VoteReceipt {
    pub prompt_id: String,
    pub votes_count: u64,
    pub score: f64,
}

/// Accepts at most one upvote per prompt and network address.
#[derive(Clone)]
pub struct VoteService {
    prompts: Arc<dyn PromptRepository>,
    votes: Arc<dyn VoteRepository>,
    bans: Arc<dyn BanRepository>,
    maintainer: ScoreMaintainer,
}

impl VoteService {
    pub fn new(
        prompts: Arc<dyn PromptRepository>,
        votes: Arc<dyn VoteRepository>,
        bans: Arc<dyn BanRepository>,
        maintainer: ScoreMaintainer,
    ) -> Self {
        Self {
            prompts,
            votes,
            bans,
            maintainer,
        }
    }

    pub async fn upvote(
        &self,
        prompt_id: &str,
        hashed_ip: &str,
        now_ms: i64,
    ) -> DomainResult<VoteReceipt> {
        let prompt_id = prompt_id.trim();
        if prompt_id.is_empty() {
            return Err(DomainError::Validation("prompt_id is required".into()));
        }

        if self.bans.is_banned(hashed_ip).await? {
            return Err(DomainError::Forbidden("access denied".into()));
        }

        let live = self
            .prompts
            .get(prompt_id)
            .await?
            .is_some_and(|prompt| !prompt.is_deleted);
        if !live {
            return Err(DomainError::NotFound);
        }

        self.votes
            .create(&Vote {
                prompt_id: prompt_id.to_string(),
                hashed_ip: hashed_ip.to_string(),
                created_at_ms: now_ms,
            })
            .await?;

        // An uncounted vote record would lock the address out for good.
        let update = match self.maintainer.record_vote(prompt_id, now_ms).await {
            Ok(update) => update,
            Err(err) => {
                tracing::warn!(prompt_id, error = %err, "count update failed, withdrawing vote");
                if let Err(rollback) = self.votes.delete(prompt_id, hashed_ip).await {
                    tracing::error!(
                        prompt_id,
                        error = %rollback,
                        "vote record left without a counted vote"
                    );
                }
                return Err(err);
            }
        };

        Ok(VoteReceipt {
            prompt_id: prompt_id.to_string(),
            votes_count: update.votes_count,
            score: update.score_cached,
        })
    }

    pub async fn has_voted(&self, prompt_id: &str, hashed_ip: &str) -> DomainResult<bool> {
        self.votes.has_voted(prompt_id, hashed_ip).await
    }
}
