use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::bans::BanRepository;
use crate::ports::prompts::{PromptRepository, PromptRepositoryQuery};
use crate::ports::votes::VoteRepository;
use crate::prompts::{MAX_LIST_LIMIT, Prompt, PromptSort};
use crate::scoring::{RecomputeReport, ScoreMaintainer, ScoreUpdate};

const MAX_REASON_LENGTH: usize = 500;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpBan {
    pub hashed_ip: String,
    pub reason: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VoteWipe {
    pub prompt_id: String,
    pub votes_removed: u64,
    pub score: ScoreUpdate,
}

#[derive(Clone)]
pub struct AdminService {
    prompts: Arc<dyn PromptRepository>,
    votes: Arc<dyn VoteRepository>,
    bans: Arc<dyn BanRepository>,
    maintainer: ScoreMaintainer,
}

impl AdminService {
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

    /// Newest first, soft-deleted prompts included.
    pub async fn list_prompts(&self, limit: usize, offset: usize) -> DomainResult<Vec<Prompt>> {
        self.prompts
            .list(&PromptRepositoryQuery {
                sort: PromptSort::New,
                created_after_ms: None,
                include_deleted: true,
                limit: limit.clamp(1, MAX_LIST_LIMIT),
                offset,
            })
            .await
    }

    pub async fn set_deleted(&self, prompt_id: &str, is_deleted: bool) -> DomainResult<Prompt> {
        let prompt = self.prompts.set_deleted(prompt_id, is_deleted).await?;
        tracing::info!(prompt_id, is_deleted, "prompt visibility changed");
        Ok(prompt)
    }

    /// Clears vote records, then resets the count and score. The two steps
    /// are not atomic: a vote accepted between them keeps its record while
    /// the count reads 0, so that address stays locked out of the prompt
    /// until the next wipe.
    pub async fn wipe_votes(&self, prompt_id: &str, now_ms: i64) -> DomainResult<VoteWipe> {
        if self.prompts.get(prompt_id).await?.is_none() {
            return Err(DomainError::NotFound);
        }
        let votes_removed = self.votes.delete_for_prompt(prompt_id).await?;
        let score = self.maintainer.wipe_votes(prompt_id, now_ms).await?;
        tracing::info!(prompt_id, votes_removed, "votes wiped");
        Ok(VoteWipe {
            prompt_id: prompt_id.to_string(),
            votes_removed,
            score,
        })
    }

    /// Bans an address hash; banning it again replaces the reason.
    pub async fn ban_ip(&self, hashed_ip: &str, reason: &str, now_ms: i64) -> DomainResult<IpBan> {
        let hashed_ip = hashed_ip.trim();
        if hashed_ip.is_empty() {
            return Err(DomainError::Validation("hashed_ip is required".into()));
        }
        if reason.chars().count() > MAX_REASON_LENGTH {
            return Err(DomainError::Validation(format!(
                "reason exceeds max length of {MAX_REASON_LENGTH}"
            )));
        }
        let ban = self
            .bans
            .upsert(&IpBan {
                hashed_ip: hashed_ip.to_string(),
                reason: reason.trim().to_string(),
                created_at_ms: now_ms,
                updated_at_ms: now_ms,
            })
            .await?;
        tracing::info!(hashed_ip = %ban.hashed_ip, "address banned");
        Ok(ban)
    }

    pub async fn list_bans(&self) -> DomainResult<Vec<IpBan>> {
        self.bans.list().await
    }

    pub async fn recompute_hot(&self, now_ms: i64) -> DomainResult<RecomputeReport> {
        self.maintainer.recompute_all(now_ms).await
    }
}
