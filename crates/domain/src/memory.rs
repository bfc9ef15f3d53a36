use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::DomainResult;
use crate::admin::IpBan;
use crate::error::DomainError;
use crate::policy::{IP_EVENT_RETENTION_MS, IpEvent, IpEventKind};
use crate::ports::BoxFuture;
use crate::ports::bans::BanRepository;
use crate::ports::db::{DbAdapter, DbError};
use crate::ports::ip_events::IpEventRepository;
use crate::ports::prompts::{PromptRepository, PromptRepositoryQuery};
use crate::ports::votes::VoteRepository;
use crate::prompts::{Prompt, PromptContent};
use crate::scoring::{ScoreSnapshot, ScoreUpdate};
use crate::votes::Vote;

fn snapshot_of(prompt: &Prompt) -> ScoreSnapshot {
    ScoreSnapshot {
        prompt_id: prompt.prompt_id.clone(),
        votes_count: prompt.votes_count,
        created_at_ms: prompt.created_at_ms,
    }
}

#[derive(Clone, Default)]
pub struct InMemoryPromptRepository {
    store: Arc<RwLock<HashMap<String, Prompt>>>,
}

impl InMemoryPromptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PromptRepository for InMemoryPromptRepository {
    fn create(&self, prompt: &Prompt) -> BoxFuture<'_, DomainResult<Prompt>> {
        let prompt = prompt.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            if store.contains_key(&prompt.prompt_id) {
                return Err(DomainError::Conflict);
            }
            store.insert(prompt.prompt_id.clone(), prompt.clone());
            Ok(prompt)
        })
    }

    fn get(&self, prompt_id: &str) -> BoxFuture<'_, DomainResult<Option<Prompt>>> {
        let prompt_id = prompt_id.to_string();
        let store = self.store.clone();
        Box::pin(async move { Ok(store.read().await.get(&prompt_id).cloned()) })
    }

    fn update_content(
        &self,
        prompt_id: &str,
        content: &PromptContent,
        updated_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<Prompt>> {
        let prompt_id = prompt_id.to_string();
        let content = content.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            let prompt = store.get_mut(&prompt_id).ok_or(DomainError::NotFound)?;
            prompt.title = content.title;
            prompt.prompt_text = content.prompt_text;
            prompt.name = content.name;
            prompt.tag = content.tag;
            prompt.updated_at_ms = updated_at_ms;
            Ok(prompt.clone())
        })
    }

    fn set_deleted(
        &self,
        prompt_id: &str,
        is_deleted: bool,
    ) -> BoxFuture<'_, DomainResult<Prompt>> {
        let prompt_id = prompt_id.to_string();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            let prompt = store.get_mut(&prompt_id).ok_or(DomainError::NotFound)?;
            prompt.is_deleted = is_deleted;
            Ok(prompt.clone())
        })
    }

    fn list(&self, query: &PromptRepositoryQuery) -> BoxFuture<'_, DomainResult<Vec<Prompt>>> {
        let query = query.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut prompts: Vec<Prompt> = store
                .read()
                .await
                .values()
                .filter(|prompt| query.include_deleted || !prompt.is_deleted)
                .filter(|prompt| {
                    query
                        .created_after_ms
                        .map_or(true, |cutoff| prompt.created_at_ms > cutoff)
                })
                .cloned()
                .collect();
            prompts.sort_by(|left, right| query.sort.compare(left, right));
            Ok(prompts
                .into_iter()
                .skip(query.offset)
                .take(query.limit)
                .collect())
        })
    }

    fn score_snapshot(
        &self,
        prompt_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<ScoreSnapshot>>> {
        let prompt_id = prompt_id.to_string();
        let store = self.store.clone();
        Box::pin(async move { Ok(store.read().await.get(&prompt_id).map(snapshot_of)) })
    }

    fn list_live_snapshots(&self) -> BoxFuture<'_, DomainResult<Vec<ScoreSnapshot>>> {
        let store = self.store.clone();
        Box::pin(async move {
            Ok(store
                .read()
                .await
                .values()
                .filter(|prompt| !prompt.is_deleted)
                .map(snapshot_of)
                .collect())
        })
    }

    fn compare_and_set_score(
        &self,
        prompt_id: &str,
        expected_votes: u64,
        update: &ScoreUpdate,
    ) -> BoxFuture<'_, DomainResult<bool>> {
        let prompt_id = prompt_id.to_string();
        let update = update.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            let prompt = store.get_mut(&prompt_id).ok_or(DomainError::NotFound)?;
            if prompt.votes_count != expected_votes {
                return Ok(false);
            }
            prompt.votes_count = update.votes_count;
            prompt.score_cached = update.score_cached;
            Ok(true)
        })
    }

    fn store_score(
        &self,
        prompt_id: &str,
        update: &ScoreUpdate,
    ) -> BoxFuture<'_, DomainResult<()>> {
        let prompt_id = prompt_id.to_string();
        let update = update.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            let prompt = store.get_mut(&prompt_id).ok_or(DomainError::NotFound)?;
            prompt.votes_count = update.votes_count;
            prompt.score_cached = update.score_cached;
            Ok(())
        })
    }
}

#[derive(Clone, Default)]
pub struct InMemoryVoteRepository {
    voters: Arc<RwLock<HashMap<String, HashSet<String>>>>,
}

impl InMemoryVoteRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VoteRepository for InMemoryVoteRepository {
    fn create(&self, vote: &Vote) -> BoxFuture<'_, DomainResult<Vote>> {
        let vote = vote.clone();
        let voters = self.voters.clone();
        Box::pin(async move {
            let mut voters = voters.write().await;
            let inserted = voters
                .entry(vote.prompt_id.clone())
                .or_default()
                .insert(vote.hashed_ip.clone());
            if !inserted {
                return Err(DomainError::DuplicateVote);
            }
            Ok(vote)
        })
    }

    fn delete(&self, prompt_id: &str, hashed_ip: &str) -> BoxFuture<'_, DomainResult<bool>> {
        let prompt_id = prompt_id.to_string();
        let hashed_ip = hashed_ip.to_string();
        let voters = self.voters.clone();
        Box::pin(async move {
            let mut voters = voters.write().await;
            let removed = voters
                .get_mut(&prompt_id)
                .is_some_and(|ips| ips.remove(&hashed_ip));
            if voters.get(&prompt_id).is_some_and(HashSet::is_empty) {
                voters.remove(&prompt_id);
            }
            Ok(removed)
        })
    }

    fn has_voted(&self, prompt_id: &str, hashed_ip: &str) -> BoxFuture<'_, DomainResult<bool>> {
        let prompt_id = prompt_id.to_string();
        let hashed_ip = hashed_ip.to_string();
        let voters = self.voters.clone();
        Box::pin(async move {
            Ok(voters
                .read()
                .await
                .get(&prompt_id)
                .is_some_and(|ips| ips.contains(&hashed_ip)))
        })
    }

    fn delete_for_prompt(&self, prompt_id: &str) -> BoxFuture<'_, DomainResult<u64>> {
        let prompt_id = prompt_id.to_string();
        let voters = self.voters.clone();
        Box::pin(async move {
            let removed = voters.write().await.remove(&prompt_id);
            Ok(removed.map_or(0, |ips| ips.len() as u64))
        })
    }
}

#[derive(Clone, Default)]
pub struct InMemoryBanRepository {
    bans: Arc<RwLock<HashMap<String, IpBan>>>,
}

impl InMemoryBanRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BanRepository for InMemoryBanRepository {
    fn upsert(&self, ban: &IpBan) -> BoxFuture<'_, DomainResult<IpBan>> {
        let ban = ban.clone();
        let bans = self.bans.clone();
        Box::pin(async move {
            let mut bans = bans.write().await;
            let stored = bans
                .entry(ban.hashed_ip.clone())
                .and_modify(|existing| {
                    existing.reason = ban.reason.clone();
                    existing.updated_at_ms = ban.updated_at_ms;
                })
                .or_insert_with(|| ban.clone());
            Ok(stored.clone())
        })
    }

    fn is_banned(&self, hashed_ip: &str) -> BoxFuture<'_, DomainResult<bool>> {
        let hashed_ip = hashed_ip.to_string();
        let bans = self.bans.clone();
        Box::pin(async move { Ok(bans.read().await.contains_key(&hashed_ip)) })
    }

    fn list(&self) -> BoxFuture<'_, DomainResult<Vec<IpBan>>> {
        let bans = self.bans.clone();
        Box::pin(async move {
            let mut bans: Vec<IpBan> = bans.read().await.values().cloned().collect();
            bans.sort_by(|left, right| {
                right
                    .updated_at_ms
                    .cmp(&left.updated_at_ms)
                    .then_with(|| left.hashed_ip.cmp(&right.hashed_ip))
            });
            Ok(bans)
        })
    }
}

#[derive(Clone, Default)]
pub struct InMemoryIpEventRepository {
    events: Arc<RwLock<HashMap<(String, IpEventKind), Vec<i64>>>>,
}

impl InMemoryIpEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IpEventRepository for InMemoryIpEventRepository {
    fn record(&self, event: &IpEvent) -> BoxFuture<'_, DomainResult<()>> {
        let event = event.clone();
        let events = self.events.clone();
        Box::pin(async move {
            let cutoff = event.created_at_ms - IP_EVENT_RETENTION_MS;
            let mut events = events.write().await;
            let timestamps = events.entry((event.hashed_ip, event.kind)).or_default();
            timestamps.retain(|ts| *ts > cutoff);
            timestamps.push(event.created_at_ms);
            Ok(())
        })
    }

    fn count_since(
        &self,
        hashed_ip: &str,
        kind: IpEventKind,
        since_ms: i64,
    ) -> BoxFuture<'_, DomainResult<u64>> {
        let key = (hashed_ip.to_string(), kind);
        let events = self.events.clone();
        Box::pin(async move {
            let count = events.read().await.get(&key).map_or(0, |timestamps| {
                timestamps.iter().filter(|ts| **ts > since_ms).count()
            });
            Ok(count as u64)
        })
    }
}

/// Process-local storage is always reachable.
#[derive(Clone, Copy, Debug, Default)]
pub struct InMemoryDbAdapter;

impl DbAdapter for InMemoryDbAdapter {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn health_check(&self) -> BoxFuture<'_, Result<(), DbError>> {
        Box::pin(async { Ok(()) })
    }
}
