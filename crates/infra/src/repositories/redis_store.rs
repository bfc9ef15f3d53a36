use std::collections::HashMap;
use std::str::FromStr;

use promptboard_domain::DomainResult;
use promptboard_domain::admin::IpBan;
use promptboard_domain::error::DomainError;
use promptboard_domain::policy::{IP_EVENT_RETENTION_MS, IpEvent, IpEventKind};
use promptboard_domain::ports::BoxFuture;
use promptboard_domain::ports::bans::BanRepository;
use promptboard_domain::ports::db::DbError;
use promptboard_domain::ports::ip_events::IpEventRepository;
use promptboard_domain::ports::prompts::{PromptRepository, PromptRepositoryQuery};
use promptboard_domain::ports::votes::VoteRepository;
use promptboard_domain::prompts::{Prompt, PromptContent, PromptSort};
use promptboard_domain::scoring::{ScoreSnapshot, ScoreUpdate};
use promptboard_domain::votes::Vote;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

const SNAPSHOT_BATCH: usize = 500;

// KEYS: prompt hash, all, new, hot, top
// ARGV: prompt_id, created_at_ms, score_cached, votes_count, is_deleted, field/value pairs...
const CREATE_PROMPT_SCRIPT: &str = r#"
    if redis.call('EXISTS', KEYS[1]) == 1 then
        return 0
    end
    redis.call('HSET', KEYS[1], unpack(ARGV, 6))
    redis.call('ZADD', KEYS[2], ARGV[2], ARGV[1])
    if ARGV[5] ~= '1' then
        redis.call('ZADD', KEYS[3], ARGV[2], ARGV[1])
        redis.call('ZADD', KEYS[4], ARGV[3], ARGV[1])
        redis.call('ZADD', KEYS[5], ARGV[4], ARGV[1])
    end
    return 1
"#;

// KEYS: prompt hash
// ARGV: field/value pairs...
const UPDATE_CONTENT_SCRIPT: &str = r#"
    if redis.call('EXISTS', KEYS[1]) == 0 then
        return 0
    end
    redis.call('HSET', KEYS[1], unpack(ARGV))
    return 1
"#;

// KEYS: prompt hash, new, hot, top
// ARGV: prompt_id, '1' | '0'
const SET_DELETED_SCRIPT: &str = r#"
    if redis.call('EXISTS', KEYS[1]) == 0 then
        return 0
    end
    redis.call('HSET', KEYS[1], 'is_deleted', ARGV[2])
    if ARGV[2] == '1' then
        redis.call('ZREM', KEYS[2], ARGV[1])
        redis.call('ZREM', KEYS[3], ARGV[1])
        redis.call('ZREM', KEYS[4], ARGV[1])
    else
        local fields = redis.call('HMGET', KEYS[1], 'created_at_ms', 'score_cached', 'votes_count')
        redis.call('ZADD', KEYS[2], fields[1], ARGV[1])
        redis.call('ZADD', KEYS[3], fields[2], ARGV[1])
        redis.call('ZADD', KEYS[4], fields[3], ARGV[1])
    end
    return 1
"#;

// KEYS: prompt hash, hot, top
// ARGV: prompt_id, expected votes_count ('' writes unconditionally), votes_count, score_cached
// Returns -1 when the prompt is missing, 0 when the expected count no longer holds.
const WRITE_SCORE_SCRIPT: &str = r#"
    local current = redis.call('HGET', KEYS[1], 'votes_count')
    if not current then
        return -1
    end
    if ARGV[2] ~= '' and current ~= ARGV[2] then
        return 0
    end
    redis.call('HSET', KEYS[1], 'votes_count', ARGV[3], 'score_cached', ARGV[4])
    if redis.call('HGET', KEYS[1], 'is_deleted') ~= '1' then
        redis.call('ZADD', KEYS[2], ARGV[4], ARGV[1])
        redis.call('ZADD', KEYS[3], ARGV[3], ARGV[1])
    end
    return 1
"#;

/// Inclusive `ZREVRANGE` bounds for a page; `None` when the page lies past
/// any index Redis can address.
fn rank_range(offset: usize, limit: usize) -> Option<(isize, isize)> {
    let last = offset.checked_add(limit.checked_sub(1)?)?;
    Some((isize::try_from(offset).ok()?, isize::try_from(last).ok()?))
}

fn storage_error(err: redis::RedisError) -> DomainError {
    DbError::Operation(err.to_string()).into()
}

/// Key layout under a configurable prefix.
#[derive(Clone, Debug)]
pub struct RedisKeys {
    prefix: String,
}

impl RedisKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prompt(&self, prompt_id: &str) -> String {
        format!("{}:prompt:{prompt_id}", self.prefix)
    }

    /// Every prompt, deleted or not, scored by creation time.
    pub fn all_index(&self) -> String {
        format!("{}:prompts:all", self.prefix)
    }

    /// Live prompts scored by the given sort key.
    pub fn live_index(&self, sort: PromptSort) -> String {
        let name = match sort {
            PromptSort::Hot => "hot",
            PromptSort::New => "new",
            PromptSort::Top => "top",
        };
        format!("{}:prompts:{name}", self.prefix)
    }

    pub fn votes(&self, prompt_id: &str) -> String {
        format!("{}:votes:{prompt_id}", self.prefix)
    }

    pub fn ban(&self, hashed_ip: &str) -> String {
        format!("{}:ban:{hashed_ip}", self.prefix)
    }

    pub fn ban_index(&self) -> String {
        format!("{}:bans", self.prefix)
    }

    pub fn ip_events(&self, kind: IpEventKind, hashed_ip: &str) -> String {
        format!("{}:events:{}:{hashed_ip}", self.prefix, kind.as_str())
    }
}

fn content_fields(content: &PromptContent, updated_at_ms: i64) -> Vec<(&'static str, String)> {
    vec![
        ("title", content.title.clone()),
        ("prompt_text", content.prompt_text.clone()),
        ("name", content.name.clone()),
        ("tag", content.tag.clone().unwrap_or_default()),
        ("updated_at_ms", updated_at_ms.to_string()),
    ]
}

fn prompt_fields(prompt: &Prompt) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("prompt_id", prompt.prompt_id.clone()),
        ("votes_count", prompt.votes_count.to_string()),
        ("score_cached", prompt.score_cached.to_string()),
        ("edit_token", prompt.edit_token.clone()),
        ("author_hashed_ip", prompt.author_hashed_ip.clone()),
        ("is_deleted", flag(prompt.is_deleted).to_string()),
        ("created_at_ms", prompt.created_at_ms.to_string()),
    ];
    let content = PromptContent {
        title: prompt.title.clone(),
        prompt_text: prompt.prompt_text.clone(),
        name: prompt.name.clone(),
        tag: prompt.tag.clone(),
    };
    fields.extend(content_fields(&content, prompt.updated_at_ms));
    fields
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

fn text_field<'a>(fields: &'a HashMap<String, String>, name: &str) -> Result<&'a str, DbError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| DbError::Corrupt(format!("prompt hash missing field {name}")))
}

fn parsed_field<T: FromStr>(fields: &HashMap<String, String>, name: &str) -> Result<T, DbError> {
    let raw = text_field(fields, name)?;
    raw.parse()
        .map_err(|_| DbError::Corrupt(format!("prompt field {name} has invalid value {raw:?}")))
}

fn parse_prompt(fields: &HashMap<String, String>) -> Result<Prompt, DbError> {
    let tag = text_field(fields, "tag")?;
    Ok(Prompt {
        prompt_id: text_field(fields, "prompt_id")?.to_string(),
        title: text_field(fields, "title")?.to_string(),
        prompt_text: text_field(fields, "prompt_text")?.to_string(),
        name: text_field(fields, "name")?.to_string(),
        tag: (!tag.is_empty()).then(|| tag.to_string()),
        votes_count: parsed_field(fields, "votes_count")?,
        score_cached: parsed_field(fields, "score_cached")?,
        edit_token: text_field(fields, "edit_token")?.to_string(),
        author_hashed_ip: text_field(fields, "author_hashed_ip")?.to_string(),
        is_deleted: text_field(fields, "is_deleted")? == "1",
        created_at_ms: parsed_field(fields, "created_at_ms")?,
        updated_at_ms: parsed_field(fields, "updated_at_ms")?,
    })
}

fn parse_snapshot(
    prompt_id: String,
    votes_count: Option<String>,
    created_at_ms: Option<String>,
) -> Result<Option<ScoreSnapshot>, DbError> {
    let (Some(votes_count), Some(created_at_ms)) = (votes_count, created_at_ms) else {
        return Ok(None);
    };
    let corrupt = |field: &str| DbError::Corrupt(format!("prompt {prompt_id} has invalid {field}"));
    let votes_count = votes_count.parse().map_err(|_| corrupt("votes_count"))?;
    let created_at_ms = created_at_ms.parse().map_err(|_| corrupt("created_at_ms"))?;
    Ok(Some(ScoreSnapshot {
        prompt_id,
        votes_count,
        created_at_ms,
    }))
}

#[derive(Clone)]
pub struct RedisPromptRepository {
    manager: ConnectionManager,
    keys: RedisKeys,
}

impl RedisPromptRepository {
    pub fn new(manager: ConnectionManager, keys: RedisKeys) -> Self {
        Self { manager, keys }
    }

    async fn load(&self, prompt_ids: &[String]) -> DomainResult<Vec<Prompt>> {
        if prompt_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.manager.clone();
        let mut pipeline = redis::pipe();
        for prompt_id in prompt_ids {
            pipeline.cmd("HGETALL").arg(self.keys.prompt(prompt_id));
        }
        let rows: Vec<HashMap<String, String>> = pipeline
            .query_async(&mut conn)
            .await
            .map_err(storage_error)?;
        // An index entry can outlive its hash only if the hash was removed by hand.
        rows.iter()
            .filter(|fields| !fields.is_empty())
            .map(|fields| parse_prompt(fields).map_err(DomainError::from))
            .collect()
    }

    async fn write_score(
        &self,
        prompt_id: &str,
        expected_votes: Option<u64>,
        update: &ScoreUpdate,
    ) -> DomainResult<bool> {
        let mut conn = self.manager.clone();
        let outcome: i64 = redis::Script::new(WRITE_SCORE_SCRIPT)
            .key(self.keys.prompt(prompt_id))
            .key(self.keys.live_index(PromptSort::Hot))
            .key(self.keys.live_index(PromptSort::Top))
            .arg(prompt_id)
            .arg(expected_votes.map(|votes| votes.to_string()).unwrap_or_default())
            .arg(update.votes_count.to_string())
            .arg(update.score_cached.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(storage_error)?;
        match outcome {
            -1 => Err(DomainError::NotFound),
            0 => Ok(false),
            _ => Ok(true),
        }
    }

    async fn require(&self, prompt_id: &str) -> DomainResult<Prompt> {
        self.load(&[prompt_id.to_string()])
            .await?
            .pop()
            .ok_or(DomainError::NotFound)
    }
}

impl PromptRepository for RedisPromptRepository {
    fn create(&self, prompt: &Prompt) -> BoxFuture<'_, DomainResult<Prompt>> {
        let prompt = prompt.clone();
        Box::pin(async move {
            let mut conn = self.manager.clone();
            let script = redis::Script::new(CREATE_PROMPT_SCRIPT);
            let mut invocation = script.prepare_invoke();
            invocation
                .key(self.keys.prompt(&prompt.prompt_id))
                .key(self.keys.all_index())
                .key(self.keys.live_index(PromptSort::New))
                .key(self.keys.live_index(PromptSort::Hot))
                .key(self.keys.live_index(PromptSort::Top))
                .arg(&prompt.prompt_id)
                .arg(prompt.created_at_ms)
                .arg(prompt.score_cached.to_string())
                .arg(prompt.votes_count)
                .arg(flag(prompt.is_deleted));
            for (field, value) in prompt_fields(&prompt) {
                invocation.arg(field).arg(value);
            }
            let inserted: i64 = invocation
                .invoke_async(&mut conn)
                .await
                .map_err(storage_error)?;
            if inserted == 0 {
                return Err(DomainError::Conflict);
            }
            Ok(prompt)
        })
    }

    fn get(&self, prompt_id: &str) -> BoxFuture<'_, DomainResult<Option<Prompt>>> {
        let prompt_id = prompt_id.to_string();
        Box::pin(async move { Ok(self.load(&[prompt_id]).await?.pop()) })
    }

    fn update_content(
        &self,
        prompt_id: &str,
        content: &PromptContent,
        updated_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<Prompt>> {
        let prompt_id = prompt_id.to_string();
        let content = content.clone();
        Box::pin(async move {
            let mut conn = self.manager.clone();
            let script = redis::Script::new(UPDATE_CONTENT_SCRIPT);
            let mut invocation = script.prepare_invoke();
            invocation.key(self.keys.prompt(&prompt_id));
            for (field, value) in content_fields(&content, updated_at_ms) {
                invocation.arg(field).arg(value);
            }
            let updated: i64 = invocation
                .invoke_async(&mut conn)
                .await
                .map_err(storage_error)?;
            if updated == 0 {
                return Err(DomainError::NotFound);
            }
            self.require(&prompt_id).await
        })
    }

    fn set_deleted(
        &self,
        prompt_id: &str,
        is_deleted: bool,
    ) -> BoxFuture<'_, DomainResult<Prompt>> {
        let prompt_id = prompt_id.to_string();
        Box::pin(async move {
            let mut conn = self.manager.clone();
            let changed: i64 = redis::Script::new(SET_DELETED_SCRIPT)
                .key(self.keys.prompt(&prompt_id))
                .key(self.keys.live_index(PromptSort::New))
                .key(self.keys.live_index(PromptSort::Hot))
                .key(self.keys.live_index(PromptSort::Top))
                .arg(&prompt_id)
                .arg(flag(is_deleted))
                .invoke_async(&mut conn)
                .await
                .map_err(storage_error)?;
            if changed == 0 {
                return Err(DomainError::NotFound);
            }
            self.require(&prompt_id).await
        })
    }

    fn list(&self, query: &PromptRepositoryQuery) -> BoxFuture<'_, DomainResult<Vec<Prompt>>> {
        let query = query.clone();
        Box::pin(async move {
            if query.limit == 0 {
                return Ok(Vec::new());
            }
            let mut conn = self.manager.clone();
            let candidates = if query.include_deleted {
                self.keys.all_index()
            } else {
                self.keys.live_index(PromptSort::New)
            };

            // Index order answers the query directly; anything else is
            // filtered and sorted after loading the candidates.
            let served_by_index = query.created_after_ms.is_none()
                && (!query.include_deleted || query.sort == PromptSort::New);
            if served_by_index {
                let index = if query.include_deleted {
                    candidates
                } else {
                    self.keys.live_index(query.sort)
                };
                let Some((start, stop)) = rank_range(query.offset, query.limit) else {
                    return Ok(Vec::new());
                };
                let ids: Vec<String> = conn
                    .zrevrange(index, start, stop)
                    .await
                    .map_err(storage_error)?;
                let mut page = self.load(&ids).await?;
                page.sort_by(|left, right| query.sort.compare(left, right));
                return Ok(page);
            }

            let min = query
                .created_after_ms
                .map_or_else(|| "-inf".to_string(), |cutoff| format!("({cutoff}"));
            let ids: Vec<String> = redis::cmd("ZREVRANGEBYSCORE")
                .arg(candidates)
                .arg("+inf")
                .arg(min)
                .query_async(&mut conn)
                .await
                .map_err(storage_error)?;
            let mut prompts: Vec<Prompt> = self
                .load(&ids)
                .await?
                .into_iter()
                .filter(|prompt| query.include_deleted || !prompt.is_deleted)
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
        Box::pin(async move {
            let mut conn = self.manager.clone();
            let (votes_count, created_at_ms): (Option<String>, Option<String>) =
                redis::cmd("HMGET")
                    .arg(self.keys.prompt(&prompt_id))
                    .arg("votes_count")
                    .arg("created_at_ms")
                    .query_async(&mut conn)
                    .await
                    .map_err(storage_error)?;
            Ok(parse_snapshot(prompt_id, votes_count, created_at_ms)?)
        })
    }

    fn list_live_snapshots(&self) -> BoxFuture<'_, DomainResult<Vec<ScoreSnapshot>>> {
        Box::pin(async move {
            let mut conn = self.manager.clone();
            let ids: Vec<String> = conn
                .zrange(self.keys.live_index(PromptSort::New), 0, -1)
                .await
                .map_err(storage_error)?;

            let mut snapshots = Vec::with_capacity(ids.len());
            for batch in ids.chunks(SNAPSHOT_BATCH) {
                let mut pipeline = redis::pipe();
                for prompt_id in batch {
                    pipeline
                        .cmd("HMGET")
                        .arg(self.keys.prompt(prompt_id))
                        .arg("votes_count")
                        .arg("created_at_ms");
                }
                let rows: Vec<(Option<String>, Option<String>)> = pipeline
                    .query_async(&mut conn)
                    .await
                    .map_err(storage_error)?;
                for (prompt_id, (votes_count, created_at_ms)) in batch.iter().zip(rows) {
                    if let Some(snapshot) =
                        parse_snapshot(prompt_id.clone(), votes_count, created_at_ms)?
                    {
                        snapshots.push(snapshot);
                    }
                }
            }
            Ok(snapshots)
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
        Box::pin(async move {
            self.write_score(&prompt_id, Some(expected_votes), &update)
                .await
        })
    }

    fn store_score(
        &self,
        prompt_id: &str,
        update: &ScoreUpdate,
    ) -> BoxFuture<'_, DomainResult<()>> {
        let prompt_id = prompt_id.to_string();
        let update = update.clone();
        Box::pin(async move {
            self.write_score(&prompt_id, None, &update).await?;
            Ok(())
        })
    }
}

/// One set of voter address hashes per prompt; `SADD` rejects repeats.
#[derive(Clone)]
pub struct RedisVoteRepository {
    manager: ConnectionManager,
    keys: RedisKeys,
}

impl RedisVoteRepository {
    pub fn new(manager: ConnectionManager, keys: RedisKeys) -> Self {
        Self { manager, keys }
    }
}

impl VoteRepository for RedisVoteRepository {
    fn create(&self, vote: &Vote) -> BoxFuture<'_, DomainResult<Vote>> {
        let vote = vote.clone();
        Box::pin(async move {
            let mut conn = self.manager.clone();
            let added: i64 = conn
                .sadd(self.keys.votes(&vote.prompt_id), &vote.hashed_ip)
                .await
                .map_err(storage_error)?;
            if added == 0 {
                return Err(DomainError::DuplicateVote);
            }
            Ok(vote)
        })
    }

    fn delete(&self, prompt_id: &str, hashed_ip: &str) -> BoxFuture<'_, DomainResult<bool>> {
        let key = self.keys.votes(prompt_id);
        let hashed_ip = hashed_ip.to_string();
        Box::pin(async move {
            let mut conn = self.manager.clone();
            let removed: i64 = conn.srem(key, hashed_ip).await.map_err(storage_error)?;
            Ok(removed > 0)
        })
    }

    fn has_voted(&self, prompt_id: &str, hashed_ip: &str) -> BoxFuture<'_, DomainResult<bool>> {
        let key = self.keys.votes(prompt_id);
        let hashed_ip = hashed_ip.to_string();
        Box::pin(async move {
            let mut conn = self.manager.clone();
            conn.sismember(key, hashed_ip).await.map_err(storage_error)
        })
    }

    fn delete_for_prompt(&self, prompt_id: &str) -> BoxFuture<'_, DomainResult<u64>> {
        let key = self.keys.votes(prompt_id);
        Box::pin(async move {
            let mut conn = self.manager.clone();
            let mut pipeline = redis::pipe();
            pipeline.atomic();
            pipeline.cmd("SCARD").arg(&key);
            pipeline.cmd("DEL").arg(&key).ignore();
            let (removed,): (u64,) = pipeline
                .query_async(&mut conn)
                .await
                .map_err(storage_error)?;
            Ok(removed)
        })
    }
}

/// Bans live in one hash per address plus an index ordered by last update.
#[derive(Clone)]
pub struct RedisBanRepository {
    manager: ConnectionManager,
    keys: RedisKeys,
}

impl RedisBanRepository {
    pub fn new(manager: ConnectionManager, keys: RedisKeys) -> Self {
        Self { manager, keys }
    }
}

fn parse_ban(hashed_ip: &str, fields: &HashMap<String, String>) -> Result<IpBan, DbError> {
    let number = |name: &str| -> Result<i64, DbError> {
        fields
            .get(name)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| DbError::Corrupt(format!("ban {hashed_ip} has invalid {name}")))
    };
    Ok(IpBan {
        hashed_ip: hashed_ip.to_string(),
        reason: fields.get("reason").cloned().unwrap_or_default(),
        created_at_ms: number("created_at_ms")?,
        updated_at_ms: number("updated_at_ms")?,
    })
}

impl BanRepository for RedisBanRepository {
    fn upsert(&self, ban: &IpBan) -> BoxFuture<'_, DomainResult<IpBan>> {
        let ban = ban.clone();
        Box::pin(async move {
            let key = self.keys.ban(&ban.hashed_ip);
            let mut conn = self.manager.clone();
            let mut pipeline = redis::pipe();
            pipeline.atomic();
            pipeline
                .cmd("HSETNX")
                .arg(&key)
                .arg("created_at_ms")
                .arg(ban.created_at_ms)
                .ignore();
            pipeline
                .cmd("HSET")
                .arg(&key)
                .arg("reason")
                .arg(&ban.reason)
                .arg("updated_at_ms")
                .arg(ban.updated_at_ms)
                .ignore();
            pipeline
                .cmd("ZADD")
                .arg(self.keys.ban_index())
                .arg(ban.updated_at_ms)
                .arg(&ban.hashed_ip)
                .ignore();
            pipeline.cmd("HGETALL").arg(&key);
            let (fields,): (HashMap<String, String>,) = pipeline
                .query_async(&mut conn)
                .await
                .map_err(storage_error)?;
            Ok(parse_ban(&ban.hashed_ip, &fields)?)
        })
    }

    fn is_banned(&self, hashed_ip: &str) -> BoxFuture<'_, DomainResult<bool>> {
        let key = self.keys.ban(hashed_ip);
        Box::pin(async move {
            let mut conn = self.manager.clone();
            conn.exists(key).await.map_err(storage_error)
        })
    }

    fn list(&self) -> BoxFuture<'_, DomainResult<Vec<IpBan>>> {
        Box::pin(async move {
            let mut conn = self.manager.clone();
            let addresses: Vec<String> = conn
                .zrevrange(self.keys.ban_index(), 0, -1)
                .await
                .map_err(storage_error)?;
            if addresses.is_empty() {
                return Ok(Vec::new());
            }
            let mut pipeline = redis::pipe();
            for hashed_ip in &addresses {
                pipeline.cmd("HGETALL").arg(self.keys.ban(hashed_ip));
            }
            let rows: Vec<HashMap<String, String>> = pipeline
                .query_async(&mut conn)
                .await
                .map_err(storage_error)?;
            addresses
                .iter()
                .zip(rows)
                .filter(|(_, fields)| !fields.is_empty())
                .map(|(hashed_ip, fields)| parse_ban(hashed_ip, &fields).map_err(DomainError::from))
                .collect()
        })
    }
}

/// Per-address event timestamps kept in sorted sets and pruned on write.
#[derive(Clone)]
pub struct RedisIpEventRepository {
    manager: ConnectionManager,
    keys: RedisKeys,
}

impl RedisIpEventRepository {
    pub fn new(manager: ConnectionManager, keys: RedisKeys) -> Self {
        Self { manager, keys }
    }
}

impl IpEventRepository for RedisIpEventRepository {
    fn record(&self, event: &IpEvent) -> BoxFuture<'_, DomainResult<()>> {
        let key = self.keys.ip_events(event.kind, &event.hashed_ip);
        let created_at_ms = event.created_at_ms;
        Box::pin(async move {
            let mut conn = self.manager.clone();
            let member = promptboard_domain::util::uuid_v7_without_dashes();
            let mut pipeline = redis::pipe();
            pipeline.atomic();
            pipeline
                .cmd("ZADD")
                .arg(&key)
                .arg(created_at_ms)
                .arg(member)
                .ignore();
            pipeline
                .cmd("ZREMRANGEBYSCORE")
                .arg(&key)
                .arg("-inf")
                .arg(created_at_ms - IP_EVENT_RETENTION_MS)
                .ignore();
            pipeline
                .cmd("PEXPIRE")
                .arg(&key)
                .arg(IP_EVENT_RETENTION_MS)
                .ignore();
            let () = pipeline
                .query_async(&mut conn)
                .await
                .map_err(storage_error)?;
            Ok(())
        })
    }

    fn count_since(
        &self,
        hashed_ip: &str,
        kind: IpEventKind,
        since_ms: i64,
    ) -> BoxFuture<'_, DomainResult<u64>> {
        let key = self.keys.ip_events(kind, hashed_ip);
        Box::pin(async move {
            let mut conn = self.manager.clone();
            redis::cmd("ZCOUNT")
                .arg(key)
                .arg(format!("({since_ms}"))
                .arg("+inf")
                .query_async(&mut conn)
                .await
                .map_err(storage_error)
        })
    }
}
