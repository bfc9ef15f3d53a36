mod redis_store;

use std::sync::Arc;

use promptboard_domain::ports::bans::BanRepository;
use promptboard_domain::ports::db::{DbAdapter, DbError};
use promptboard_domain::ports::ip_events::IpEventRepository;
use promptboard_domain::ports::prompts::PromptRepository;
use promptboard_domain::ports::votes::VoteRepository;

pub use promptboard_domain::memory::{
    InMemoryBanRepository, InMemoryDbAdapter, InMemoryIpEventRepository,
    InMemoryPromptRepository, InMemoryVoteRepository,
};
pub use redis_store::{
    RedisBanRepository, RedisIpEventRepository, RedisKeys, RedisPromptRepository,
    RedisVoteRepository,
};

use crate::config::AppConfig;
use crate::db::{RedisAdapter, connect_redis};

/// Every storage port wired to one backend.
#[derive(Clone)]
pub struct Repositories {
    pub prompts: Arc<dyn PromptRepository>,
    pub votes: Arc<dyn VoteRepository>,
    pub bans: Arc<dyn BanRepository>,
    pub ip_events: Arc<dyn IpEventRepository>,
    pub db: Arc<dyn DbAdapter>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            prompts: Arc::new(InMemoryPromptRepository::new()),
            votes: Arc::new(InMemoryVoteRepository::new()),
            bans: Arc::new(InMemoryBanRepository::new()),
            ip_events: Arc::new(InMemoryIpEventRepository::new()),
            db: Arc::new(InMemoryDbAdapter),
        }
    }

    pub async fn redis(redis_url: &str, prefix: &str) -> Result<Self, DbError> {
        let manager = connect_redis(redis_url).await?;
        let keys = RedisKeys::new(prefix);
        Ok(Self {
            prompts: Arc::new(RedisPromptRepository::new(manager.clone(), keys.clone())),
            votes: Arc::new(RedisVoteRepository::new(manager.clone(), keys.clone())),
            bans: Arc::new(RedisBanRepository::new(manager.clone(), keys.clone())),
            ip_events: Arc::new(RedisIpEventRepository::new(manager.clone(), keys)),
            db: Arc::new(RedisAdapter::new(manager)),
        })
    }
}

pub async fn build_repositories(config: &AppConfig) -> Result<Repositories, DbError> {
    if config.uses_redis() {
        tracing::info!(prefix = %config.redis_prefix, "using redis storage");
        Repositories::redis(&config.redis_url, &config.redis_prefix).await
    } else {
        tracing::info!("using in-memory storage");
        Ok(Repositories::in_memory())
    }
}
