use std::time::Duration;

use promptboard_domain::ports::BoxFuture;
use promptboard_domain::ports::db::{DbAdapter, DbError};
use redis::aio::ConnectionManager;
use tokio::time::timeout;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Opens a managed, auto-reconnecting connection shared by every Redis
/// repository.
pub async fn connect_redis(redis_url: &str) -> Result<ConnectionManager, DbError> {
    let client =
        redis::Client::open(redis_url).map_err(|err| DbError::Unavailable(err.to_string()))?;
    ConnectionManager::new(client)
        .await
        .map_err(|err| DbError::Unavailable(err.to_string()))
}

#[derive(Clone)]
pub struct RedisAdapter {
    manager: ConnectionManager,
}

impl RedisAdapter {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }
}

impl DbAdapter for RedisAdapter {
    fn backend(&self) -> &'static str {
        "redis"
    }

    fn health_check(&self) -> BoxFuture<'_, Result<(), DbError>> {
        Box::pin(async move {
            let mut conn = self.manager.clone();
            let reply: redis::RedisResult<String> =
                timeout(HEALTH_CHECK_TIMEOUT, redis::cmd("PING").query_async(&mut conn))
                    .await
                    .map_err(|_| DbError::Unavailable("redis ping timed out".to_string()))?;
            let reply =
                reply.map_err(|err| DbError::Unavailable(format!("redis ping failed: {err}")))?;
            tracing::debug!(reply, "redis health check succeeded");
            Ok(())
        })
    }
}
