use redis::{AsyncCommands, RedisResult};
use tracing::debug;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed-window counter. Returns `true` while the caller is within `limit`
    /// requests for the current window.
    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: i64,
        window_seconds: i64,
    ) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let count: i64 = conn.incr(key, 1).await?;
        if count == 1 {
            // First hit opens the window
            conn.expire::<_, ()>(key, window_seconds).await?;
        }

        if count > limit {
            debug!("Rate limit exceeded for {}: {} > {}", key, count, limit);
        }
        Ok(count <= limit)
    }
}

/// Key under which requests from one client address are counted.
pub fn rate_limit_key(client: &str) -> String {
    format!("rate_limit:{}", client)
}
