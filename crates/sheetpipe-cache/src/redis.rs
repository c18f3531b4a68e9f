use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError};

use crate::{CacheError, DuplicateCache};

/// Redis-backed duplicate cache.
///
/// Uses a multiplexed connection for efficient concurrent access. Keys hold
/// a sentinel value "1"; only existence matters.
#[derive(Clone)]
pub struct RedisDuplicateCache {
    conn: MultiplexedConnection,
    key_prefix: Option<String>,
}

impl RedisDuplicateCache {
    /// Connect from a Redis URL (e.g. "redis://127.0.0.1:6379").
    pub async fn new(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(map_redis_error)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_error)?;
        Ok(Self {
            conn,
            key_prefix: None,
        })
    }

    /// Set a key prefix for namespace isolation.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

#[async_trait]
impl DuplicateCache for RedisDuplicateCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let full_key = prefixed_key(self.key_prefix.as_deref(), key);
        let exists: bool = conn.exists(&full_key).await.map_err(map_redis_error)?;
        Ok(exists)
    }

    async fn set(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let full_key = prefixed_key(self.key_prefix.as_deref(), key);
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(&full_key, "1", seconds)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }
}

fn prefixed_key(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, key),
        None => key.to_string(),
    }
}

fn map_redis_error(err: RedisError) -> CacheError {
    if err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
        CacheError::Connection(err.to_string())
    } else {
        CacheError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_key() {
        assert_eq!(
            prefixed_key(Some("sheetpipe:dedup"), "abc"),
            "sheetpipe:dedup:abc"
        );
        assert_eq!(prefixed_key(None, "abc"), "abc");
    }
}
