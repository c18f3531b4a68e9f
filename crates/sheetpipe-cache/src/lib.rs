pub mod fingerprint;
mod memory;
mod redis;

use std::time::Duration;

use async_trait::async_trait;

pub use fingerprint::content_fingerprint;
pub use memory::MemoryDuplicateCache;
pub use self::redis::RedisDuplicateCache;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),

    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Duplicate-detection cache contract.
///
/// A key marks content as seen for the TTL window; "first writer wins for
/// the TTL window" is the intended semantics, so no locking is layered on
/// top. Nothing beyond `exists` and `set` is required.
#[async_trait]
pub trait DuplicateCache: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    async fn set(&self, key: &str, ttl: Duration) -> Result<(), CacheError>;
}
