use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{CacheError, DuplicateCache};

/// In-memory duplicate cache with per-key expiry.
///
/// Intended for tests and local development; state dies with the process.
/// Expired entries are pruned lazily on read.
#[derive(Clone, Default)]
pub struct MemoryDuplicateCache {
    entries: Arc<RwLock<HashMap<String, Instant>>>,
}

impl MemoryDuplicateCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DuplicateCache for MemoryDuplicateCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let now = Instant::now();
        let expired = {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(expires_at) if *expires_at > now => return Ok(true),
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            self.entries.write().await.remove(key);
        }

        Ok(false)
    }

    async fn set(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now() + ttl;
        self.entries
            .write()
            .await
            .insert(key.to_string(), expires_at);
        Ok(())
    }
}
