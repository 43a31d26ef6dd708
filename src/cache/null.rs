use async_trait::async_trait;

use super::traits::{CacheResult, ResolutionCache};
use crate::storage::Link;

/// No-op cache: every lookup is a miss. Installed when `cache.enabled` is
/// off so the rest of the system never branches on cache presence.
#[derive(Default)]
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResolutionCache for NullCache {
    async fn lookup(&self, _code: &str) -> CacheResult {
        CacheResult::Miss
    }

    async fn put(&self, _code: &str, _link: Link, _ttl_secs: Option<u64>) {}

    async fn mark_not_found(&self, _code: &str) {}

    async fn invalidate(&self, _code: &str) {}

    async fn clear(&self) {}
}
