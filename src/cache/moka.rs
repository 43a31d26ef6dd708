use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::Expiry;
use tracing::{debug, trace};

use super::traits::{CacheResult, ResolutionCache};
use crate::config::CacheConfig;
use crate::storage::Link;

/// Per-entry TTL: the configured default, shortened to the link's remaining
/// lifetime so an expiring link never outlives itself in cache.
struct LinkExpiry {
    default_ttl: Duration,
}

impl Expiry<String, Link> for LinkExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Link,
        _created_at: Instant,
    ) -> Option<Duration> {
        match value.cache_ttl(self.default_ttl.as_secs()) {
            Some(ttl_secs) => Some(Duration::from_secs(ttl_secs)),
            // 不可解析的条目不应进入正缓存；兜底给极短 TTL
            None => Some(Duration::from_secs(1)),
        }
    }
}

/// moka-backed resolution cache.
///
/// Two bounded caches: positives with per-entry TTL and TinyLFU eviction,
/// negatives with a single short TTL. Eviction is amortized inside moka and
/// never blocks a concurrent lookup; a slightly stale entry may be served up
/// to its TTL, which the resolution semantics accept.
pub struct MokaCache {
    positive: Cache<String, Link>,
    negative: Cache<String, ()>,
}

impl MokaCache {
    pub fn new(config: &CacheConfig) -> Self {
        let positive = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(LinkExpiry {
                default_ttl: Duration::from_secs(config.default_ttl_secs),
            })
            .build();

        let negative = Cache::builder()
            .max_capacity(config.negative_max_capacity)
            .time_to_live(Duration::from_secs(config.negative_ttl_secs.max(1)))
            .build();

        debug!(
            "MokaCache initialized: capacity={}, ttl={}s, negative_ttl={}s",
            config.max_capacity, config.default_ttl_secs, config.negative_ttl_secs
        );

        Self { positive, negative }
    }

    /// Test helper: run moka's pending maintenance so invalidations and
    /// expirations become observable immediately.
    #[cfg(test)]
    pub async fn sync(&self) {
        self.positive.run_pending_tasks().await;
        self.negative.run_pending_tasks().await;
    }
}

#[async_trait]
impl ResolutionCache for MokaCache {
    async fn lookup(&self, code: &str) -> CacheResult {
        if let Some(link) = self.positive.get(code).await {
            trace!("Cache hit for code: {}", code);
            return CacheResult::Found(link);
        }
        if self.negative.contains_key(code) {
            trace!("Negative cache hit for code: {}", code);
            return CacheResult::NegativeHit;
        }
        CacheResult::Miss
    }

    async fn put(&self, code: &str, link: Link, ttl_secs: Option<u64>) {
        // ttl_secs 由 Expiry 从 link 自身推导，此处仅作信号用途：
        // None 表示调用方已判定不可缓存
        if ttl_secs.is_none() {
            return;
        }
        // 先清负缓存再写正缓存，避免短暂的双命中窗口
        self.negative.invalidate(code).await;
        self.positive.insert(code.to_string(), link).await;
    }

    async fn mark_not_found(&self, code: &str) {
        trace!("Marking code as not found: {}", code);
        self.negative.insert(code.to_string(), ()).await;
    }

    async fn invalidate(&self, code: &str) {
        self.positive.invalidate(code).await;
        self.negative.invalidate(code).await;
    }

    async fn clear(&self) {
        self.positive.invalidate_all();
        self.negative.invalidate_all();
    }
}
