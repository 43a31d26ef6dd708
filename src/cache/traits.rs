use async_trait::async_trait;

use crate::storage::Link;

/// 缓存查询结果
#[derive(Debug, Clone)]
pub enum CacheResult {
    /// 命中正缓存
    Found(Link),
    /// 命中负缓存：确认不存在
    NegativeHit,
    /// 未命中，需要回源
    Miss,
}

/// Read-through cache in front of the link store.
///
/// Entries are non-authoritative, time-bounded copies; the cache never
/// originates writes. A negative entry records "confirmed absent" with its
/// own (much shorter) TTL so repeated lookups of invalid codes don't reach
/// the store.
#[async_trait]
pub trait ResolutionCache: Send + Sync {
    async fn lookup(&self, code: &str) -> CacheResult;

    /// Insert a positive entry. Purges any matching negative entry so a
    /// just-created code is never shadowed by an earlier "not found".
    async fn put(&self, code: &str, link: Link, ttl_secs: Option<u64>);

    /// Record "confirmed not found".
    async fn mark_not_found(&self, code: &str);

    /// Drop both positive and negative entries for a code.
    async fn invalidate(&self, code: &str);

    async fn clear(&self);
}
