//! Resolution capability behind the redirect endpoint.
//!
//! Two interchangeable implementations: cache-then-store and store-only.
//! The HTTP layer never learns which one is installed, which also lets the
//! test suite run without a cache tier.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, trace};

use crate::cache::{CacheResult, ResolutionCache};
use crate::errors::{Result, SnaplinkError};
use crate::storage::{Link, LinkStore};

/// Terminal outcome of one resolution pass. Unknown, disabled and expired
/// codes all collapse into `NotFound`; callers cannot tell them apart.
#[derive(Debug, Clone)]
pub enum Resolution {
    Found(Link),
    NotFound,
}

#[async_trait]
pub trait Resolver: Send + Sync {
    /// Single-pass resolution; no retries at this layer. Errors mean the
    /// store was needed and unreachable.
    async fn resolve(&self, code: &str) -> Result<Resolution>;
}

/// 缓存优先：命中直接返回，未命中回源并回填（正/负条目）
pub struct CachedResolver {
    cache: Arc<dyn ResolutionCache>,
    store: Arc<dyn LinkStore>,
    default_ttl_secs: u64,
}

impl CachedResolver {
    pub fn new(
        cache: Arc<dyn ResolutionCache>,
        store: Arc<dyn LinkStore>,
        default_ttl_secs: u64,
    ) -> Self {
        Self {
            cache,
            store,
            default_ttl_secs,
        }
    }

    async fn resolve_from_store(&self, code: &str) -> Result<Resolution> {
        match self.store.get(code).await {
            Ok(Some(link)) => {
                if link.is_resolvable(Utc::now()) {
                    let ttl = link.cache_ttl(self.default_ttl_secs);
                    self.cache.put(code, link.clone(), ttl).await;
                    Ok(Resolution::Found(link))
                } else {
                    debug!("Unresolvable link from store: {}", code);
                    self.cache.mark_not_found(code).await;
                    Ok(Resolution::NotFound)
                }
            }
            Ok(None) => {
                trace!("Code not in store: {}", code);
                self.cache.mark_not_found(code).await;
                Ok(Resolution::NotFound)
            }
            // 缓存命中已经在上层挡掉，走到这里说明只能报不可用
            Err(e) => Err(SnaplinkError::store_unavailable(e.to_string())),
        }
    }
}

#[async_trait]
impl Resolver for CachedResolver {
    async fn resolve(&self, code: &str) -> Result<Resolution> {
        match self.cache.lookup(code).await {
            CacheResult::Found(link) => {
                if link.is_resolvable(Utc::now()) {
                    return Ok(Resolution::Found(link));
                }
                // 缓存里过期/被禁的残留条目，转负缓存
                self.cache.invalidate(code).await;
                self.cache.mark_not_found(code).await;
                Ok(Resolution::NotFound)
            }
            CacheResult::NegativeHit => Ok(Resolution::NotFound),
            CacheResult::Miss => self.resolve_from_store(code).await,
        }
    }
}

/// 无缓存部署：每次直接查库
pub struct DirectResolver {
    store: Arc<dyn LinkStore>,
}

impl DirectResolver {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Resolver for DirectResolver {
    async fn resolve(&self, code: &str) -> Result<Resolution> {
        match self.store.get(code).await {
            Ok(Some(link)) if link.is_resolvable(Utc::now()) => Ok(Resolution::Found(link)),
            Ok(_) => Ok(Resolution::NotFound),
            Err(e) => Err(SnaplinkError::store_unavailable(e.to_string())),
        }
    }
}
