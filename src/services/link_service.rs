//! Link management service
//!
//! Creation and administrative mutations, shared by the HTTP handlers.
//! Cache invalidation after store writes lives here: the store itself has
//! no cache awareness.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use url::Url;

use crate::cache::ResolutionCache;
use crate::config::ServerConfig;
use crate::errors::{Result, SnaplinkError};
use crate::generator::CodeGenerator;
use crate::storage::{Link, LinkFilter, LinkStore};
use crate::utils::validate_destination;

/// Result of link creation
#[derive(Debug, Clone)]
pub struct CreatedLink {
    pub link: Link,
    pub short_url: String,
}

pub struct LinkService {
    store: Arc<dyn LinkStore>,
    cache: Arc<dyn ResolutionCache>,
    generator: CodeGenerator,
    public_base: Url,
}

impl LinkService {
    pub fn new(
        store: Arc<dyn LinkStore>,
        cache: Arc<dyn ResolutionCache>,
        generator: CodeGenerator,
        server: &ServerConfig,
    ) -> Result<Self> {
        let public_base = Url::parse(&server.public_base_url).map_err(|e| {
            SnaplinkError::configuration(format!("invalid public_base_url: {}", e))
        })?;

        Ok(Self {
            store,
            cache,
            generator,
            public_base,
        })
    }

    fn short_url(&self, code: &str) -> String {
        format!(
            "{}/{}",
            self.public_base.as_str().trim_end_matches('/'),
            code
        )
    }

    /// Create a new short link.
    ///
    /// Validates the destination, mints a unique code (the generator owns
    /// the retry loop) and purges any negative cache entry so the fresh
    /// code resolves immediately.
    pub async fn create_link(
        &self,
        destination: &str,
        owner_id: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<CreatedLink> {
        validate_destination(destination, &self.public_base)
            .map_err(|e| SnaplinkError::invalid_destination(e.to_string()))?;

        if owner_id.trim().is_empty() {
            return Err(SnaplinkError::validation("owner_id cannot be empty"));
        }
        if let Some(expires_at) = expires_at {
            if expires_at <= Utc::now() {
                return Err(SnaplinkError::validation(
                    "expires_at must be in the future",
                ));
            }
        }

        let link = self
            .generator
            .mint(
                &self.store,
                destination.trim().to_string(),
                owner_id.to_string(),
                expires_at,
            )
            .await?;

        // 创建必须清掉同名负缓存，否则新码会被 NotFound 残影遮蔽
        self.cache.invalidate(&link.code).await;

        info!(
            "LinkService: created '{}' -> '{}' for owner {}",
            link.code, link.destination, link.owner_id
        );

        Ok(CreatedLink {
            short_url: self.short_url(&link.code),
            link,
        })
    }

    /// Idempotent moderation action. Cached readers may observe the old
    /// state for up to one cache TTL after the invalidation below races a
    /// concurrent fill; that bounded staleness is accepted.
    pub async fn disable_link(&self, code: &str) -> Result<()> {
        self.store.disable(code).await?;
        self.cache.invalidate(code).await;
        info!("LinkService: disabled '{}'", code);
        Ok(())
    }

    /// Idempotent expiry update; `None` clears the expiry.
    pub async fn set_expiry(&self, code: &str, expires_at: Option<DateTime<Utc>>) -> Result<()> {
        self.store.set_expiry(code, expires_at).await?;
        self.cache.invalidate(code).await;
        info!("LinkService: set expiry of '{}' to {:?}", code, expires_at);
        Ok(())
    }

    pub async fn get_link(&self, code: &str) -> Result<Option<Link>> {
        self.store.get(code).await
    }

    /// Paginated admin listing.
    pub async fn list_links(
        &self,
        filter: LinkFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<Link>, u64)> {
        self.store.list(filter, page, page_size).await
    }
}
