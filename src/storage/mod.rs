//! Durable storage: the authoritative `code -> Link` mapping and the
//! append-only click event log.
//!
//! The store is the single serialization point for code uniqueness: the
//! generator relies on `insert_if_absent` being atomic per code. The store
//! has no cache awareness; invalidation belongs to the orchestration layer.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::analytics::{ClickEvent, ClickSink};
use crate::config::DatabaseConfig;
use crate::errors::{Result, SnaplinkError};

pub mod backend;
mod entities;
pub mod memory;
pub mod models;

pub use backend::SqlStore;
pub use memory::MemoryStore;
pub use models::Link;

/// Owner/visibility filter for administrative listings.
#[derive(Debug, Clone, Default)]
pub struct LinkFilter {
    pub owner_id: Option<String>,
    pub include_disabled: bool,
}

#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Atomic create-if-absent. Returns `AlreadyExists` when the code is
    /// taken; never overwrites an existing mapping.
    async fn insert_if_absent(&self, link: Link) -> Result<()>;

    async fn get(&self, code: &str) -> Result<Option<Link>>;

    /// Idempotent moderation flag. `NotFound` for unknown codes.
    async fn disable(&self, code: &str) -> Result<()>;

    /// Idempotent expiry update; `None` clears the expiry. `NotFound` for
    /// unknown codes.
    async fn set_expiry(&self, code: &str, expires_at: Option<DateTime<Utc>>) -> Result<()>;

    /// Paginated listing for the admin interface. Returns `(page, total)`.
    async fn list(&self, filter: LinkFilter, page: u64, page_size: u64)
        -> Result<(Vec<Link>, u64)>;

    async fn count(&self) -> Result<u64>;

    fn backend_name(&self) -> &'static str;
}

/// A click event with its storage-assigned sequence id, used as the export
/// cursor.
#[derive(Debug, Clone)]
pub struct StoredClickEvent {
    pub id: i64,
    pub event: ClickEvent,
}

/// Durable side of click recording: the flush target plus the queries the
/// export/retention loop needs.
#[async_trait]
pub trait ClickStore: ClickSink {
    /// Events with id strictly greater than `cursor`, ascending, at most
    /// `limit` rows.
    async fn events_after(&self, cursor: i64, limit: u64) -> Result<Vec<StoredClickEvent>>;

    /// Delete events older than `cutoff`; returns the number removed.
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Concrete handles produced by the factory. The same backend object backs
/// all three traits; the split keeps the redirect path, the recorder and
/// the export loop decoupled from each other.
#[derive(Clone)]
pub struct StoreHandles {
    pub links: Arc<dyn LinkStore>,
    pub clicks: Arc<dyn ClickStore>,
    pub sink: Arc<dyn ClickSink>,
}

pub struct StoreFactory;

impl StoreFactory {
    /// Create the backend inferred from `database.url`:
    /// `memory://` for the in-process store, anything else goes to sea-orm.
    pub async fn create(config: &DatabaseConfig) -> Result<StoreHandles> {
        let url = config.url.trim();

        if url.starts_with("memory:") {
            let store = Arc::new(MemoryStore::new());
            info!("Using in-memory store (non-durable)");
            return Ok(StoreHandles {
                links: store.clone(),
                clicks: store.clone(),
                sink: store,
            });
        }

        if !(url.starts_with("sqlite:") || url.starts_with("postgres:") || url.starts_with("mysql:"))
        {
            return Err(SnaplinkError::configuration(format!(
                "unsupported database url scheme: {}",
                url
            )));
        }

        let store = Arc::new(SqlStore::connect(url).await?);
        info!("Using SQL store: {}", store.backend_name());
        Ok(StoreHandles {
            links: store.clone(),
            clicks: store.clone(),
            sink: store,
        })
    }
}
