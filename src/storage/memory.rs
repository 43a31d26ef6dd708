//! In-process store backed by DashMap. Non-durable; used by tests and
//! `memory://` deployments. `insert_if_absent` gets its atomicity from the
//! map's entry API (per-shard lock, compare-and-swap semantics per code).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::models::Link;
use super::{ClickStore, LinkFilter, LinkStore, StoredClickEvent};
use crate::analytics::{ClickEvent, ClickSink};
use crate::errors::{Result, SnaplinkError};

#[derive(Default)]
pub struct MemoryStore {
    links: DashMap<String, Link>,
    events: Mutex<Vec<StoredClickEvent>>,
    next_event_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: number of buffered click events.
    pub fn event_count(&self) -> usize {
        self.events.lock().expect("event log lock poisoned").len()
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn insert_if_absent(&self, link: Link) -> Result<()> {
        match self.links.entry(link.code.clone()) {
            Entry::Occupied(_) => Err(SnaplinkError::already_exists(link.code)),
            Entry::Vacant(vacant) => {
                vacant.insert(link);
                Ok(())
            }
        }
    }

    async fn get(&self, code: &str) -> Result<Option<Link>> {
        Ok(self.links.get(code).map(|entry| entry.value().clone()))
    }

    async fn disable(&self, code: &str) -> Result<()> {
        match self.links.get_mut(code) {
            Some(mut entry) => {
                entry.value_mut().disabled = true;
                Ok(())
            }
            None => Err(SnaplinkError::not_found(code)),
        }
    }

    async fn set_expiry(&self, code: &str, expires_at: Option<DateTime<Utc>>) -> Result<()> {
        match self.links.get_mut(code) {
            Some(mut entry) => {
                entry.value_mut().expires_at = expires_at;
                Ok(())
            }
            None => Err(SnaplinkError::not_found(code)),
        }
    }

    async fn list(
        &self,
        filter: LinkFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<Link>, u64)> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, 100);

        let mut matched: Vec<Link> = self
            .links
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|link| {
                filter
                    .owner_id
                    .as_ref()
                    .is_none_or(|owner| &link.owner_id == owner)
                    && (filter.include_disabled || !link.disabled)
            })
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matched.len() as u64;
        let start = ((page - 1) * page_size) as usize;
        let links = matched
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();

        Ok((links, total))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.links.len() as u64)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl ClickSink for MemoryStore {
    async fn flush_events(&self, events: Vec<ClickEvent>) -> anyhow::Result<()> {
        let mut log = self.events.lock().expect("event log lock poisoned");
        for event in events {
            let id = self.next_event_id.fetch_add(1, Ordering::Relaxed) + 1;
            log.push(StoredClickEvent { id, event });
        }
        Ok(())
    }
}

#[async_trait]
impl ClickStore for MemoryStore {
    async fn events_after(&self, cursor: i64, limit: u64) -> Result<Vec<StoredClickEvent>> {
        let log = self.events.lock().expect("event log lock poisoned");
        Ok(log
            .iter()
            .filter(|stored| stored.id > cursor)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut log = self.events.lock().expect("event log lock poisoned");
        let before = log.len();
        log.retain(|stored| stored.event.timestamp >= cutoff);
        Ok((before - log.len()) as u64)
    }
}
