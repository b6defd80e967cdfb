//! In-process storage backend
//!
//! Same semantics as `SqliteStore`: keyed not-found errors, atomic endpoint
//! check on link insert, link cascade on entry delete, identical ordering.
//! One lock guards both maps so multi-map writes are atomic.

use super::traits::{EntryStore, LinkStore, StorageError, StorageResult};
use crate::call::CallContext;
use crate::model::{Entry, EntryId, Link, LinkKey, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Garden {
    entries: HashMap<EntryId, Entry>,
    links: HashMap<LinkKey, Link>,
}

impl Garden {
    fn owns(&self, id: &EntryId, owner: &UserId) -> bool {
        self.entries
            .get(id)
            .map(|entry| &entry.owner == owner)
            .unwrap_or(false)
    }

    fn entries_of<'a>(&'a self, owner: &'a UserId) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries.values().filter(move |entry| &entry.owner == owner)
    }
}

fn sorted_entries<'a>(entries: impl Iterator<Item = &'a Entry>) -> Vec<Entry> {
    let mut out: Vec<Entry> = entries.cloned().collect();
    out.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
    out
}

/// In-memory garden store
#[derive(Debug, Default)]
pub struct MemoryStore {
    garden: RwLock<Garden>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn create_entry(&self, ctx: &CallContext, entry: &Entry) -> StorageResult<Entry> {
        ctx.check()?;
        let mut garden = self.garden.write().await;
        if garden.entries.contains_key(&entry.id) {
            return Err(StorageError::Constraint(format!("entry already exists: {}", entry.id)));
        }
        garden.entries.insert(entry.id.clone(), entry.clone());
        Ok(entry.clone())
    }

    async fn get_entry(&self, ctx: &CallContext, id: &EntryId) -> StorageResult<Entry> {
        ctx.check()?;
        self.garden
            .read()
            .await
            .entries
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::EntryNotFound(id.clone()))
    }

    async fn list_entries_by_owner(
        &self,
        ctx: &CallContext,
        owner: &UserId,
    ) -> StorageResult<Vec<Entry>> {
        ctx.check()?;
        let garden = self.garden.read().await;
        Ok(sorted_entries(garden.entries_of(owner)))
    }

    async fn list_entries_by_owner_since(
        &self,
        ctx: &CallContext,
        owner: &UserId,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<Entry>> {
        ctx.check()?;
        let garden = self.garden.read().await;
        Ok(sorted_entries(
            garden.entries_of(owner).filter(|entry| entry.updated_at >= since),
        ))
    }

    async fn update_entry(&self, ctx: &CallContext, entry: &Entry) -> StorageResult<Entry> {
        ctx.check()?;
        let mut garden = self.garden.write().await;
        let stored = garden
            .entries
            .get_mut(&entry.id)
            .ok_or_else(|| StorageError::EntryNotFound(entry.id.clone()))?;

        stored.title = entry.title.clone();
        stored.content = entry.content.clone();
        stored.growth_stage = entry.growth_stage;
        stored.updated_at = entry.updated_at;
        Ok(stored.clone())
    }

    async fn delete_entry(&self, ctx: &CallContext, id: &EntryId) -> StorageResult<()> {
        ctx.check()?;
        let mut garden = self.garden.write().await;
        if garden.entries.remove(id).is_none() {
            return Err(StorageError::EntryNotFound(id.clone()));
        }
        garden
            .links
            .retain(|key, _| &key.source_id != id && &key.target_id != id);
        Ok(())
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn create_link(&self, ctx: &CallContext, link: &Link) -> StorageResult<Link> {
        ctx.check()?;
        let mut garden = self.garden.write().await;
        let key = link.key();

        if !garden.owns(&link.source_id, &link.owner) || !garden.owns(&link.target_id, &link.owner) {
            return Err(StorageError::Constraint(format!(
                "missing endpoint for link {key}: both entries must exist and belong to {}",
                link.owner
            )));
        }
        if garden.links.contains_key(&key) {
            return Err(StorageError::Constraint(format!("link already exists: {key}")));
        }

        garden.links.insert(key, link.clone());
        Ok(link.clone())
    }

    async fn get_link(&self, ctx: &CallContext, key: &LinkKey) -> StorageResult<Link> {
        ctx.check()?;
        self.garden
            .read()
            .await
            .links
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::LinkNotFound(key.clone()))
    }

    async fn delete_link(&self, ctx: &CallContext, key: &LinkKey) -> StorageResult<()> {
        ctx.check()?;
        self.garden
            .write()
            .await
            .links
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::LinkNotFound(key.clone()))
    }

    async fn list_links_by_source(
        &self,
        ctx: &CallContext,
        source: &EntryId,
    ) -> StorageResult<Vec<Link>> {
        ctx.check()?;
        let garden = self.garden.read().await;
        let mut links: Vec<Link> = garden
            .links
            .values()
            .filter(|link| &link.source_id == source)
            .cloned()
            .collect();
        links.sort_by(|a, b| (a.created_at, &a.target_id).cmp(&(b.created_at, &b.target_id)));
        Ok(links)
    }

    async fn list_links_by_target(
        &self,
        ctx: &CallContext,
        target: &EntryId,
    ) -> StorageResult<Vec<Link>> {
        ctx.check()?;
        let garden = self.garden.read().await;
        let mut links: Vec<Link> = garden
            .links
            .values()
            .filter(|link| &link.target_id == target)
            .cloned()
            .collect();
        links.sort_by(|a, b| (a.created_at, &a.source_id).cmp(&(b.created_at, &b.source_id)));
        Ok(links)
    }

    async fn count_links_by_source(
        &self,
        ctx: &CallContext,
        source: &EntryId,
    ) -> StorageResult<u64> {
        ctx.check()?;
        let garden = self.garden.read().await;
        Ok(garden.links.keys().filter(|key| &key.source_id == source).count() as u64)
    }

    async fn count_links_by_target(
        &self,
        ctx: &CallContext,
        target: &EntryId,
    ) -> StorageResult<u64> {
        ctx.check()?;
        let garden = self.garden.read().await;
        Ok(garden.links.keys().filter(|key| &key.target_id == target).count() as u64)
    }
}
