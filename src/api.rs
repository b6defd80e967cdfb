//! Transport-independent API layer.
//!
//! `MossApi` is the single entry point for consumer-facing operations.
//! Transports (MCP, the CLI, direct embedding) call `MossApi` methods and
//! never reach into the services or the store directly.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::call::CallContext;
use crate::clock::{Clock, SystemClock};
use crate::error::{DomainError, DomainResult};
use crate::model::{
    Entry, EntryId, EntryUpdate, GrowthStage, Link, LinkKey, NewEntry, NewLink, UserId,
    ValidationError,
};
use crate::service::{EntryService, LinkService};
use crate::storage::{EntryStore, GardenStore, LinkStore};

/// An entry together with the number of links leaving it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryView {
    #[serde(flatten)]
    pub entry: Entry,
    pub link_count: u64,
}

/// Single entry point for all consumer-facing operations.
#[derive(Clone)]
pub struct MossApi {
    entries: EntryService,
    links: LinkService,
}

impl MossApi {
    /// Build the API over one store shared by entries and links.
    pub fn new<S: GardenStore + 'static>(store: Arc<S>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock<S: GardenStore + 'static>(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        let entry_store: Arc<dyn EntryStore> = store.clone();
        let link_store: Arc<dyn LinkStore> = store;
        Self {
            entries: EntryService::with_clock(entry_store, clock.clone()),
            links: LinkService::with_clock(link_store, clock),
        }
    }

    // --- Entries ---

    pub async fn create_entry(
        &self,
        ctx: &CallContext,
        owner: &str,
        title: &str,
        content: &str,
        growth_stage: &str,
    ) -> DomainResult<Entry> {
        let started = Instant::now();
        let result = async {
            let stage = parse_stage(growth_stage)?;
            self.entries
                .create(ctx, NewEntry::new(owner, title, content, stage))
                .await
        }
        .await;
        finish("create_entry", started, result)
    }

    pub async fn get_entry(&self, ctx: &CallContext, id: &str, requester: &str) -> DomainResult<Entry> {
        let started = Instant::now();
        let result = self
            .entries
            .get(ctx, &EntryId::from(id), &UserId::from(requester))
            .await;
        finish("get_entry", started, result)
    }

    /// Fetch an entry with its outgoing link count.
    ///
    /// The count is only read once ownership of the entry has been checked.
    pub async fn get_entry_with_links(
        &self,
        ctx: &CallContext,
        id: &str,
        requester: &str,
    ) -> DomainResult<EntryView> {
        let started = Instant::now();
        let result = async {
            let entry = self
                .entries
                .get(ctx, &EntryId::from(id), &UserId::from(requester))
                .await?;
            let link_count = self.links.count_by_source(ctx, &entry.id).await?;
            Ok::<_, DomainError>(EntryView { entry, link_count })
        }
        .await;
        finish("get_entry_with_links", started, result)
    }

    pub async fn update_entry(
        &self,
        ctx: &CallContext,
        id: &str,
        owner: &str,
        title: &str,
        content: &str,
        growth_stage: &str,
    ) -> DomainResult<Entry> {
        let started = Instant::now();
        let result = async {
            let stage = parse_stage(growth_stage)?;
            self.entries
                .update(ctx, EntryUpdate::new(id, owner, title, content, stage))
                .await
        }
        .await;
        finish("update_entry", started, result)
    }

    pub async fn delete_entry(&self, ctx: &CallContext, id: &str, requester: &str) -> DomainResult<()> {
        let started = Instant::now();
        let result = self
            .entries
            .delete(ctx, &EntryId::from(id), &UserId::from(requester))
            .await;
        finish("delete_entry", started, result)
    }

    pub async fn list_entries(&self, ctx: &CallContext, owner: &str) -> DomainResult<Vec<Entry>> {
        let started = Instant::now();
        let result = self.entries.list(ctx, &UserId::from(owner)).await;
        finish("list_entries", started, result)
    }

    pub async fn list_entries_since(
        &self,
        ctx: &CallContext,
        owner: &str,
        since: DateTime<Utc>,
    ) -> DomainResult<Vec<Entry>> {
        let started = Instant::now();
        let result = self.entries.list_since(ctx, &UserId::from(owner), since).await;
        finish("list_entries_since", started, result)
    }

    // --- Links ---

    pub async fn create_link(
        &self,
        ctx: &CallContext,
        source_id: &str,
        target_id: &str,
        owner: &str,
    ) -> DomainResult<Link> {
        let started = Instant::now();
        let result = self
            .links
            .create(ctx, NewLink::new(source_id, target_id, owner))
            .await;
        finish("create_link", started, result)
    }

    pub async fn delete_link(
        &self,
        ctx: &CallContext,
        source_id: &str,
        target_id: &str,
        requester: &str,
    ) -> DomainResult<()> {
        let started = Instant::now();
        let result = self
            .links
            .delete(ctx, &LinkKey::new(source_id, target_id), &UserId::from(requester))
            .await;
        finish("delete_link", started, result)
    }

    pub async fn list_links_by_source(&self, ctx: &CallContext, source_id: &str) -> DomainResult<Vec<Link>> {
        let started = Instant::now();
        let result = self.links.list_by_source(ctx, &EntryId::from(source_id)).await;
        finish("list_links_by_source", started, result)
    }

    pub async fn list_links_by_target(&self, ctx: &CallContext, target_id: &str) -> DomainResult<Vec<Link>> {
        let started = Instant::now();
        let result = self.links.list_by_target(ctx, &EntryId::from(target_id)).await;
        finish("list_links_by_target", started, result)
    }

    pub async fn count_links_by_source(&self, ctx: &CallContext, source_id: &str) -> DomainResult<u64> {
        let started = Instant::now();
        let result = self.links.count_by_source(ctx, &EntryId::from(source_id)).await;
        finish("count_links_by_source", started, result)
    }

    pub async fn count_links_by_target(&self, ctx: &CallContext, target_id: &str) -> DomainResult<u64> {
        let started = Instant::now();
        let result = self.links.count_by_target(ctx, &EntryId::from(target_id)).await;
        finish("count_links_by_target", started, result)
    }
}

fn parse_stage(raw: &str) -> Result<GrowthStage, ValidationError> {
    Ok(raw.parse::<GrowthStage>()?)
}

/// Log the completed call and pass its result through.
fn finish<T>(op: &'static str, started: Instant, result: DomainResult<T>) -> DomainResult<T> {
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    match &result {
        Ok(_) => info!(op, outcome = "ok", elapsed_ms, "call completed"),
        Err(e) => info!(op, outcome = e.kind().as_str(), elapsed_ms, error = %e, "call completed"),
    }
    result
}
