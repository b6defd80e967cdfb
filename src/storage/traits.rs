//! Storage trait definitions

use crate::call::CallContext;
use crate::model::{Entry, EntryId, Link, LinkKey, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),

    #[error("Link not found: {0}")]
    LinkNotFound(LinkKey),

    /// The write would break a storage constraint (missing endpoint, duplicate key)
    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Call cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

impl StorageError {
    /// Whether this is the distinguishable "no such row" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EntryNotFound(_) | Self::LinkNotFound(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence of entries
///
/// Lookups and keyed mutations report a missing row as `EntryNotFound`.
/// Stores perform no business validation.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Insert a new entry and return it as stored
    async fn create_entry(&self, ctx: &CallContext, entry: &Entry) -> StorageResult<Entry>;

    async fn get_entry(&self, ctx: &CallContext, id: &EntryId) -> StorageResult<Entry>;

    /// All entries of `owner`, ordered by creation time then id
    async fn list_entries_by_owner(
        &self,
        ctx: &CallContext,
        owner: &UserId,
    ) -> StorageResult<Vec<Entry>>;

    /// Entries of `owner` with `updated_at >= since`, same order as the full listing
    async fn list_entries_by_owner_since(
        &self,
        ctx: &CallContext,
        owner: &UserId,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<Entry>>;

    /// Replace the editable fields and `updated_at` of an existing entry
    async fn update_entry(&self, ctx: &CallContext, entry: &Entry) -> StorageResult<Entry>;

    /// Delete an entry together with every link that references it
    async fn delete_entry(&self, ctx: &CallContext, id: &EntryId) -> StorageResult<()>;
}

/// Persistence of the link graph
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Insert a link if both endpoints exist and belong to the link's owner.
    ///
    /// The check and the insert happen atomically. A missing endpoint or an
    /// existing `(source, target)` pair is a `Constraint` error.
    async fn create_link(&self, ctx: &CallContext, link: &Link) -> StorageResult<Link>;

    async fn get_link(&self, ctx: &CallContext, key: &LinkKey) -> StorageResult<Link>;

    /// Delete the link with this exact key, or fail with `LinkNotFound`
    async fn delete_link(&self, ctx: &CallContext, key: &LinkKey) -> StorageResult<()>;

    /// Links leaving `source`, ordered by creation time then target id
    async fn list_links_by_source(
        &self,
        ctx: &CallContext,
        source: &EntryId,
    ) -> StorageResult<Vec<Link>>;

    /// Links arriving at `target`, ordered by creation time then source id
    async fn list_links_by_target(
        &self,
        ctx: &CallContext,
        target: &EntryId,
    ) -> StorageResult<Vec<Link>>;

    async fn count_links_by_source(&self, ctx: &CallContext, source: &EntryId)
        -> StorageResult<u64>;

    async fn count_links_by_target(&self, ctx: &CallContext, target: &EntryId)
        -> StorageResult<u64>;
}

/// A store holding both halves of the garden
pub trait GardenStore: EntryStore + LinkStore {}

impl<T: EntryStore + LinkStore> GardenStore for T {}

/// Extension trait for opening stores from paths
pub trait OpenStore: GardenStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
