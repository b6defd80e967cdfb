//! Common test utilities for Moss integration tests
//!
//! Every property is checked against both shipped stores; `Garden` hides
//! which one is underneath and keeps on-disk databases alive for the test.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moss::{
    CallContext, Entry, EntryId, EntryStore, Link, LinkKey, LinkStore, MemoryStore, MossApi,
    OpenStore, SqliteStore, SteppingClock, StorageResult, UserId,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Sqlite,
}

pub const BACKENDS: [Backend; 2] = [Backend::Memory, Backend::Sqlite];

/// A store that counts every write it forwards
pub struct RecordingStore<S> {
    inner: S,
    writes: AtomicUsize,
}

impl<S> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: EntryStore> EntryStore for RecordingStore<S> {
    async fn create_entry(&self, ctx: &CallContext, entry: &Entry) -> StorageResult<Entry> {
        self.record();
        self.inner.create_entry(ctx, entry).await
    }

    async fn get_entry(&self, ctx: &CallContext, id: &EntryId) -> StorageResult<Entry> {
        self.inner.get_entry(ctx, id).await
    }

    async fn list_entries_by_owner(&self, ctx: &CallContext, owner: &UserId) -> StorageResult<Vec<Entry>> {
        self.inner.list_entries_by_owner(ctx, owner).await
    }

    async fn list_entries_by_owner_since(
        &self,
        ctx: &CallContext,
        owner: &UserId,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<Entry>> {
        self.inner.list_entries_by_owner_since(ctx, owner, since).await
    }

    async fn update_entry(&self, ctx: &CallContext, entry: &Entry) -> StorageResult<Entry> {
        self.record();
        self.inner.update_entry(ctx, entry).await
    }

    async fn delete_entry(&self, ctx: &CallContext, id: &EntryId) -> StorageResult<()> {
        self.record();
        self.inner.delete_entry(ctx, id).await
    }
}

#[async_trait]
impl<S: LinkStore> LinkStore for RecordingStore<S> {
    async fn create_link(&self, ctx: &CallContext, link: &Link) -> StorageResult<Link> {
        self.record();
        self.inner.create_link(ctx, link).await
    }

    async fn get_link(&self, ctx: &CallContext, key: &LinkKey) -> StorageResult<Link> {
        self.inner.get_link(ctx, key).await
    }

    async fn delete_link(&self, ctx: &CallContext, key: &LinkKey) -> StorageResult<()> {
        self.record();
        self.inner.delete_link(ctx, key).await
    }

    async fn list_links_by_source(&self, ctx: &CallContext, source: &EntryId) -> StorageResult<Vec<Link>> {
        self.inner.list_links_by_source(ctx, source).await
    }

    async fn list_links_by_target(&self, ctx: &CallContext, target: &EntryId) -> StorageResult<Vec<Link>> {
        self.inner.list_links_by_target(ctx, target).await
    }

    async fn count_links_by_source(&self, ctx: &CallContext, source: &EntryId) -> StorageResult<u64> {
        self.inner.count_links_by_source(ctx, source).await
    }

    async fn count_links_by_target(&self, ctx: &CallContext, target: &EntryId) -> StorageResult<u64> {
        self.inner.count_links_by_target(ctx, target).await
    }
}

/// An API over a fresh store of the chosen backend
pub struct Garden {
    pub api: MossApi,
    pub ctx: CallContext,
    pub backend: Backend,
    recorder: Arc<dyn WriteCount>,
    _dir: Option<TempDir>,
}

trait WriteCount: Send + Sync {
    fn writes(&self) -> usize;
}

impl<S: Send + Sync> WriteCount for RecordingStore<S> {
    fn writes(&self) -> usize {
        RecordingStore::writes(self)
    }
}

impl Garden {
    pub fn open(backend: Backend) -> Self {
        let clock = Arc::new(SteppingClock::starting_now());
        let (recorder, api, dir): (Arc<dyn WriteCount>, MossApi, Option<TempDir>) = match backend {
            Backend::Memory => {
                let store = Arc::new(RecordingStore::new(MemoryStore::new()));
                (store.clone() as Arc<dyn WriteCount>, MossApi::with_clock(store, clock), None)
            }
            Backend::Sqlite => {
                let dir = tempfile::tempdir().expect("temp dir");
                let sqlite = SqliteStore::open(dir.path().join("garden.db")).expect("open sqlite");
                let store = Arc::new(RecordingStore::new(sqlite));
                (store.clone() as Arc<dyn WriteCount>, MossApi::with_clock(store, clock), Some(dir))
            }
        };
        Self {
            api,
            ctx: CallContext::background(),
            backend,
            recorder,
            _dir: dir,
        }
    }

    /// Writes forwarded to the store so far
    pub fn writes(&self) -> usize {
        self.recorder.writes()
    }

    pub async fn entry(&self, owner: &str, title: &str, stage: &str) -> Entry {
        self.api
            .create_entry(&self.ctx, owner, title, "content", stage)
            .await
            .expect("create entry")
    }

    pub async fn link(&self, source: &Entry, target: &Entry) -> Link {
        self.api
            .create_link(&self.ctx, source.id.as_str(), target.id.as_str(), source.owner.as_str())
            .await
            .expect("create link")
    }
}
