//! Link graph: directed edges between entries

use crate::auth::authorize;
use crate::call::CallContext;
use crate::clock::{Clock, SystemClock};
use crate::error::DomainResult;
use crate::model::{EntryId, Link, LinkKey, NewLink, UserId};
use crate::storage::LinkStore;
use std::sync::Arc;
use tracing::debug;

/// Orchestrates create/delete/list/count for links.
#[derive(Clone)]
pub struct LinkService {
    store: Arc<dyn LinkStore>,
    clock: Arc<dyn Clock>,
}

impl LinkService {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn LinkStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Create `source -> target` owned by `new.owner`.
    ///
    /// Both endpoints must exist and belong to that owner; the store checks
    /// this atomically with the insert and refuses otherwise.
    pub async fn create(&self, ctx: &CallContext, new: NewLink) -> DomainResult<Link> {
        new.validate()?;
        let link = Link::create(new, self.clock.now());
        debug!(link = %link.key(), owner = %link.owner, "creating link");

        Ok(ctx.bound(self.store.create_link(ctx, &link)).await?)
    }

    pub async fn get(&self, ctx: &CallContext, key: &LinkKey) -> DomainResult<Link> {
        key.validate()?;
        Ok(ctx.bound(self.store.get_link(ctx, key)).await?)
    }

    /// Delete the exact edge `key`, which `requester` must own.
    pub async fn delete(&self, ctx: &CallContext, key: &LinkKey, requester: &UserId) -> DomainResult<()> {
        key.validate()?;
        debug!(link = %key, %requester, "deleting link");

        let link = ctx.bound(self.store.get_link(ctx, key)).await?;
        authorize(format_args!("link {key}"), &link.owner, Some(requester))?;

        ctx.bound(self.store.delete_link(ctx, key)).await?;
        Ok(())
    }

    pub async fn list_by_source(&self, ctx: &CallContext, source: &EntryId) -> DomainResult<Vec<Link>> {
        Ok(ctx.bound(self.store.list_links_by_source(ctx, source)).await?)
    }

    pub async fn list_by_target(&self, ctx: &CallContext, target: &EntryId) -> DomainResult<Vec<Link>> {
        Ok(ctx.bound(self.store.list_links_by_target(ctx, target)).await?)
    }

    pub async fn count_by_source(&self, ctx: &CallContext, source: &EntryId) -> DomainResult<u64> {
        Ok(ctx.bound(self.store.count_links_by_source(ctx, source)).await?)
    }

    pub async fn count_by_target(&self, ctx: &CallContext, target: &EntryId) -> DomainResult<u64> {
        Ok(ctx.bound(self.store.count_links_by_target(ctx, target)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SteppingClock;
    use crate::error::ErrorKind;
    use crate::model::{Entry, GrowthStage, NewEntry};
    use crate::service::EntryService;
    use crate::storage::MemoryStore;

    struct Fixture {
        entries: EntryService,
        links: LinkService,
        ctx: CallContext,
    }

    fn setup() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(SteppingClock::starting_now());
        Fixture {
            entries: EntryService::with_clock(store.clone(), clock.clone()),
            links: LinkService::with_clock(store, clock),
            ctx: CallContext::background(),
        }
    }

    impl Fixture {
        async fn entry(&self, owner: &str, title: &str) -> Entry {
            self.entries
                .create(&self.ctx, NewEntry::new(owner, title, "x", GrowthStage::Seed))
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn empty_fields_are_invalid() {
        let f = setup();
        for bad in [
            NewLink::new("", "b", "u1"),
            NewLink::new("a", "", "u1"),
            NewLink::new("a", "b", ""),
            NewLink::new("a", "a", "u1"),
        ] {
            let err = f.links.create(&f.ctx, bad).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    // === Scenario: a new edge is visible once from each side ===
    #[tokio::test]
    async fn created_link_appears_once_on_each_side() {
        let f = setup();
        let a = f.entry("u1", "A").await;
        let b = f.entry("u1", "B").await;

        let link = f
            .links
            .create(&f.ctx, NewLink::new(a.id.clone(), b.id.clone(), "u1"))
            .await
            .unwrap();
        assert_eq!(link.owner, UserId::from("u1"));

        let outgoing = f.links.list_by_source(&f.ctx, &a.id).await.unwrap();
        assert_eq!(outgoing.iter().filter(|l| l.target_id == b.id).count(), 1);
        let incoming = f.links.list_by_target(&f.ctx, &b.id).await.unwrap();
        assert_eq!(incoming.iter().filter(|l| l.source_id == a.id).count(), 1);

        assert_eq!(f.links.count_by_source(&f.ctx, &a.id).await.unwrap(), outgoing.len() as u64);
        assert_eq!(f.links.count_by_target(&f.ctx, &b.id).await.unwrap(), incoming.len() as u64);
        assert_eq!(f.links.get(&f.ctx, &link.key()).await.unwrap(), link);
    }

    #[tokio::test]
    async fn duplicate_and_dangling_links_are_invalid() {
        let f = setup();
        let a = f.entry("u1", "A").await;
        let b = f.entry("u1", "B").await;
        let theirs = f.entry("u2", "C").await;

        f.links
            .create(&f.ctx, NewLink::new(a.id.clone(), b.id.clone(), "u1"))
            .await
            .unwrap();

        let dup = f.links.create(&f.ctx, NewLink::new(a.id.clone(), b.id.clone(), "u1")).await;
        assert_eq!(dup.unwrap_err().kind(), ErrorKind::InvalidInput);

        let dangling = f.links.create(&f.ctx, NewLink::new(a.id.clone(), "ghost", "u1")).await;
        assert_eq!(dangling.unwrap_err().kind(), ErrorKind::InvalidInput);

        let foreign = f.links.create(&f.ctx, NewLink::new(a.id.clone(), theirs.id.clone(), "u1")).await;
        assert_eq!(foreign.unwrap_err().kind(), ErrorKind::InvalidInput);

        assert_eq!(f.links.count_by_source(&f.ctx, &a.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_edge() {
        let f = setup();
        let a = f.entry("u1", "A").await;
        let b = f.entry("u1", "B").await;
        let c = f.entry("u1", "C").await;
        for target in [&b, &c] {
            f.links
                .create(&f.ctx, NewLink::new(a.id.clone(), target.id.clone(), "u1"))
                .await
                .unwrap();
        }

        let key = LinkKey::new(a.id.clone(), b.id.clone());
        f.links.delete(&f.ctx, &key, &UserId::from("u1")).await.unwrap();

        assert_eq!(f.links.count_by_source(&f.ctx, &a.id).await.unwrap(), 1);
        let remaining = f.links.list_by_source(&f.ctx, &a.id).await.unwrap();
        assert!(remaining.iter().all(|l| l.target_id != b.id));
    }

    // === Scenario: deleting a link checks the exact key and its owner ===
    #[tokio::test]
    async fn delete_requires_exact_edge_and_owner() {
        let f = setup();
        let a = f.entry("u1", "A").await;
        let b = f.entry("u1", "B").await;
        let c = f.entry("u1", "C").await;
        f.links
            .create(&f.ctx, NewLink::new(a.id.clone(), b.id.clone(), "u1"))
            .await
            .unwrap();

        // Source has edges, but not this one
        let wrong_pair = LinkKey::new(a.id.clone(), c.id.clone());
        let err = f.links.delete(&f.ctx, &wrong_pair, &UserId::from("u1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let key = LinkKey::new(a.id.clone(), b.id.clone());
        let err = f.links.delete(&f.ctx, &key, &UserId::from("u2")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(f.links.count_by_source(&f.ctx, &a.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn deleting_an_entry_drops_its_links_from_counts() {
        let f = setup();
        let a = f.entry("u1", "A").await;
        let b = f.entry("u1", "B").await;
        f.links
            .create(&f.ctx, NewLink::new(a.id.clone(), b.id.clone(), "u1"))
            .await
            .unwrap();

        f.entries.delete(&f.ctx, &b.id, &UserId::from("u1")).await.unwrap();
        assert_eq!(f.links.count_by_source(&f.ctx, &a.id).await.unwrap(), 0);
        assert!(f.links.list_by_target(&f.ctx, &b.id).await.unwrap().is_empty());
    }
}
